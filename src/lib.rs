//! # comsift — syntax-context features for source-code comments
//!
//! Indexes the node spans of a parsed source file and derives, for each
//! comment, a flat feature record describing its syntactic
//! surroundings: what ends just before it, what begins just after it,
//! and what encloses it most tightly. A second stage enriches the
//! records with features of the comment text itself. The records feed
//! a downstream classifier that decides whether a comment documents the
//! code it sits beside.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and pattern expansion
//! - **[`record`]** — Span / feature-set / comment-entry codec shared by all stages
//! - **[`index`]** — Per-file offset↔line/column and node-span indexes
//! - **[`extract`]** — Tree-sitter parsing, per-comment feature extraction
//! - **[`annotate`]** — Second stage: text recovery, NLP annotation, derived features
//! - **[`source_cache`]** — Memoized source-text lookup for the annotate stage

pub mod annotate;
pub mod config;
pub mod extract;
pub mod index;
pub mod record;
pub mod source_cache;
