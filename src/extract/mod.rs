//! Extraction stage: parse one source file, index its syntax-tree node
//! spans, and emit one feature record per comment.
//!
//! Parsing itself is delegated to tree-sitter; this stage only reads
//! node spans off the tree. Each file gets a fresh pair of indexes that
//! are dropped when its pass ends, so a batch never shares mutable
//! state across files.
pub mod features;
pub mod languages;

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tree_sitter::{Node, Parser};

use crate::index::source::SourceIndex;
use crate::index::span::{NodeId, SpanIndex};
use crate::record::{CommentEntry, RecordWriter, Span};
use features::{CommentSite, FeatureExtractor};
use languages::{LanguageConfig, classify_comment};

/// Outcome counters for one multi-file run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub processed: usize,
    pub failed: usize,
    pub comments: usize,
}

/// Extract records from every file in `paths`, in order. A file that
/// fails to read or parse is reported and skipped; it never aborts the
/// batch.
pub fn run<W: Write>(
    paths: &[String],
    tab_width: usize,
    writer: &mut RecordWriter<W>,
) -> ExtractSummary {
    let mut summary = ExtractSummary::default();
    for path in paths {
        info!("Parsing: {path}");
        match extract_file(path, tab_width, writer) {
            Ok(count) => {
                summary.processed += 1;
                summary.comments += count;
            }
            Err(e) => {
                warn!("Skipping {path}: {e:#}");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Extract records from one file. Returns the number of comments
/// emitted.
pub fn extract_file<W: Write>(
    path: &str,
    tab_width: usize,
    writer: &mut RecordWriter<W>,
) -> Result<usize> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let Some(config) = LanguageConfig::get_by_extension(ext) else {
        bail!("unsupported file type: {ext:?}");
    };

    let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    extract_source(path, &text, &config, tab_width, writer)
}

/// Extract records from already-loaded source text. `path` is only the
/// label written into each record.
pub fn extract_source<W: Write>(
    path: &str,
    text: &str,
    config: &LanguageConfig,
    tab_width: usize,
    writer: &mut RecordWriter<W>,
) -> Result<usize> {
    let mut parser = Parser::new();
    parser
        .set_language(&config.language)
        .context("failed to load grammar")?;
    let tree = parser
        .parse(text.as_bytes(), None)
        .context("failed to parse source")?;

    let source = SourceIndex::new(text);
    let mut spans = SpanIndex::new();
    let mut comments = Vec::new();
    ingest(tree.root_node(), None, config, &mut spans, &mut comments);

    let mut extractor = FeatureExtractor::new(&spans, &source, tab_width);
    let mut count = 0;
    for id in comments {
        let (start, end) = {
            let node = spans.node(id);
            (node.start, node.end)
        };
        let raw = source.text_of(start, end)?;
        let (kind, head, tail) = classify_comment(raw);
        let site = CommentSite { node: id, start, end };
        let feats = extractor.features_for(site, kind.type_name())?;

        // The emitted span covers the comment text, not its markers.
        let content = Span::new(start + head, end - tail);
        let entry = CommentEntry::new(path, vec![content], feats);
        let echo = source.text_of(content.start, content.end)?;
        writer.write_group(&entry, Some(echo))?;
        count += 1;
    }
    Ok(count)
}

/// Pre-order walk over named nodes, registering each with its parent
/// id. Comments are indexed like any other node and also collected in
/// document order for the feature pass.
fn ingest(
    node: Node,
    parent: Option<NodeId>,
    config: &LanguageConfig,
    spans: &mut SpanIndex,
    comments: &mut Vec<NodeId>,
) {
    let id = spans.insert(node.start_byte(), node.end_byte(), node.kind(), parent);
    if config.is_comment(node.kind()) {
        comments.push(id);
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        ingest(child, Some(id), config, spans, comments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordReader;

    fn extract_to_groups(path: &str, text: &str, lang: &str) -> Vec<crate::record::RecordGroup> {
        let config = LanguageConfig::get_by_name(lang).unwrap();
        let mut buf = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut buf);
            extract_source(path, text, &config, 8, &mut writer).unwrap();
        }
        let mut reader = RecordReader::new(&buf[..]);
        let mut groups = Vec::new();
        while let Some(g) = reader.next_group().unwrap() {
            groups.push(g);
        }
        groups
    }

    #[test]
    fn test_java_line_comment_features() {
        let text = "class A {\n    int x = 1; // set x\n}\n";
        let groups = extract_to_groups("A.java", text, "java");
        assert_eq!(groups.len(), 1);

        let entry = &groups[0].entry;
        assert_eq!(entry.path, "A.java");
        assert_eq!(entry.feats.get("type"), Some("LineComment"));
        assert_eq!(entry.feats.get("line"), Some("1"));
        // The span is trimmed past the marker: the echo is the text only.
        assert_eq!(groups[0].raw.as_deref(), Some(" set x"));

        let left = entry.feats.get("leftTypes").unwrap();
        assert!(
            left.split(',').any(|t| t.contains("statement") || t.contains("declaration")),
            "leftTypes should name the statement ending before the comment: {left}"
        );
        let parents = entry.feats.get("parentTypes").unwrap();
        assert!(
            parents.ends_with("program"),
            "chain should run up to the root: {parents}"
        );
    }

    #[test]
    fn test_comment_pair_records_distance() {
        let text = "// first\n// second\nint x;\n";
        let groups = extract_to_groups("pair.java", text, "java");
        // tree-sitter-java parses top-level "int x;" loosely, but both
        // comments must come out in document order.
        assert!(groups.len() >= 2);
        assert!(groups[0].entry.feats.get("prevLine").is_none());
        assert_eq!(groups[1].entry.feats.get("prevLine"), Some("0"));
        assert_eq!(groups[1].entry.feats.get("prevCols"), Some("0"));
    }

    #[test]
    fn test_rust_doc_comment_type() {
        let text = "/// Adds one.\nfn inc(x: u32) -> u32 { x + 1 }\n";
        let groups = extract_to_groups("lib.rs", text, "rust");
        assert_eq!(groups[0].entry.feats.get("type"), Some("DocComment"));
        assert_eq!(groups[0].raw.as_deref(), Some(" Adds one."));
        assert_eq!(groups[0].entry.feats.get("rightLine"), Some("1"));
    }

    #[test]
    fn test_python_hash_comment() {
        let text = "x = 1  # answer\n";
        let groups = extract_to_groups("a.py", text, "python");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entry.feats.get("type"), Some("LineComment"));
        assert_eq!(groups[0].raw.as_deref(), Some(" answer"));
        assert_eq!(groups[0].entry.feats.get("cols"), Some("7"));
    }

    #[test]
    fn test_block_comment_span_alignment() {
        let text = "fn main() { /* body */ }\n";
        let groups = extract_to_groups("m.rs", text, "rust");
        assert_eq!(groups.len(), 1);
        let entry = &groups[0].entry;
        assert_eq!(entry.feats.get("type"), Some("BlockComment"));
        assert_eq!(entry.spans.len(), 1);
        assert_eq!(groups[0].raw.as_deref(), Some(" body "));
    }

    #[test]
    fn test_file_without_comments_emits_nothing() {
        let groups = extract_to_groups("e.go", "package main\n", "go");
        assert!(groups.is_empty());
    }

    #[test]
    fn test_run_isolates_per_file_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.java");
        std::fs::write(&good, "class A { // c\n}\n").unwrap();
        let missing = dir.path().join("gone.java");
        let unsupported = dir.path().join("notes.txt");
        std::fs::write(&unsupported, "hi").unwrap();

        let paths = vec![
            good.to_string_lossy().into_owned(),
            missing.to_string_lossy().into_owned(),
            unsupported.to_string_lossy().into_owned(),
        ];
        let mut buf = Vec::new();
        let summary = {
            let mut writer = RecordWriter::new(&mut buf);
            run(&paths, 8, &mut writer)
        };
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.comments, 1);
    }
}
