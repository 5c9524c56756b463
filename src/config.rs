/// Configuration loading, validation, and source-pattern expansion.
use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::extract::languages::LanguageConfig;

// ── Default value functions ──────────────────────────────────────────

fn default_source_patterns() -> Vec<String> {
    vec!["./".to_string()]
}

fn default_tab_width() -> usize {
    8
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Files or glob patterns to extract from when the command line
    /// names none.
    #[serde(default = "default_source_patterns")]
    pub source_patterns: Vec<String>,

    /// Tab-stop width used for column features.
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Output path; stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// CoreNLP-compatible annotation endpoint for the annotate stage.
    /// Without it only text-free features are appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotator_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_patterns: default_source_patterns(),
            tab_width: default_tab_width(),
            output: None,
            annotator_url: None,
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults; invalid JSON is reported and
    /// also falls back to the defaults rather than aborting a run.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "comsift.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.tab_width > 0, "tab_width must be positive");
        anyhow::ensure!(
            !self.source_patterns.is_empty(),
            "at least one source pattern must be specified"
        );
        Ok(())
    }

    /// Expand all source patterns to the supported source files they
    /// match, deduplicated and sorted.
    pub fn get_source_files(&self) -> Result<Vec<String>> {
        let mut files = HashSet::new();

        for pattern in &self.source_patterns {
            match expand_pattern(pattern) {
                Ok(matches) => files.extend(matches),
                Err(e) => warn!("Failed to expand pattern {pattern}: {e}"),
            }
        }

        let mut files: Vec<String> = files.into_iter().collect();
        files.sort();
        Ok(files)
    }
}

// ── Pattern helpers ──────────────────────────────────────────────────

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| LanguageConfig::supported_extensions().contains(&ext))
}

/// Expand one pattern: a plain path is taken as a file or a directory
/// to walk (`.gitignore` respected); anything with wildcards goes
/// through glob matching.
fn expand_pattern(pattern: &str) -> Result<Vec<String>> {
    if !pattern.contains('*') && !pattern.contains('?') {
        let path = Path::new(pattern);
        if path.is_file() {
            return Ok(vec![pattern.to_string()]);
        }
        return walk_dir(path);
    }

    let mut files = Vec::new();
    for entry in glob::glob(pattern).context("invalid glob pattern")?.flatten() {
        if entry.is_file() && is_supported(&entry) {
            files.push(normalize(&entry));
        }
    }
    Ok(files)
}

fn walk_dir(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    let walker = ignore::WalkBuilder::new(dir).hidden(false).build();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && is_supported(path) {
            files.push(normalize(path));
        }
    }
    Ok(files)
}

fn normalize(path: &Path) -> String {
    // Forward slashes keep record paths comparable across platforms.
    path.to_string_lossy().replace('\\', "/")
}

// ── Tests ────────────────────────────────────────────────────────────
