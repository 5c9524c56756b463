//! Memoized source-text provider for the annotate stage.
//!
//! Record streams carry byte spans, not text; recovering a comment's
//! text means re-reading its file. The cache reads each distinct path
//! at most once, holding the read under the lock so concurrent lookups
//! of the same path cannot race a duplicate read.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::record::Span;

/// Caches full file texts by path, resolving relative paths against a
/// base directory.
pub struct SourceCache {
    base: PathBuf,
    files: Mutex<HashMap<String, Arc<str>>>,
}

impl SourceCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Full text of `path`, read on first use.
    pub fn text(&self, path: &str) -> Result<Arc<str>> {
        let mut files = self
            .files
            .lock()
            .map_err(|e| anyhow::anyhow!("source cache lock poisoned: {e}"))?;
        if let Some(text) = files.get(path) {
            return Ok(text.clone());
        }
        let resolved = self.resolve(path);
        let text: Arc<str> = fs::read_to_string(&resolved)
            .with_context(|| format!("failed to read {}", resolved.display()))?
            .into();
        files.insert(path.to_string(), text.clone());
        Ok(text)
    }

    /// Text covered by `spans` within `path`, multi-part spans joined
    /// with a single space.
    pub fn text_for(&self, path: &str, spans: &[Span]) -> Result<String> {
        let text = self.text(path)?;
        let mut parts = Vec::with_capacity(spans.len());
        for span in spans {
            let part = text
                .get(span.start..span.end)
                .with_context(|| format!("span {span} out of range in {path}"))?;
            parts.push(part);
        }
        Ok(parts.join(" "))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_text_for_single_span() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("a.java")).unwrap();
        write!(f, "int x; // set x\n").unwrap();

        let cache = SourceCache::new(dir.path());
        let text = cache.text_for("a.java", &[Span::new(7, 15)]).unwrap();
        assert_eq!(text, "// set x");
    }

    #[test]
    fn test_text_for_joins_multi_spans() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.java"), "abcdefghij").unwrap();

        let cache = SourceCache::new(dir.path());
        let text = cache
            .text_for("b.java", &[Span::new(0, 3), Span::new(5, 8)])
            .unwrap();
        assert_eq!(text, "abc fgh");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path());
        assert!(cache.text_for("nope.java", &[Span::new(0, 1)]).is_err());
    }

    #[test]
    fn test_out_of_range_span_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("c.java"), "xy").unwrap();
        let cache = SourceCache::new(dir.path());
        assert!(cache.text_for("c.java", &[Span::new(0, 9)]).is_err());
    }

    #[test]
    fn test_reads_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.java");
        fs::write(&path, "first").unwrap();

        let cache = SourceCache::new(dir.path());
        assert_eq!(cache.text_for("d.java", &[Span::new(0, 5)]).unwrap(), "first");

        // Rewriting the file must not be observed: the first read won.
        fs::write(&path, "other").unwrap();
        assert_eq!(cache.text_for("d.java", &[Span::new(0, 5)]).unwrap(), "first");
    }
}
