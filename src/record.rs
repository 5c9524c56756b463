//! Record shapes shared by every pipeline stage and their line-oriented
//! text forms.
//!
//! Every stage boundary round-trips through this format, so encode and
//! decode are exact inverses except for feature-set key order, which is
//! sorted on render and never significant to readers.
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while decoding a record line.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

// ── Span ─────────────────────────────────────────────────────────────

/// A half-open byte-offset interval `[start, end)` in one source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for Span {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| RecordError::Malformed(format!("span missing ':': {s}")))?;
        let start: usize = start
            .parse()
            .map_err(|_| RecordError::Malformed(format!("bad span start: {s}")))?;
        let end: usize = end
            .parse()
            .map_err(|_| RecordError::Malformed(format!("bad span end: {s}")))?;
        if end < start {
            return Err(RecordError::Malformed(format!("span end before start: {s}")));
        }
        Ok(Span { start, end })
    }
}

// ── FeatureSet ───────────────────────────────────────────────────────

/// A flat key/value mapping attached to one comment.
///
/// Values are string-encoded regardless of underlying type and must not
/// contain spaces; producers sanitize free text before insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    feats: BTreeMap<String, String>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature, rendering the value as text. Replaces any
    /// previous value under the same key.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.feats.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.feats.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.feats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.feats.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.feats.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for FeatureSet {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut feats = BTreeMap::new();
        for entry in s.split(' ') {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| RecordError::Malformed(format!("feature missing '=': {entry}")))?;
            feats.insert(key.to_string(), value.to_string());
        }
        Ok(FeatureSet { feats })
    }
}

// ── CommentEntry ─────────────────────────────────────────────────────

/// One comment found in one file: its path, the span(s) of its text, and
/// the features derived so far.
///
/// Entries are write-once: each stage reads a stream and produces a new
/// one rather than editing in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentEntry {
    pub path: String,
    pub spans: Vec<Span>,
    pub feats: FeatureSet,
}

impl CommentEntry {
    pub fn new(path: impl Into<String>, spans: Vec<Span>, feats: FeatureSet) -> Self {
        Self {
            path: path.into(),
            spans,
            feats,
        }
    }
}

impl fmt::Display for CommentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@ {} ", self.path)?;
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{span}")?;
        }
        write!(f, " {}", self.feats)
    }
}

impl FromStr for CommentEntry {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("@ ")
            .ok_or_else(|| RecordError::Malformed(format!("missing '@' marker: {s}")))?;
        let (path, rest) = rest
            .split_once(' ')
            .ok_or_else(|| RecordError::Malformed(format!("missing path delimiter: {s}")))?;
        let (spans, feats) = rest
            .split_once(' ')
            .ok_or_else(|| RecordError::Malformed(format!("missing span delimiter: {s}")))?;

        let spans = spans
            .split(',')
            .map(Span::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        let feats = feats.parse()?;

        Ok(CommentEntry {
            path: path.to_string(),
            spans,
            feats,
        })
    }
}

// ── Stream reader / writer ───────────────────────────────────────────

/// One logical record in the stream: an entry line plus its optional
/// `+ ` raw-text echo.
#[derive(Debug, Clone)]
pub struct RecordGroup {
    pub entry: CommentEntry,
    pub raw: Option<String>,
}

/// Reads blank-line-delimited record groups from a text stream.
pub struct RecordReader<R: BufRead> {
    input: R,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Read the next record group, or `None` at end of stream.
    ///
    /// Lines inside a group that are neither the entry nor a `+ ` echo
    /// fail with `Malformed`; the caller decides whether to skip or abort.
    pub fn next_group(&mut self) -> Result<Option<RecordGroup>, RecordError> {
        let mut entry: Option<CommentEntry> = None;
        let mut raw: Option<String> = None;

        loop {
            let mut line = String::new();
            let n = self.input.read_line(&mut line)?;
            if n == 0 {
                // End of stream closes any open group.
                return Ok(entry.map(|entry| RecordGroup { entry, raw }));
            }
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(entry) = entry {
                    return Ok(Some(RecordGroup { entry, raw }));
                }
                // Blank line between groups; drop any echo orphaned by
                // a skipped entry line.
                raw = None;
                continue;
            }

            if line.starts_with("@ ") {
                if entry.is_some() {
                    return Err(RecordError::Malformed(format!(
                        "entry line before group end: {line}"
                    )));
                }
                entry = Some(line.parse()?);
            } else if let Some(text) = line.strip_prefix("+ ") {
                raw = Some(text.to_string());
            } else {
                return Err(RecordError::Malformed(format!("unexpected line: {line}")));
            }
        }
    }
}

/// Writes record groups to a text stream, one blank line after each.
pub struct RecordWriter<W: Write> {
    output: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    /// Write one entry, with its raw-text echo when given. Embedded
    /// newlines in the echo are flattened to spaces.
    pub fn write_group(&mut self, entry: &CommentEntry, raw: Option<&str>) -> io::Result<()> {
        writeln!(self.output, "{entry}")?;
        if let Some(raw) = raw {
            writeln!(self.output, "+ {}", raw.replace('\n', " "))?;
        }
        writeln!(self.output)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_round_trip() {
        let span = Span::new(8, 16);
        assert_eq!(span.to_string(), "8:16");
        let parsed: Span = "8:16".parse().unwrap();
        assert_eq!(parsed, span);
    }

    #[test]
    fn test_span_rejects_garbage() {
        assert!("8".parse::<Span>().is_err());
        assert!("a:b".parse::<Span>().is_err());
        assert!("9:3".parse::<Span>().is_err());
    }

    #[test]
    fn test_feature_set_round_trip() {
        let mut feats = FeatureSet::new();
        feats.set("line", 3);
        feats.set("type", "LineComment");
        feats.set("parentStart", false);

        let encoded = feats.to_string();
        let parsed: FeatureSet = encoded.parse().unwrap();
        assert_eq!(parsed, feats);
        assert_eq!(parsed.get("type"), Some("LineComment"));
        assert_eq!(parsed.get("parentStart"), Some("false"));
    }

    #[test]
    fn test_feature_set_render_is_key_sorted() {
        let mut feats = FeatureSet::new();
        feats.set("zeta", 1);
        feats.set("alpha", 2);
        assert_eq!(feats.to_string(), "alpha=2 zeta=1");
    }

    #[test]
    fn test_feature_set_rejects_missing_eq() {
        assert!("type=Line badpair".parse::<FeatureSet>().is_err());
    }

    #[test]
    fn test_comment_entry_decode() {
        let entry: CommentEntry = "@ Foo.java 8:16 type=LineComment line=0".parse().unwrap();
        assert_eq!(entry.path, "Foo.java");
        assert_eq!(entry.spans, vec![Span::new(8, 16)]);
        assert_eq!(entry.feats.get("type"), Some("LineComment"));
        assert_eq!(entry.feats.get("line"), Some("0"));
    }

    #[test]
    fn test_comment_entry_round_trip_multi_span() {
        let mut feats = FeatureSet::new();
        feats.set("type", "BlockComment");
        let entry = CommentEntry::new("a/b.rs", vec![Span::new(1, 4), Span::new(9, 12)], feats);
        let parsed: CommentEntry = entry.to_string().parse().unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_comment_entry_rejects_missing_marker() {
        assert!("Foo.java 8:16 type=x".parse::<CommentEntry>().is_err());
        assert!("@ Foo.java".parse::<CommentEntry>().is_err());
    }

    #[test]
    fn test_stream_round_trip() {
        let mut feats = FeatureSet::new();
        feats.set("line", 0);
        let entry = CommentEntry::new("x.java", vec![Span::new(2, 5)], feats);

        let mut buf = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer.write_group(&entry, Some("first\nsecond")).unwrap();
            writer.write_group(&entry, None).unwrap();
        }

        let mut reader = RecordReader::new(&buf[..]);
        let g1 = reader.next_group().unwrap().unwrap();
        assert_eq!(g1.entry, entry);
        assert_eq!(g1.raw.as_deref(), Some("first second"));

        let g2 = reader.next_group().unwrap().unwrap();
        assert_eq!(g2.entry, entry);
        assert!(g2.raw.is_none());

        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn test_reader_tolerates_missing_final_blank() {
        let data = b"@ x.java 2:5 line=0\n+ text here".to_vec();
        let mut reader = RecordReader::new(&data[..]);
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.entry.path, "x.java");
        assert_eq!(g.raw.as_deref(), Some("text here"));
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn test_reader_flags_junk_line() {
        let data = b"junk\n".to_vec();
        let mut reader = RecordReader::new(&data[..]);
        assert!(reader.next_group().is_err());
    }
}
