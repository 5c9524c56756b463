//! Annotation stage: read a record stream back, recover each comment's
//! text, and append text-derived features before re-emitting.
//!
//! Runs independently of extraction and communicates with it only
//! through the record format. Text comes from the source cache; when a
//! file cannot be read, the `+ ` echo carried in the stream is used
//! instead.
pub mod text;

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::{debug, warn};

use crate::record::{RecordError, RecordReader, RecordWriter};
use crate::source_cache::SourceCache;
use text::{Annotator, is_code_like, pos_tags, words};

/// Outcome counters for one annotation run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    pub annotated: usize,
    pub skipped: usize,
}

/// Annotate every record group in `input`, writing a new stream to
/// `writer`. Malformed groups and unrecoverable texts are reported and
/// skipped, consistently; they never abort the run.
pub fn run<R: BufRead, W: Write>(
    input: R,
    writer: &mut RecordWriter<W>,
    cache: &SourceCache,
    annotator: Option<&dyn Annotator>,
) -> Result<AnnotateSummary> {
    let mut reader = RecordReader::new(input);
    let mut summary = AnnotateSummary::default();

    loop {
        let group = match reader.next_group() {
            Ok(Some(group)) => group,
            Ok(None) => break,
            Err(RecordError::Malformed(msg)) => {
                warn!("Skipping malformed record: {msg}");
                summary.skipped += 1;
                continue;
            }
            Err(RecordError::Io(e)) => return Err(e.into()),
        };

        let mut entry = group.entry;
        let comment_text = match cache.text_for(&entry.path, &entry.spans) {
            Ok(text) => text,
            Err(e) => match group.raw {
                // The echo line has newlines flattened already; good
                // enough for text features.
                Some(raw) => {
                    debug!("Using echoed text for {}: {e:#}", entry.path);
                    raw
                }
                None => {
                    warn!("No text recoverable for {}: {e:#}", entry.path);
                    summary.skipped += 1;
                    continue;
                }
            },
        };

        if let Some(annotator) = annotator {
            match annotator.annotate(&comment_text) {
                Ok(Some(sentence)) => {
                    entry.feats.set("words", words(&sentence));
                    entry.feats.set("posTags", pos_tags(&sentence));
                    if let Some(parse) = &sentence.parse {
                        entry.feats.set("parseLevel1", parse.flatten(0));
                        entry.feats.set("parseLevel2", parse.flatten(1));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Annotator failed on {}: {e}", entry.path),
            }
        }
        entry.feats.set("codeLike", is_code_like(&comment_text));

        writer.write_group(&entry, None)?;
        summary.annotated += 1;
    }

    writer.flush()?;
    Ok(summary)
}
