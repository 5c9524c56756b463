use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use comsift::annotate::{
    self,
    text::{Annotator, HttpAnnotator},
};
use comsift::config::Config;
use comsift::extract;
use comsift::record::RecordWriter;
use comsift::source_cache::SourceCache;

#[derive(Parser)]
#[command(name = "comsift", version, about = "Syntax-context feature extraction for source-code comments")]
struct Cli {
    /// Config file path.
    #[arg(long, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse source files and emit one feature record per comment.
    Extract {
        /// Source files; config patterns are used when empty.
        files: Vec<String>,

        /// Output path (stdout when absent).
        #[arg(short, long)]
        output: Option<String>,

        /// Tab-stop width for column features.
        #[arg(short, long)]
        tab_width: Option<usize>,
    },
    /// Read record streams back and append comment-text features.
    Annotate {
        /// Record stream files produced by `extract`.
        files: Vec<String>,

        /// Directory the record paths are relative to.
        #[arg(short, long, default_value = ".")]
        source_root: String,

        /// Output path (stdout when absent).
        #[arg(short, long)]
        output: Option<String>,

        /// CoreNLP-compatible annotation endpoint.
        #[arg(long)]
        annotator_url: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Extract {
            files,
            output,
            tab_width,
        } => {
            let files = if files.is_empty() {
                config.get_source_files()?
            } else {
                files
            };
            anyhow::ensure!(!files.is_empty(), "no input files");
            let tab_width = tab_width.unwrap_or(config.tab_width);

            let sink = open_sink(output.or(config.output))?;
            let mut writer = RecordWriter::new(sink);
            let summary = extract::run(&files, tab_width, &mut writer);
            writer.flush()?;

            info!(
                "Extracted {} comments from {} files ({} failed)",
                summary.comments, summary.processed, summary.failed
            );
        }
        Command::Annotate {
            files,
            source_root,
            output,
            annotator_url,
        } => {
            anyhow::ensure!(!files.is_empty(), "no record streams to annotate");
            let cache = SourceCache::new(&source_root);
            let annotator = match annotator_url.or(config.annotator_url) {
                Some(url) => Some(HttpAnnotator::new(url)?),
                None => None,
            };
            let annotator_ref: Option<&dyn Annotator> =
                annotator.as_ref().map(|a| a as &dyn Annotator);

            let sink = open_sink(output.or(config.output))?;
            let mut writer = RecordWriter::new(sink);
            let mut annotated = 0;
            let mut skipped = 0;
            for path in &files {
                let input = BufReader::new(
                    File::open(path).with_context(|| format!("failed to open {path}"))?,
                );
                let summary = annotate::run(input, &mut writer, &cache, annotator_ref)?;
                annotated += summary.annotated;
                skipped += summary.skipped;
            }

            info!("Annotated {annotated} records ({skipped} skipped)");
        }
    }

    Ok(())
}

fn open_sink(output: Option<String>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("failed to create {path}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
