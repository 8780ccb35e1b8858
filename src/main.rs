//! email-extract: classify emails, extract typed fields, verify, and write
//! one JSON line per email.
//!
//! ```bash
//! # JSON list of {"id", "body"} objects
//! email-extract --input emails.json --output result.jsonl
//!
//! # Directory of basename.html / basename.txt files
//! email-extract --dir ./mail/
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use email_extract::config::PipelineConfig;
use email_extract::llm::create_provider;
use email_extract::loader::DocumentSource;
use email_extract::pipeline::{JsonlSink, Orchestrator};

/// Email classification and field extraction.
#[derive(Parser, Debug)]
#[command(name = "email-extract")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file containing a list of {"id", "body"} objects
    #[arg(long, default_value = "emails.json", conflicts_with = "dir")]
    input: PathBuf,

    /// Directory of .html / .txt email files (files sharing a name are one email)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Results file, one JSON object per line (truncated at start)
    #[arg(short, long, default_value = "result.jsonl")]
    output: PathBuf,

    /// Model identifier, overrides MODEL_CLASSIFY
    #[arg(long)]
    model: Option<String>,

    /// Do not send the source email to the verifier
    #[arg(long)]
    no_verify_source: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.no_verify_source {
        config.verify_with_source = false;
    }

    let source = match args.dir {
        Some(dir) => DocumentSource::Directory(dir),
        None => DocumentSource::JsonFile(args.input),
    };
    let documents = source
        .pending_documents()
        .await
        .context("Failed to load input documents")?;

    eprintln!("📬 email-extract v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Documents: {}", documents.len());
    eprintln!("   Output: {}", args.output.display());

    let llm = create_provider(&config.llm_config())?;
    let orchestrator = Orchestrator::new(llm, config.pipeline_options(source.deduplicates()));

    let mut sink = JsonlSink::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let summary = orchestrator.run(documents, &mut sink).await?;

    let elapsed = summary.finished_at - summary.started_at;
    eprintln!();
    eprintln!("✅ Processed {} emails → {}", summary.processed, args.output.display());
    eprintln!("   Skipped (empty): {}", summary.skipped_empty);
    eprintln!("   Duplicates: {}", summary.duplicates);
    eprintln!(
        "   Fallbacks: {} classify, {} extract, {} verify",
        summary.classify_fallbacks, summary.extract_fallbacks, summary.verify_fallbacks
    );
    eprintln!("   Schema disagreements: {}", summary.schema_disagreements);
    eprintln!("   Elapsed: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);

    Ok(())
}

/// Console logging filtered by `RUST_LOG` (default `info`), plus a daily
/// rolling file when `EMAIL_EXTRACT_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match std::env::var("EMAIL_EXTRACT_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "email-extract.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    guard
}
