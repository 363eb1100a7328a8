//! bca-engine - business-case analysis runner
//!
//! Loads configuration and an evidence file, runs one analysis session and
//! prints the `AnalysisResult` as JSON on stdout. Progress goes to the log.

use anyhow::{Context, Result};
use bca_common::config::ConfigResolver;
use bca_common::events::AnalysisEvent;
use bca_common::logging::init_tracing;
use bca_engine::config::build_orchestrator;
use bca_engine::evidence_provider::{EvidenceProvider, JsonFileEvidence};
use bca_engine::sink::JsonLinesSink;
use bca_engine::TaxonomyRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "bca-engine", version, about = "Hierarchical business-case scoring")]
struct Args {
    /// Configuration file (falls back to BCA_CONFIG, then the user config dir)
    #[arg(short, long, env = "BCA_CONFIG")]
    config: Option<PathBuf>,

    /// Evidence JSON file (`SubjectKnowledge`)
    #[arg(short, long)]
    evidence: PathBuf,

    /// Session id (random when omitted)
    #[arg(long)]
    session_id: Option<Uuid>,

    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,

    /// Append every record to this JSON-lines file as it is produced
    #[arg(long)]
    output_jsonl: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting bca-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let knowledge = JsonFileEvidence::new(&args.evidence)
        .load()
        .await
        .with_context(|| format!("Failed to load evidence from {}", args.evidence.display()))?;

    let taxonomy = Arc::new(TaxonomyRegistry::builtin());
    let mut orchestrator =
        build_orchestrator(&config, taxonomy).context("Failed to build orchestrator")?;
    if let Some(path) = &args.output_jsonl {
        info!("Writing records to {}", path.display());
        orchestrator = orchestrator.with_sink(Arc::new(JsonLinesSink::new(path)));
    }

    if let Some(bus) = orchestrator.event_bus() {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let AnalysisEvent::StageChanged {
                    stage,
                    percent_complete,
                    ..
                } = event
                {
                    info!(stage = ?stage, percent_complete, "Progress");
                }
            }
        });
    }

    let cancel_token = CancellationToken::new();
    {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling at next batch boundary");
                token.cancel();
            }
        });
    }

    let session_id = args.session_id.unwrap_or_else(Uuid::new_v4);
    let outcome = orchestrator
        .run_analysis_with_cancel(session_id, knowledge, cancel_token)
        .await;

    let (result, error) = match outcome {
        Ok(result) => (result, None),
        Err(failure) => (*failure.partial, Some(failure.error)),
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    match error {
        Some(e) => Err(anyhow::anyhow!("Analysis session {} did not complete: {}", session_id, e)),
        None => Ok(()),
    }
}
