//! Replay a JSON-lines request log against a fresh market.
//!
//! ```text
//! carbonmatch-replay --config market.json --requests log.jsonl \
//!     [--snapshot-out final.json] [--json-logs]
//! ```
//!
//! Each input line is an `Envelope` (`{"caller": "0x..", "request": {..}}`).
//! One JSON line per request is printed to stdout: `{"line": n, "ok": ..}`
//! or `{"line": n, "error": {"kind": .., "message": ..}}`. A line that
//! cannot be decoded is reported the same way and the replay moves on.
//! Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use carbonmatch_market::{CarbonMarket, LogFormat, MarketService, init_tracing};
use carbonmatch_types::{CarbonError, Envelope, MarketConfig, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "carbonmatch-replay")]
#[command(about = "Replay a JSON-lines request log against a fresh CarbonMatch market", long_about = None)]
struct Args {
    /// Market config (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Request log, one envelope per line
    #[arg(long)]
    requests: PathBuf,

    /// Write the final snapshot here
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn error_line(line_no: usize, err: &CarbonError) -> serde_json::Value {
    serde_json::json!({
        "line": line_no,
        "error": { "kind": format!("{:?}", err.kind()), "message": err.to_string() },
    })
}

async fn replay(args: Args) -> Result<()> {
    let config = MarketConfig::load(&args.config)?;
    let depth = config.service_queue_depth;
    let market = CarbonMarket::new(config)?;
    let (handle, task) = MarketService::spawn(market, depth);

    let log = std::fs::read_to_string(&args.requests)?;
    let mut accepted = 0usize;
    let mut rejected = 0usize;
    for (index, line) in log.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = match Envelope::from_json_line(line) {
            Ok(envelope) => handle.submit(envelope).await,
            Err(err) => {
                tracing::warn!(line = line_no, %err, "Skipping undecodable request");
                Err(err)
            }
        };
        let output = match outcome {
            Ok(response) => {
                accepted += 1;
                serde_json::json!({ "line": line_no, "ok": response })
            }
            Err(err) => {
                rejected += 1;
                error_line(line_no, &err)
            }
        };
        println!("{output}");
    }

    handle.verify_supply().await?;
    drop(handle);
    let market = task
        .await
        .map_err(|e| CarbonError::Internal(format!("market service task failed: {e}")))?;
    tracing::info!(accepted, rejected, "Replay finished");

    if let Some(path) = args.snapshot_out {
        let snapshot = market.snapshot()?;
        snapshot.write_to(&path)?;
        tracing::info!(path = %path.display(), digest = %snapshot.state_digest, "Snapshot written");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Plain
    };
    if let Err(err) = init_tracing(format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match replay(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "Replay failed");
            ExitCode::FAILURE
        }
    }
}
