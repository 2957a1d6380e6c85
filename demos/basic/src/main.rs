/**
 * Minimal harness for seqlog against a local Seq instance.
 *
 * Start Seq on the default port, then run:
 *
 *   cargo run -p seqlog_demo
 *   cargo run -p seqlog_demo -- --api-key KEY   # authenticated ingestion
 *   cargo run -p seqlog_demo -- --quiet         # no console output
 */
use tracing::level_filters::LevelFilter;

const ENDPOINT: &str = "http://localhost:5341/";

fn main() -> Result<(), seqlog::InitError> {
    let args: Vec<String> = std::env::args().collect();
    let quiet = args.iter().any(|a| a == "--quiet");
    let api_key = args
        .iter()
        .position(|a| a == "--api-key")
        .and_then(|i| args.get(i + 1).cloned());

    let _guard = seqlog::init(seqlog::Options {
        endpoint: ENDPOINT.into(),
        api_key,
        console: !quiet,
        fallback_logs: true,
        max_level: LevelFilter::DEBUG,
        ..Default::default()
    })?;

    tracing::debug!(level = "debug", ok = true, "Debug message");
    tracing::info!(level = "info", binary = ?b"hello", original = "hello", "Info message");
    tracing::warn!(newline = "{\n    \"hello\": \"world\"\n}", "Warning message");

    if let Err(e) = std::fs::read_to_string("/nonexistent/path.txt") {
        tracing::error!(error = %e, "Error message");
    }

    println!("[demo] Done. Records are delivered when _guard drops.");
    Ok(())
}
