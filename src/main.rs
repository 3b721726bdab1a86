//! Replay harness: feeds NDJSON transaction events through the feature engine
//! and prints one JSON feature record per event on stdout.
//!
//! Usage: `txn-features [EVENTS.ndjson]` (reads stdin when no path is given).
//! Config is read from `TXN_FEATURES_CONFIG` (default `config.json`).

use std::io::{BufRead, BufReader, Write};
use tracing::{info, warn};
use txn_features::{
    config::EngineConfig,
    events::TransactionEvent,
    features::FeatureEngine,
    logging::{FeatureRecord, StructuredLogger},
    time::{format_epoch, Clock},
};

fn replay(
    engine: &FeatureEngine,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let mut processed = 0;
    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TransactionEvent = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed event");
                continue;
            }
        };
        let entity_id = event.entity_id.clone();
        let transaction_id = event.transaction_id.clone();
        let (ok, reaped) = match engine.try_process(event) {
            Ok(outcome) => (true, outcome.reaped),
            Err(e) => {
                warn!(entity_id = %entity_id, error = %e, "feature computation failed");
                (false, None)
            }
        };
        let features = engine.get_features(&entity_id);
        StructuredLogger::emit_json(
            &FeatureRecord {
                ts: format_epoch(engine.store().clock().now()),
                entity_id: &entity_id,
                transaction_id: &transaction_id,
                ok,
                features: &features,
                reaped,
            },
            out,
        )?;
        processed += 1;
    }
    Ok(processed)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("TXN_FEATURES_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = EngineConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(
        window_minutes = config.store.window_minutes,
        capacity = config.store.history_capacity,
        "feature engine starting"
    );

    let engine = FeatureEngine::new(&config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let processed = match std::env::args_os().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path)?;
            replay(&engine, BufReader::new(file), &mut out)?
        }
        None => replay(&engine, std::io::stdin().lock(), &mut out)?,
    };
    out.flush()?;

    let stats = engine.store_stats();
    info!(
        processed,
        entities = stats.entity_count,
        buffered = stats.total_buffered_events,
        "replay complete"
    );
    Ok(())
}
