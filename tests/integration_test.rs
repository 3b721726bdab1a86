//! Integration test: engine processing, default fill, reaping, config load.

mod common;

use common::{engine, engine_with, event, HOUR, MINUTE, NOW};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use txn_features::config::{EngineConfig, StoreConfig};
use txn_features::{EngineError, FeatureName, FeatureVector, TransactionEvent};

#[test]
fn unknown_entity_gets_defaults() {
    let (engine, _) = engine();
    let f = engine.get_features("nobody");
    assert_eq!(f.transaction_velocity_1h, 0.0);
    assert_eq!(f.amount_zscore, 0.0);
    assert_eq!(f.amount_volatility, 0.0);
    assert_eq!(f.location_anomaly, 0.0);
    assert_eq!(f.location_consistency, 1.0);
    assert_eq!(f.time_pattern_score, 0.0);
    assert_eq!(f.merchant_diversity, 0.0);
    assert_eq!(f.payment_method_consistency, 1.0);
    assert_eq!(f, FeatureVector::default());
    assert!(!engine.store().contains("nobody"));
}

#[test]
fn velocity_counts_last_hour() {
    let (engine, _) = engine();
    for i in 0..7 {
        assert!(engine.process(event("u1", 20.0, (i * 5) as f64 * MINUTE)));
    }
    // Two hours old: outside the velocity window, inside the amount window.
    assert!(engine.process(event("u1", 20.0, 2.0 * HOUR)));

    assert_eq!(engine.get_features("u1").transaction_velocity_1h, 7.0);
}

#[test]
fn large_amount_after_steady_history_scores_high() {
    let (engine, _) = engine();
    for i in 0..10 {
        engine.process(event("u1", 100.0, (20 - i) as f64 * MINUTE));
    }
    engine.process(event("u1", 500.0, 0.0));

    let f = engine.get_features("u1");
    assert!(f.amount_zscore > 2.0, "zscore was {}", f.amount_zscore);
    assert!((f.amount_volatility - 0.1).abs() < 1e-9);
}

#[test]
fn rare_latest_location_is_anomalous() {
    let (engine, _) = engine();
    for i in 0..9 {
        engine.process(event("u1", 10.0, (10 - i) as f64 * MINUTE).with_location("A"));
    }
    engine.process(event("u1", 10.0, 0.0).with_location("B"));

    let f = engine.get_features("u1");
    assert_eq!(f.location_anomaly, 1.0);
    assert!((f.location_consistency - 0.9).abs() < 1e-9);
}

#[test]
fn merchant_diversity_bounds() {
    let (engine, _) = engine();
    let k = 4;
    for i in 0..k {
        engine.process(event("distinct", 10.0, i as f64 * MINUTE).with_merchant(format!("m{i}")));
        engine.process(event("same", 10.0, i as f64 * MINUTE).with_merchant("shop"));
    }
    assert_eq!(engine.get_features("distinct").merchant_diversity, 1.0);
    assert!((engine.get_features("same").merchant_diversity - 1.0 / k as f64).abs() < 1e-9);
}

#[test]
fn repeated_reads_are_identical() {
    let (engine, _) = engine();
    engine.process(event("u1", 42.0, 0.0).with_location("X").with_payment_method("card"));
    engine.process(event("u1", 50.0, 0.0).with_location("Y").with_payment_method("cash"));
    let a = engine.get_features("u1");
    let b = engine.get_features("u1");
    assert_eq!(a, b);
}

#[test]
fn epoch_is_derived_from_timestamp() {
    let (engine, _) = engine();
    let mut e = event("u1", 10.0, 0.0);
    e.timestamp = "2024-01-15T09:30:00Z".to_string();
    e.timestamp_epoch = None;
    assert!(engine.process(e));

    let stored = engine.store().windowed("u1", 60);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].timestamp_epoch, Some(NOW - 30.0 * MINUTE));
}

#[test]
fn offset_and_basic_timestamps_keep_their_instant() {
    let (engine, _) = engine();
    for (i, raw) in [
        "2024-01-15T11:30+02:00",
        "2024-01-15 09:30",
        "2024-01-15T09:30:00+0000",
        "20240115T093000Z",
    ]
    .into_iter()
    .enumerate()
    {
        let mut e = event("u1", 10.0, 0.0);
        e.timestamp = raw.to_string();
        e.timestamp_epoch = None;
        assert!(engine.process(e));

        let stored = engine.store().windowed("u1", 60);
        assert_eq!(stored.len(), i + 1);
        assert_eq!(stored[i].timestamp_epoch, Some(NOW - 30.0 * MINUTE), "{raw}");
    }
}

#[test]
fn unparseable_timestamp_uses_current_time() {
    let (engine, _) = engine();
    let mut e = event("u1", 10.0, 0.0);
    e.timestamp = "yesterday-ish".to_string();
    e.timestamp_epoch = None;
    assert!(engine.process(e));

    let stored = engine.store().windowed("u1", 60);
    assert_eq!(stored[0].timestamp_epoch, Some(NOW));
    assert_eq!(engine.get_features("u1").transaction_velocity_1h, 1.0);
}

#[test]
fn events_deserialize_with_user_id_alias() {
    let raw = r#"{"user_id":"u9","transaction_id":"t1","amount":12.5,
                 "timestamp":"2024-01-15T10:00:00Z","payment_method":"card"}"#;
    let e: TransactionEvent = serde_json::from_str(raw).unwrap();
    assert_eq!(e.entity_id, "u9");
    assert_eq!(e.timestamp_epoch, None);
    assert_eq!(e.payment_method(), Some("card"));
    assert_eq!(e.location(), None);
}

#[test]
fn compute_fault_keeps_event_but_reports_failure() {
    let (engine, _) = engine();
    assert!(engine.process(event("u1", 100.0, MINUTE)));

    let err = engine
        .try_process(event("u1", f64::INFINITY, 0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::NonFiniteFeature {
            feature: FeatureName::AmountZscore,
            ..
        }
    ));
    assert!(!engine.process(event("u1", f64::NAN, 0.0)));

    // History moved on, the feature vector did not.
    assert_eq!(engine.store().windowed("u1", 60).len(), 3);
    assert_eq!(engine.get_features("u1").transaction_velocity_1h, 1.0);
}

#[test]
fn processing_triggers_periodic_reap() {
    let (engine, clock) = engine();
    assert!(engine.process(event("old", 10.0, 0.0)));

    clock.advance(2.0 * HOUR);
    let outcome = engine
        .try_process(TransactionEvent::new("fresh", 10.0, NOW + 2.0 * HOUR))
        .unwrap();

    assert_eq!(outcome.reaped, Some(1));
    assert!(!engine.store().contains("old"));
    assert!(engine.store().contains("fresh"));
    assert_eq!(engine.store_stats().last_reap_at, NOW + 2.0 * HOUR);

    // Interval not yet elapsed: no sweep.
    let outcome = engine.try_process(TransactionEvent::new("fresh", 10.0, NOW + 2.0 * HOUR)).unwrap();
    assert_eq!(outcome.reaped, None);
}

#[test]
fn stats_track_entities_and_events() {
    let (engine, _) = engine();
    for i in 0..3 {
        engine.process(event("a", 1.0, i as f64));
    }
    engine.process(event("b", 1.0, 0.0));

    let stats = engine.store_stats();
    assert_eq!(stats.entity_count, 2);
    assert_eq!(stats.total_buffered_events, 4);
    assert_eq!(stats.window_minutes, 60);
    assert_eq!(stats.last_reap_at, NOW);
}

#[test]
fn concurrent_entities_do_not_lose_events() {
    let (engine, _) = engine();
    let engine = Arc::new(engine);
    let threads = 8;
    let per_thread = 50;

    std::thread::scope(|s| {
        for t in 0..threads {
            let engine = Arc::clone(&engine);
            s.spawn(move || {
                for i in 0..per_thread {
                    let entity = format!("user-{}", (t + i) % 4);
                    assert!(engine.process(event(&entity, 10.0 + i as f64, 0.0)));
                }
            });
        }
    });

    let total: f64 = (0..4)
        .map(|u| engine.get_features(&format!("user-{u}")).transaction_velocity_1h)
        .sum();
    assert_eq!(total, (threads * per_thread) as f64);
    assert_eq!(engine.store_stats().total_buffered_events, threads * per_thread);
}

#[test]
fn capacity_limits_velocity() {
    let config = EngineConfig {
        store: StoreConfig {
            history_capacity: 5,
            ..StoreConfig::default()
        },
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(config);
    for i in 0..8 {
        engine.process(event("burst", 1.0, (8 - i) as f64));
    }
    // All eight are inside the hour, only five are retained.
    assert_eq!(engine.get_features("burst").transaction_velocity_1h, 5.0);
}

#[test]
fn config_load_default() {
    let c = EngineConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.store.window_minutes, 60);
    assert_eq!(c.store.reap_interval_secs, 300);
    assert_eq!(c.store.history_capacity, 1000);
    assert_eq!(c.features.pattern_window_minutes, 10_080);
}

#[test]
fn config_load_partial_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"store": {{"window_minutes": 15}}, "log": {{"json": false}}}}"#).unwrap();

    let c = EngineConfig::try_load(file.path()).unwrap();
    assert_eq!(c.store.window_minutes, 15);
    assert_eq!(c.store.history_capacity, 1000);
    assert!(!c.log.json);
    assert_eq!(c.log.level, "info");
}

#[test]
fn config_load_invalid_falls_back() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    assert!(EngineConfig::try_load(file.path()).is_err());
    let c = EngineConfig::load(file.path());
    assert_eq!(c.store.window_minutes, 60);
}
