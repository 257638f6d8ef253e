//! Integration tests for the live engine cycle

use aegis::config::Config;
use aegis::services::RiskEngine;
use aegis::sources::{GreeksModel, ImmediateFillGateway, RollingStdForecaster};
use aegis::types::{
    AlertLevel, CorrelationMatrix, Greeks, GreeksDelta, MarketTick, Position,
};
use std::sync::Arc;

/// Greeks model that leaves positions untouched, for exact assertions.
struct StaticGreeks;

impl GreeksModel for StaticGreeks {
    fn update(&self, _position: &Position) -> GreeksDelta {
        GreeksDelta::default()
    }
}

fn test_config() -> Config {
    Config {
        tracked_assets: vec!["BTC".to_string(), "ETH".to_string()],
        ..Config::default()
    }
}

fn engine_with_config(config: Config) -> RiskEngine {
    RiskEngine::new(
        config,
        Arc::new(ImmediateFillGateway::new()),
        Arc::new(RollingStdForecaster::new(32)),
        Arc::new(StaticGreeks),
    )
}

fn seed_book(engine: &RiskEngine) {
    let store = engine.store();
    store.open(Position::new(
        "pos-btc",
        "BTC",
        2.0,
        45000.0,
        Greeks::new(0.6, 0.03, -30.0, 80.0),
    ));
    store.open(Position::new(
        "pos-eth",
        "ETH",
        10.0,
        2500.0,
        Greeks::new(0.4, 0.02, -20.0, 60.0),
    ));
}

#[tokio::test]
async fn test_cycle_commits_snapshot() {
    let engine = engine_with_config(test_config());
    seed_book(&engine);

    let before = engine.current_snapshot();
    assert_eq!(before.version, 0);
    assert!(before.metrics.is_none());

    engine.run_cycle(&[MarketTick::new("BTC", 46000.0)]);

    let snapshot = engine.current_snapshot();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.positions.len(), 2);

    let metrics = snapshot.metrics.as_ref().unwrap();
    assert!((metrics.total_delta - 1.0).abs() < 1e-12);
    assert!((metrics.total_theta + 50.0).abs() < 1e-12);

    // The tick re-marked the BTC book.
    let btc = snapshot.positions.iter().find(|p| p.asset == "BTC").unwrap();
    assert_eq!(btc.current_price, 46000.0);
    assert_eq!(btc.unrealized_pnl, 2000.0);
}

#[tokio::test]
async fn test_committed_snapshot_is_immutable() {
    let engine = engine_with_config(test_config());
    seed_book(&engine);

    engine.run_cycle(&[]);
    let first = engine.current_snapshot();

    engine.run_cycle(&[MarketTick::new("BTC", 50000.0)]);
    let second = engine.current_snapshot();

    // The earlier frame still reads its own prices.
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    let old_btc = first.positions.iter().find(|p| p.asset == "BTC").unwrap();
    assert_eq!(old_btc.current_price, 45000.0);
}

#[tokio::test]
async fn test_tick_for_unknown_asset_is_skipped() {
    let engine = engine_with_config(test_config());
    seed_book(&engine);

    // No open DOGE book; the cycle still commits.
    engine.run_cycle(&[MarketTick::new("DOGE", 0.1)]);
    assert_eq!(engine.current_snapshot().version, 1);
}

#[tokio::test]
async fn test_var_limit_breach_raises_critical() {
    let config = Config {
        var_limit: Some(1.0),
        ..test_config()
    };
    let engine = engine_with_config(config);
    seed_book(&engine);

    let assets = vec!["BTC".to_string(), "ETH".to_string()];
    engine
        .set_correlation_matrix(
            CorrelationMatrix::new(assets, vec![vec![1.0, 0.85], vec![0.85, 1.0]]).unwrap(),
        )
        .unwrap();

    // Feed enough ticks for a non-zero volatility estimate.
    engine.run_cycle(&[MarketTick::new("BTC", 45000.0), MarketTick::new("ETH", 2500.0)]);
    engine.run_cycle(&[MarketTick::new("BTC", 47000.0), MarketTick::new("ETH", 2600.0)]);
    engine.run_cycle(&[MarketTick::new("BTC", 44000.0), MarketTick::new("ETH", 2450.0)]);

    assert!(engine
        .alerts()
        .recent()
        .iter()
        .any(|a| a.level == AlertLevel::Critical && a.message.contains("VaR limit exceeded")));
}

#[tokio::test]
async fn test_band_crossing_between_cycles_alerts() {
    let engine = engine_with_config(test_config());
    seed_book(&engine);
    let assets = vec!["BTC".to_string(), "ETH".to_string()];

    engine
        .set_correlation_matrix(
            CorrelationMatrix::new(assets.clone(), vec![vec![1.0, 0.78], vec![0.78, 1.0]])
                .unwrap(),
        )
        .unwrap();
    engine.run_cycle(&[]);

    engine
        .set_correlation_matrix(
            CorrelationMatrix::new(assets, vec![vec![1.0, 0.86], vec![0.86, 1.0]]).unwrap(),
        )
        .unwrap();
    engine.run_cycle(&[]);

    assert!(engine
        .alerts()
        .recent()
        .iter()
        .any(|a| a.level == AlertLevel::Warning && a.message.contains("Correlation spike")));
}

#[tokio::test]
async fn test_invalid_matrix_rejected_at_the_door() {
    let engine = engine_with_config(test_config());
    let assets = vec!["BTC".to_string(), "ETH".to_string()];
    let asymmetric = CorrelationMatrix {
        assets,
        values: vec![vec![1.0, 0.5], vec![0.7, 1.0]],
    };
    assert!(engine.set_correlation_matrix(asymmetric).is_err());
}

#[tokio::test]
async fn test_pause_resume_keeps_store_state() {
    let engine = engine_with_config(test_config());
    seed_book(&engine);

    engine.run_cycle(&[MarketTick::new("BTC", 46000.0)]);
    // A paused scheduler just stops calling run_cycle; nothing is lost.
    let resumed = {
        engine.run_cycle(&[]);
        engine.current_snapshot()
    };
    let btc = resumed.positions.iter().find(|p| p.asset == "BTC").unwrap();
    assert_eq!(btc.current_price, 46000.0);
    assert_eq!(resumed.positions.len(), 2);
}
