//! Integration tests for the backtest and attribution engine

use aegis::services::Backtester;
use aegis::sources::{GeometricSeriesSource, HistoricalSeriesSource};
use aegis::types::{HedgeStrategyType, HistoricalPoint, HistoricalSeries};
use aegis::EngineError;

fn oscillating_series(points: usize) -> HistoricalSeries {
    GeometricSeriesSource::new(45000.0, 0.0005, 0.08).series("BTC", points)
}

#[test]
fn test_backtest_is_deterministic() {
    let backtester = Backtester::new();
    let series = oscillating_series(200);

    let first = backtester
        .run_backtest("bt-1", HedgeStrategyType::DeltaNeutral, &series, 100_000.0, 0.4)
        .unwrap();
    let second = backtester
        .run_backtest("bt-2", HedgeStrategyType::DeltaNeutral, &series, 100_000.0, 0.4)
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_backtest_trades_and_metrics_sane() {
    let backtester = Backtester::new();
    let series = oscillating_series(200);

    let result = backtester
        .run_backtest("bt-sane", HedgeStrategyType::DeltaNeutral, &series, 100_000.0, 0.4)
        .unwrap();

    assert!(result.total_trades > 0);
    assert!(result.win_rate >= 0.0 && result.win_rate <= 1.0);
    assert!(result.max_drawdown >= 0.0 && result.max_drawdown < 1.0);
    assert!(result.avg_hedge_cost > 0.0);
    assert_eq!(result.strategy, HedgeStrategyType::DeltaNeutral);
    // Daily timestamps produce a date-range period label.
    assert!(result.period.contains(" to "));
}

#[test]
fn test_strategy_kinds_produce_different_replays() {
    let backtester = Backtester::new();
    let series = oscillating_series(200);

    let protective = backtester
        .run_backtest("bt-pp", HedgeStrategyType::ProtectivePut, &series, 100_000.0, 0.25)
        .unwrap();
    let covered = backtester
        .run_backtest("bt-cc", HedgeStrategyType::CoveredCall, &series, 100_000.0, 0.25)
        .unwrap();

    // One watches downside moves, the other upside; trade timing differs.
    assert!(protective != covered);
}

#[test]
fn test_short_series_rejected() {
    let backtester = Backtester::new();
    let series = HistoricalSeries::new(
        "BTC",
        vec![HistoricalPoint { timestamp: 0, price: 100.0 }],
    );
    let err = backtester
        .run_backtest("bt-short", HedgeStrategyType::DeltaNeutral, &series, 100_000.0, 0.4)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStrategy(_)));
}

#[test]
fn test_non_positive_capital_rejected() {
    let backtester = Backtester::new();
    let series = oscillating_series(10);
    assert!(backtester
        .run_backtest("bt-cap", HedgeStrategyType::DeltaNeutral, &series, 0.0, 0.4)
        .is_err());
}

#[test]
fn test_cancel_unknown_backtest_is_false() {
    let backtester = Backtester::new();
    assert!(!backtester.cancel("nope"));
}

#[test]
fn test_cancellation_between_steps() {
    let backtester = std::sync::Arc::new(Backtester::new());
    let series = oscillating_series(2_000_000);

    let handle = {
        let backtester = std::sync::Arc::clone(&backtester);
        std::thread::spawn(move || {
            backtester.run_backtest(
                "bt-cancel",
                HedgeStrategyType::DeltaNeutral,
                &series,
                100_000.0,
                0.4,
            )
        })
    };

    // Keep requesting until the run registers, then let it observe the flag.
    while !backtester.cancel("bt-cancel") {
        if handle.is_finished() {
            break;
        }
        std::thread::yield_now();
    }
    let result = handle.join().unwrap();
    assert!(matches!(result.unwrap_err(), EngineError::Cancelled));
}

#[test]
fn test_attribution_decomposition() {
    let hedged = [0.01, -0.01, 0.01, -0.01];
    let unhedged = [0.02, -0.02, 0.02, -0.02];

    let attribution =
        Backtester::attribute("1M", 0.087, -0.023, 0.0045, &hedged, &unhedged);

    assert!((attribution.alpha_return - 0.110).abs() < 1e-12);
    // Variance drops by a factor of four.
    assert!((attribution.effectiveness - 0.75).abs() < 1e-12);
    assert!((attribution.cost_benefit_ratio - 0.023 / 0.0045).abs() < 1e-12);
    assert!(attribution.risk_adjusted_return > 0.0);
    assert_eq!(attribution.period, "1M");
}

#[test]
fn test_attribution_zero_costs_and_variance() {
    let attribution = Backtester::attribute("3M", 0.1, 0.0, 0.0, &[], &[]);
    assert_eq!(attribution.effectiveness, 0.0);
    assert_eq!(attribution.cost_benefit_ratio, 0.0);
    assert_eq!(attribution.risk_adjusted_return, 0.0);
    assert_eq!(attribution.alpha_return, 0.1);
}
