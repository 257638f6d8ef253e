use aegis::config::Config;
use aegis::services::{Backtester, RiskEngine, StrategyPricer};
use aegis::sources::{
    GeometricSeriesSource, HistoricalSeriesSource, ImmediateFillGateway, RandomWalkFeed,
    RandomWalkGreeks, RollingStdForecaster,
};
use aegis::types::{
    CorrelationMatrix, Greeks, HedgeInstrument, HedgeStrategy, HedgeStrategyType, LegAction,
    OptionType, OptionsLeg, Position,
};
use chrono::{Days, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegis=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    let risk_free_rate = config.risk_free_rate;
    info!(
        "starting aegis engine: {} tracked assets, {}ms cycle",
        config.tracked_assets.len(),
        config.aggregation_interval_ms
    );

    // Simulated collaborators; swap for real connectors in deployment
    let seeds = [
        ("BTC", 45000.0),
        ("ETH", 2500.0),
        ("SOL", 100.0),
        ("AVAX", 35.0),
        ("MATIC", 0.85),
        ("DOT", 7.5),
    ];
    let gateway = Arc::new(ImmediateFillGateway::new());
    for (asset, price) in &seeds {
        gateway.set_mark(asset, *price);
    }
    let feed = Arc::new(RandomWalkFeed::new(&seeds, 0.002));
    let forecaster = Arc::new(RollingStdForecaster::new(96));

    let engine = RiskEngine::new(
        config,
        gateway,
        forecaster,
        Arc::new(RandomWalkGreeks),
    );

    let assets: Vec<String> = ["BTC", "ETH", "SOL", "AVAX", "MATIC", "DOT"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let matrix = CorrelationMatrix::new(
        assets,
        vec![
            vec![1.00, 0.85, 0.72, 0.68, 0.61, 0.58],
            vec![0.85, 1.00, 0.78, 0.74, 0.69, 0.65],
            vec![0.72, 0.78, 1.00, 0.82, 0.71, 0.67],
            vec![0.68, 0.74, 0.82, 1.00, 0.75, 0.72],
            vec![0.61, 0.69, 0.71, 0.75, 1.00, 0.68],
            vec![0.58, 0.65, 0.67, 0.72, 0.68, 1.00],
        ],
    )?;
    engine.set_correlation_matrix(matrix)?;

    // Seed a demo book
    let store = engine.store();
    store.open(
        Position::new("pos-btc-0", "BTC", 2.5, 45000.0, Greeks::new(0.62, 0.03, -38.0, 85.0))
            .on_exchange("OKX"),
    );
    store.open(
        Position::new("pos-eth-1", "ETH", 40.0, 2500.0, Greeks::new(0.48, 0.02, -22.0, 60.0))
            .on_exchange("Deribit"),
    );
    store.open(
        Position::new("pos-sol-2", "SOL", 500.0, 100.0, Greeks::new(0.55, 0.04, -12.0, 45.0))
            .on_exchange("Bybit"),
    );
    store.open(
        Position::new("pos-avax-3", "AVAX", 900.0, 35.0, Greeks::new(0.35, 0.015, -9.0, 30.0))
            .on_exchange("OKX"),
    );

    // Default hedge strategies
    let hedges = engine.hedges();
    hedges.upsert_strategy(HedgeStrategy::new(
        "delta-neutral-1",
        "Delta Neutral BTC",
        HedgeStrategyType::DeltaNeutral,
        "BTC",
        0.5,
        HedgeInstrument::Perpetual,
        "OKX",
    ));
    let mut protective = HedgeStrategy::new(
        "protective-put-1",
        "Protective Put ETH",
        HedgeStrategyType::ProtectivePut,
        "ETH",
        0.7,
        HedgeInstrument::Options,
        "Deribit",
    );
    protective.enabled = false;
    hedges.upsert_strategy(protective);
    hedges.upsert_strategy(HedgeStrategy::new(
        "covered-call-1",
        "Covered Call SOL",
        HedgeStrategyType::CoveredCall,
        "SOL",
        0.6,
        HedgeInstrument::Options,
        "Deribit",
    ));

    // Reference options structure; derived analytics are recomputed from the
    // legs rather than stored
    let pricer = StrategyPricer::new(risk_free_rate);
    let expiry = Utc::now().date_naive() + Days::new(30);
    let condor = [
        OptionsLeg::new(OptionType::Put, LegAction::Sell, 42000.0, expiry, 1.0, 850.0),
        OptionsLeg::new(OptionType::Put, LegAction::Buy, 40000.0, expiry, 1.0, 450.0),
        OptionsLeg::new(OptionType::Call, LegAction::Sell, 48000.0, expiry, 1.0, 920.0),
        OptionsLeg::new(OptionType::Call, LegAction::Buy, 50000.0, expiry, 1.0, 520.0),
    ];
    let pricing = pricer.price(&condor, 1.0, Utc::now().date_naive())?;
    info!(
        "reference condor priced: breakevens {:?}, time decay {:.1}/day",
        pricing.breakevens, pricing.time_decay
    );

    // One-shot reference backtest over a deterministic series; runs as an
    // isolated job alongside the live loop and lands in the log
    tokio::task::spawn_blocking(|| {
        let backtester = Backtester::new();
        let series = GeometricSeriesSource::new(45000.0, 0.0005, 0.08).series("BTC", 180);
        match backtester.run_backtest(
            "startup-reference",
            HedgeStrategyType::DeltaNeutral,
            &series,
            100_000.0,
            0.4,
        ) {
            Ok(result) => info!(
                "reference backtest ({}): {} trades, {:.2}% return, sharpe {:.2}, calmar {:.2}",
                result.period,
                result.total_trades,
                result.total_return * 100.0,
                result.sharpe_ratio,
                result.calmar_ratio
            ),
            Err(e) => warn!("reference backtest failed: {e}"),
        }
    });

    tokio::select! {
        _ = engine.run(feed) => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}
