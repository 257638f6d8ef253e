//! Engine Cycle
//!
//! Drives the live aggregation loop. Each cycle is one logical transaction:
//! apply hedge completions from the previous cycle, ingest pending ticks,
//! refresh greeks, recompute the risk frame, evaluate hedge strategies, then
//! publish a fresh immutable snapshot behind an atomically swapped
//! reference. Readers only ever observe committed snapshots; a failed
//! aggregation leaves the previous snapshot published and skips the cycle.

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    AlertManager, CorrelationAnalyzer, HedgeDecisionEngine, PositionStore, RiskAggregator,
};
use crate::sources::{ExecutionGateway, GreeksModel, MarketDataFeed, VolatilityForecaster};
use crate::types::{
    Alert, AlertLevel, CorrelationMatrix, CrossAssetHedge, MarketTick, Position, RiskMetrics,
    VolForecast,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

/// Retained portfolio-value observations for live drawdown.
const EQUITY_HISTORY_CAP: usize = 10_000;

/// Immutable view of the engine committed at the end of a cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Monotonic cycle counter.
    pub version: u64,
    pub positions: Vec<Position>,
    /// None until the first successful aggregation.
    pub metrics: Option<RiskMetrics>,
    pub cross_hedges: Vec<CrossAssetHedge>,
    pub forecasts: Vec<VolForecast>,
    pub alerts: Vec<Alert>,
    pub last_cycle: DateTime<Utc>,
}

impl EngineSnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            positions: Vec::new(),
            metrics: None,
            cross_hedges: Vec::new(),
            forecasts: Vec::new(),
            alerts: Vec::new(),
            last_cycle: Utc::now(),
        }
    }
}

/// Live risk engine: owns the position store, aggregation pipeline, hedge
/// decision engine, and the published snapshot.
pub struct RiskEngine {
    config: Config,
    store: Arc<PositionStore>,
    aggregator: RiskAggregator,
    analyzer: CorrelationAnalyzer,
    hedges: Arc<HedgeDecisionEngine>,
    alerts: Arc<AlertManager>,
    forecaster: Arc<dyn VolatilityForecaster>,
    greeks_model: Arc<dyn GreeksModel>,
    /// Current correlation basket; replaced by external estimation.
    matrix: Mutex<CorrelationMatrix>,
    /// Basket committed by the previous cycle, for band-crossing alerts.
    previous_matrix: Mutex<Option<CorrelationMatrix>>,
    /// Rolling portfolio-value history backing live drawdown.
    equity_history: Mutex<Vec<f64>>,
    snapshot: RwLock<Arc<EngineSnapshot>>,
    version: AtomicU64,
}

impl RiskEngine {
    pub fn new(
        config: Config,
        gateway: Arc<dyn ExecutionGateway>,
        forecaster: Arc<dyn VolatilityForecaster>,
        greeks_model: Arc<dyn GreeksModel>,
    ) -> Self {
        let alerts = Arc::new(AlertManager::new(&config.alerts));
        let hedges = Arc::new(HedgeDecisionEngine::new(
            gateway,
            Arc::clone(&alerts),
            config.hedge_retry.clone(),
        ));
        let matrix = CorrelationMatrix::identity(config.tracked_assets.clone());

        Self {
            aggregator: RiskAggregator::new(config.var_confidence),
            analyzer: CorrelationAnalyzer::new(config.min_correlation),
            store: Arc::new(PositionStore::new()),
            hedges,
            alerts,
            forecaster,
            greeks_model,
            matrix: Mutex::new(matrix),
            previous_matrix: Mutex::new(None),
            equity_history: Mutex::new(Vec::new()),
            snapshot: RwLock::new(Arc::new(EngineSnapshot::empty())),
            version: AtomicU64::new(0),
            config,
        }
    }

    /// The position store this engine aggregates.
    pub fn store(&self) -> Arc<PositionStore> {
        Arc::clone(&self.store)
    }

    /// The alert manager.
    pub fn alerts(&self) -> Arc<AlertManager> {
        Arc::clone(&self.alerts)
    }

    /// The hedge decision engine, for operator commands.
    pub fn hedges(&self) -> Arc<HedgeDecisionEngine> {
        Arc::clone(&self.hedges)
    }

    /// Replace the correlation basket used by subsequent cycles.
    pub fn set_correlation_matrix(&self, matrix: CorrelationMatrix) -> Result<()> {
        matrix.validate()?;
        *self.matrix.lock().unwrap() = matrix;
        Ok(())
    }

    /// The last committed snapshot.
    pub fn current_snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap())
    }

    /// Run one aggregation cycle over the pending ticks.
    pub fn run_cycle(&self, ticks: &[MarketTick]) {
        // Completions from orders submitted in earlier cycles land first.
        self.hedges.drain_completions(&self.store);

        for tick in ticks {
            self.store.apply_market_tick(tick);
            self.forecaster.observe(&tick.asset, tick.price);
        }

        for position in self.store.snapshot() {
            let delta = self.greeks_model.update(&position);
            if let Err(e) = self.store.apply_greeks_update(&position.id, &delta) {
                warn!("greeks update skipped: {e}");
            }
        }

        let forecasts: Vec<VolForecast> = self
            .config
            .tracked_assets
            .iter()
            .map(|asset| self.forecaster.forecast(asset))
            .collect();
        let volatilities: HashMap<String, f64> = forecasts
            .iter()
            .map(|f| (f.asset.clone(), f.predicted_volatility))
            .collect();

        let positions = self.store.snapshot();
        let history = {
            let mut history = self.equity_history.lock().unwrap();
            let portfolio_value: f64 = positions.iter().map(|p| p.notional()).sum();
            if portfolio_value > 0.0 {
                history.push(portfolio_value);
                if history.len() > EQUITY_HISTORY_CAP {
                    history.remove(0);
                }
            }
            history.clone()
        };

        let matrix = self.matrix.lock().unwrap().clone();
        let metrics =
            match self.aggregator.aggregate(&positions, &matrix, &volatilities, &history) {
                Ok(metrics) => metrics,
                Err(e) => {
                    warn!("aggregation failed, keeping previous snapshot: {e}");
                    self.alerts.raise(Alert::new(
                        AlertLevel::Critical,
                        &format!("Aggregation cycle skipped: {e}"),
                    ));
                    return;
                }
            };

        {
            let mut previous = self.previous_matrix.lock().unwrap();
            if let Some(prev) = previous.as_ref() {
                for alert in self.analyzer.band_transitions(prev, &matrix) {
                    self.alerts.raise(alert);
                }
            }
            *previous = Some(matrix.clone());
        }

        if let Some(limit) = self.config.var_limit {
            if metrics.portfolio_var > limit {
                self.alerts.raise(
                    Alert::new(
                        AlertLevel::Critical,
                        &format!(
                            "Portfolio VaR limit exceeded: {:.0} > {:.0}",
                            metrics.portfolio_var, limit
                        ),
                    )
                    .with_action("reduce exposure"),
                );
            }
        }

        self.hedges.evaluate(&positions);
        let cross_hedges = self.analyzer.analyze(&matrix, &volatilities, &positions);

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let committed = Arc::new(EngineSnapshot {
            version,
            positions,
            metrics: Some(metrics),
            cross_hedges,
            forecasts,
            alerts: self.alerts.recent(),
            last_cycle: Utc::now(),
        });
        *self.snapshot.write().unwrap() = committed;
        debug!("cycle {version} committed");
    }

    /// Drive cycles from a feed at the configured interval, for the life of
    /// the task. Pausing the task loses no store state; cycles resume where
    /// they left off.
    pub async fn run(&self, feed: Arc<dyn MarketDataFeed>) {
        let mut ticker = interval(Duration::from_millis(self.config.aggregation_interval_ms));
        info!(
            "aggregation loop started, interval {}ms",
            self.config.aggregation_interval_ms
        );
        loop {
            ticker.tick().await;
            let ticks = feed.poll();
            self.run_cycle(&ticks);
        }
    }
}
