//! Hedge Decision Engine
//!
//! Evaluates enabled hedge strategies against the committed risk frame and
//! drives each strategy's trigger lifecycle:
//! `Disabled -> Armed -> Triggered -> Executing -> Armed`, with an operator
//! toggle to Disabled from any state. Order submission runs on a spawned
//! task with exponential backoff; fills and failures land on a completion
//! channel and are applied at the start of the next cycle, so evaluation
//! never blocks the aggregation loop.
//!
//! Strategies targeting the same asset evaluate independently; there is no
//! coordination lock across them, so overlapping hedges are possible.

use crate::config::HedgeRetryConfig;
use crate::error::{EngineError, ExecutionError, Result};
use crate::services::{AlertManager, PositionStore};
use crate::sources::ExecutionGateway;
use crate::types::{
    Alert, AlertLevel, Fill, Greeks, HedgeOrder, HedgeStrategy, HedgeStrategyType, Position,
    StrategyState,
};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Outcome of an asynchronous hedge submission.
#[derive(Debug)]
pub enum HedgeCompletion {
    Filled {
        strategy_id: String,
        fill: Fill,
    },
    Failed {
        strategy_id: String,
        error: ExecutionError,
    },
}

/// Per-strategy trigger state machine over the configured hedge strategies.
pub struct HedgeDecisionEngine {
    strategies: DashMap<String, HedgeStrategy>,
    states: DashMap<String, StrategyState>,
    gateway: Arc<dyn ExecutionGateway>,
    alerts: Arc<AlertManager>,
    retry: HedgeRetryConfig,
    completions_tx: mpsc::UnboundedSender<HedgeCompletion>,
    completions_rx: Mutex<mpsc::UnboundedReceiver<HedgeCompletion>>,
}

impl HedgeDecisionEngine {
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        alerts: Arc<AlertManager>,
        retry: HedgeRetryConfig,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            strategies: DashMap::new(),
            states: DashMap::new(),
            gateway,
            alerts,
            retry,
            completions_tx,
            completions_rx: Mutex::new(completions_rx),
        }
    }

    /// Register or replace a strategy configuration.
    ///
    /// An enabled strategy arms unless it is already mid-lifecycle; a
    /// disabled one parks in Disabled.
    pub fn upsert_strategy(&self, strategy: HedgeStrategy) {
        let state = if strategy.enabled {
            self.states
                .get(&strategy.id)
                .map(|s| *s)
                .filter(|s| *s != StrategyState::Disabled)
                .unwrap_or(StrategyState::Armed)
        } else {
            StrategyState::Disabled
        };
        self.states.insert(strategy.id.clone(), state);
        self.strategies.insert(strategy.id.clone(), strategy);
    }

    /// Operator toggle. Disabling moves to Disabled from any state and
    /// suppresses all further transitions until re-enabled.
    pub fn toggle(&self, id: &str, enabled: bool) -> Result<()> {
        let mut strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("strategy {id}")))?;
        strategy.enabled = enabled;
        let state = if enabled {
            StrategyState::Armed
        } else {
            StrategyState::Disabled
        };
        self.states.insert(id.to_string(), state);
        info!("strategy {id} {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Operator threshold adjustment, clamped to [0.1, 1.0].
    pub fn set_threshold(&self, id: &str, threshold: f64) -> Result<()> {
        let mut strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("strategy {id}")))?;
        strategy.threshold = threshold.clamp(0.1, 1.0);
        Ok(())
    }

    /// Configured strategies, sorted by id.
    pub fn strategies(&self) -> Vec<HedgeStrategy> {
        let mut all: Vec<HedgeStrategy> =
            self.strategies.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Current lifecycle state of a strategy.
    pub fn state(&self, id: &str) -> Option<StrategyState> {
        self.states.get(id).map(|s| *s)
    }

    /// Apply fills and failures recorded since the previous cycle.
    ///
    /// Fills open the offsetting position in the store and re-arm the
    /// strategy; exhausted submissions surface a critical alert and re-arm
    /// without executing. A strategy disabled mid-flight keeps its fill but
    /// stays Disabled.
    pub fn drain_completions(&self, store: &PositionStore) {
        let mut rx = self.completions_rx.lock().unwrap();
        while let Ok(completion) = rx.try_recv() {
            match completion {
                HedgeCompletion::Filled { strategy_id, fill } => {
                    let position_id =
                        format!("hedge-{}-{}", strategy_id, uuid::Uuid::new_v4());
                    let mut position = Position::new(
                        &position_id,
                        &fill.order.asset,
                        fill.order.size,
                        fill.fill_price,
                        Greeks::default(),
                    );
                    position.exchange = Some(fill.order.exchange.clone());
                    store.open(position);

                    self.alerts.raise(
                        Alert::new(
                            AlertLevel::Info,
                            &format!(
                                "Hedge execution completed for {} position",
                                fill.order.asset
                            ),
                        )
                        .with_asset(&fill.order.asset)
                        .with_action("hedge"),
                    );
                    self.rearm_if_executing(&strategy_id);
                }
                HedgeCompletion::Failed { strategy_id, error } => {
                    let asset = self
                        .strategies
                        .get(&strategy_id)
                        .map(|s| s.asset.clone())
                        .unwrap_or_default();
                    self.alerts.raise(
                        Alert::new(
                            AlertLevel::Critical,
                            &format!("Hedge execution failed for {asset}: {error}"),
                        )
                        .with_asset(&asset)
                        .with_action("hedge"),
                    );
                    self.rearm_if_executing(&strategy_id);
                }
            }
        }
    }

    fn rearm_if_executing(&self, strategy_id: &str) {
        if let Some(mut state) = self.states.get_mut(strategy_id) {
            if *state == StrategyState::Executing {
                *state = StrategyState::Armed;
            }
        }
    }

    /// Evaluate every armed strategy once against the committed frame.
    ///
    /// Each strategy is independent; concurrent breaches on the same asset
    /// each fire their own hedge.
    pub fn evaluate(&self, positions: &[Position]) {
        for strategy in self.strategies() {
            if !strategy.enabled || self.state(&strategy.id) != Some(StrategyState::Armed) {
                continue;
            }

            let book: Vec<&Position> =
                positions.iter().filter(|p| p.asset == strategy.asset).collect();
            let measure = Self::risk_measure(strategy.kind, &book);
            if measure <= strategy.threshold {
                debug!(
                    "strategy {} measure {measure:.3} within threshold {:.2}",
                    strategy.id, strategy.threshold
                );
                continue;
            }

            self.states
                .insert(strategy.id.clone(), StrategyState::Triggered);
            self.alerts.raise(
                Alert::new(
                    AlertLevel::Warning,
                    &format!(
                        "{} exposure exceeded threshold for {} position",
                        strategy.kind, strategy.asset
                    ),
                )
                .with_asset(&strategy.asset)
                .with_action("hedge"),
            );
            info!(
                "strategy {} triggered: measure {measure:.3} > threshold {:.2}",
                strategy.id, strategy.threshold
            );

            let size = Self::hedge_size(strategy.kind, &book);
            self.execute(strategy, size);
        }
    }

    /// Risk measure in [0, 1] compared against the strategy threshold.
    fn risk_measure(kind: HedgeStrategyType, book: &[&Position]) -> f64 {
        if book.is_empty() {
            return 0.0;
        }
        let notional: f64 = book.iter().map(|p| p.notional()).sum();

        let mean_delta = || {
            book.iter().map(|p| p.greeks.delta.abs()).sum::<f64>() / book.len() as f64
        };
        let downside = || {
            if notional <= 0.0 {
                return 0.0;
            }
            book.iter().map(|p| (-p.unrealized_pnl).max(0.0)).sum::<f64>() / notional
        };
        let upside = || {
            if notional <= 0.0 {
                return 0.0;
            }
            book.iter().map(|p| p.unrealized_pnl.max(0.0)).sum::<f64>() / notional
        };

        match kind {
            HedgeStrategyType::DeltaNeutral => mean_delta(),
            HedgeStrategyType::ProtectivePut => downside(),
            HedgeStrategyType::CoveredCall => upside(),
            HedgeStrategyType::Collar => downside().max(upside()),
        }
    }

    /// Order quantity for a triggered strategy.
    ///
    /// Delta-neutral offsets the book's delta-weighted exposure with an
    /// opposing linear position; options structures cover the gross book
    /// size.
    fn hedge_size(kind: HedgeStrategyType, book: &[&Position]) -> f64 {
        match kind {
            HedgeStrategyType::DeltaNeutral => {
                -book.iter().map(|p| p.size * p.greeks.delta).sum::<f64>()
            }
            _ => book.iter().map(|p| p.size.abs()).sum(),
        }
    }

    /// Move to Executing and submit on a spawned task with backoff.
    fn execute(&self, strategy: HedgeStrategy, size: f64) {
        self.states
            .insert(strategy.id.clone(), StrategyState::Executing);
        self.alerts.raise(
            Alert::new(
                AlertLevel::Info,
                &format!(
                    "Hedge order pending for {}: {:.4} via {}",
                    strategy.asset, size, strategy.instrument
                ),
            )
            .with_asset(&strategy.asset)
            .with_action("hedge"),
        );

        let order = HedgeOrder {
            strategy_id: strategy.id.clone(),
            asset: strategy.asset.clone(),
            instrument: strategy.instrument,
            size,
            exchange: strategy.exchange.clone(),
        };
        let gateway = Arc::clone(&self.gateway);
        let tx = self.completions_tx.clone();
        let retry = self.retry.clone();

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match gateway.submit_hedge_order(order.clone()).await {
                    Ok(fill) => {
                        let _ = tx.send(HedgeCompletion::Filled {
                            strategy_id: order.strategy_id.clone(),
                            fill,
                        });
                        return;
                    }
                    Err(e) => {
                        attempt += 1;
                        if attempt >= retry.max_attempts {
                            let _ = tx.send(HedgeCompletion::Failed {
                                strategy_id: order.strategy_id.clone(),
                                error: e,
                            });
                            return;
                        }
                        let backoff = retry.backoff_base_ms * 2u64.pow(attempt - 1);
                        warn!(
                            "hedge submit attempt {attempt} for {} failed: {e}, retrying in {backoff}ms",
                            order.asset
                        );
                        sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        });
    }
}
