//! Backtest Types
//!
//! Historical series inputs and the immutable result records produced by the
//! backtest and attribution engine.

use crate::types::HedgeStrategyType;
use serde::{Deserialize, Serialize};

/// One historical observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub price: f64,
}

/// A price series for one asset, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub asset: String,
    pub points: Vec<HistoricalPoint>,
}

impl HistoricalSeries {
    pub fn new(asset: &str, points: Vec<HistoricalPoint>) -> Self {
        Self { asset: asset.to_string(), points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Immutable summary of one backtest run, keyed by (strategy, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub strategy: HedgeStrategyType,
    pub period: String,
    /// Total return as a fraction of initial capital.
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Peak-to-trough drawdown fraction on the equity curve.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Mean hedge cost per trade, as a fraction of initial capital.
    pub avg_hedge_cost: f64,
    pub total_trades: u32,
    pub profit_factor: f64,
    pub calmar_ratio: f64,
}

/// Decomposition of realized returns into alpha, hedging, and cost
/// components. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAttribution {
    pub period: String,
    pub total_return: f64,
    pub hedging_return: f64,
    pub alpha_return: f64,
    pub hedging_costs: f64,
    /// Variance reduction achieved by hedging, in [0, 1].
    pub effectiveness: f64,
    pub cost_benefit_ratio: f64,
    pub risk_adjusted_return: f64,
}
