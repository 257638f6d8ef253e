//! Hedging Types
//!
//! Operator-configured hedge strategies, their trigger lifecycle, and the
//! orders and fills exchanged with the execution gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hedge strategy families supported by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HedgeStrategyType {
    /// Offset directional exposure with an opposing linear position
    DeltaNeutral,
    /// Buy downside protection when losses mount
    ProtectivePut,
    /// Sell upside against an appreciating book
    CoveredCall,
    /// Protective put plus covered call, both sides capped
    Collar,
}

impl std::fmt::Display for HedgeStrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HedgeStrategyType::DeltaNeutral => write!(f, "delta-neutral"),
            HedgeStrategyType::ProtectivePut => write!(f, "protective-put"),
            HedgeStrategyType::CoveredCall => write!(f, "covered-call"),
            HedgeStrategyType::Collar => write!(f, "collar"),
        }
    }
}

/// Instrument used to implement a hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeInstrument {
    Perpetual,
    Options,
}

impl std::fmt::Display for HedgeInstrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HedgeInstrument::Perpetual => write!(f, "perpetual"),
            HedgeInstrument::Options => write!(f, "options"),
        }
    }
}

/// Operator-configured hedge strategy.
///
/// Created by configuration, toggled and tuned by operator action, never
/// deleted automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgeStrategy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HedgeStrategyType,
    /// Asset whose book this strategy watches.
    pub asset: String,
    pub enabled: bool,
    /// Trigger threshold, kept in [0.1, 1.0].
    pub threshold: f64,
    pub instrument: HedgeInstrument,
    pub exchange: String,
}

impl HedgeStrategy {
    /// Create an enabled strategy.
    pub fn new(
        id: &str,
        name: &str,
        kind: HedgeStrategyType,
        asset: &str,
        threshold: f64,
        instrument: HedgeInstrument,
        exchange: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            asset: asset.to_string(),
            enabled: true,
            threshold: threshold.clamp(0.1, 1.0),
            instrument,
            exchange: exchange.to_string(),
        }
    }
}

/// Lifecycle state of a strategy's trigger loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyState {
    /// Operator-disabled; no evaluation happens
    Disabled,
    /// Watching the risk measure, ready to trigger
    Armed,
    /// Threshold breached this cycle
    Triggered,
    /// Hedge order in flight at the gateway
    Executing,
}

/// A hedge order handed to the execution gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgeOrder {
    pub strategy_id: String,
    pub asset: String,
    pub instrument: HedgeInstrument,
    /// Signed quantity; negative offsets a long book.
    pub size: f64,
    pub exchange: String,
}

/// Confirmed fill for a hedge order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub order: HedgeOrder,
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}

/// Correlation-derived hedge substitution for one primary asset.
///
/// Recomputed each analysis cycle from the correlation matrix and asset
/// volatilities; never persisted across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossAssetHedge {
    pub primary_asset: String,
    pub hedge_asset: String,
    pub correlation: f64,
    /// Fraction of the hedge asset needed per unit of primary exposure,
    /// clipped to [0, 1].
    pub hedge_ratio: f64,
    /// Expected risk-reduction quality in [0, 1].
    pub effectiveness: f64,
}
