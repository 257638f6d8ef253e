//! Position Types
//!
//! Open positions and the per-tick updates that mutate them. Positions are
//! owned exclusively by the position store; everything here is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option sensitivities carried by a single position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Price sensitivity to underlying moves, kept in [0, 1]
    pub delta: f64,
    /// Rate of change of delta, non-negative
    pub gamma: f64,
    /// Time decay per day, typically negative
    pub theta: f64,
    /// Sensitivity to a volatility change, non-negative
    pub vega: f64,
}

impl Greeks {
    /// Create new Greeks.
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64) -> Self {
        Self { delta, gamma, theta, vega }
    }

    /// Apply an additive adjustment, clamping delta to [0, 1] and flooring
    /// gamma and vega at zero.
    pub fn apply(&mut self, d: &GreeksDelta) {
        self.delta = (self.delta + d.delta).clamp(0.0, 1.0);
        self.gamma = (self.gamma + d.gamma).max(0.0);
        self.theta += d.theta;
        self.vega = (self.vega + d.vega).max(0.0);
    }
}

impl Default for Greeks {
    fn default() -> Self {
        Self { delta: 0.0, gamma: 0.0, theta: 0.0, vega: 0.0 }
    }
}

/// Additive greeks adjustment produced by a [`crate::sources::GreeksModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GreeksDelta {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// An open position with market-derived sensitivities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    /// Asset symbol (e.g. "BTC").
    pub asset: String,
    /// Signed quantity; negative for shorts.
    pub size: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    #[serde(flatten)]
    pub greeks: Greeks,
    /// Exchange the position lives on, when known.
    pub exchange: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Create a new position marked at its entry price.
    pub fn new(id: &str, asset: &str, size: f64, entry_price: f64, greeks: Greeks) -> Self {
        Self {
            id: id.to_string(),
            asset: asset.to_string(),
            size,
            entry_price,
            current_price: entry_price,
            unrealized_pnl: 0.0,
            greeks,
            exchange: None,
            last_updated: Utc::now(),
        }
    }

    /// Attach the originating exchange.
    pub fn on_exchange(mut self, exchange: &str) -> Self {
        self.exchange = Some(exchange.to_string());
        self
    }

    /// Absolute notional value at the current mark.
    pub fn notional(&self) -> f64 {
        (self.size * self.current_price).abs()
    }

    /// Re-mark the position and refresh unrealized PnL.
    pub fn mark(&mut self, price: f64, at: DateTime<Utc>) {
        self.current_price = price;
        self.unrealized_pnl = (price - self.entry_price) * self.size;
        self.last_updated = at;
    }
}

/// A single market data tick for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTick {
    pub asset: String,
    pub price: f64,
    pub volume: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl MarketTick {
    /// Create a tick stamped now.
    pub fn new(asset: &str, price: f64) -> Self {
        Self {
            asset: asset.to_string(),
            price,
            volume: None,
            timestamp: Utc::now(),
        }
    }
}
