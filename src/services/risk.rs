//! Risk Aggregator
//!
//! Reduces the position set into a portfolio-level [`RiskMetrics`] frame:
//! linear greek sums, parametric VaR from the correlation basket and
//! per-asset volatility estimates, and rolling peak-to-trough drawdown.
//! Aggregation is a pure function of its inputs and safe to repeat.

use crate::error::Result;
use crate::types::{CorrelationMatrix, Position, RiskMetrics};
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

/// Map a confidence level to its one-sided normal quantile.
pub fn z_score(confidence: f64) -> f64 {
    if confidence >= 0.99 {
        2.326
    } else if confidence >= 0.975 {
        1.960
    } else if confidence >= 0.95 {
        1.645
    } else {
        1.282
    }
}

/// Stateless portfolio risk aggregator.
pub struct RiskAggregator {
    z: f64,
}

impl RiskAggregator {
    /// Create an aggregator for a VaR confidence level.
    pub fn new(confidence: f64) -> Self {
        Self { z: z_score(confidence) }
    }

    /// Aggregator at the default 95% confidence.
    pub fn default_confidence() -> Self {
        Self::new(0.95)
    }

    /// Reduce the current positions into a fresh risk frame.
    ///
    /// Greeks are summed linearly (first-order risk view). Portfolio
    /// volatility is the notional-weighted quadratic form over the
    /// correlation basket; VaR is `z * sigma * portfolio_value`. Drawdown
    /// comes from the caller-maintained equity history.
    pub fn aggregate(
        &self,
        positions: &[Position],
        matrix: &CorrelationMatrix,
        volatilities: &HashMap<String, f64>,
        equity_history: &[f64],
    ) -> Result<RiskMetrics> {
        matrix.validate()?;

        let total_delta: f64 = positions.iter().map(|p| p.greeks.delta).sum();
        let total_gamma: f64 = positions.iter().map(|p| p.greeks.gamma).sum();
        let total_theta: f64 = positions.iter().map(|p| p.greeks.theta).sum();
        let total_vega: f64 = positions.iter().map(|p| p.greeks.vega).sum();

        let portfolio_value: f64 = positions.iter().map(|p| p.notional()).sum();
        let portfolio_vol = self.portfolio_volatility(positions, matrix, volatilities, portfolio_value);
        let portfolio_var = self.z * portfolio_vol * portfolio_value;

        Ok(RiskMetrics {
            portfolio_var,
            max_drawdown: Self::update_drawdown(equity_history),
            total_delta,
            total_gamma,
            total_theta,
            total_vega,
            correlation_matrix: matrix.clone(),
            last_updated: Utc::now(),
        })
    }

    /// Notional-weighted portfolio volatility from the correlation basket.
    fn portfolio_volatility(
        &self,
        positions: &[Position],
        matrix: &CorrelationMatrix,
        volatilities: &HashMap<String, f64>,
        portfolio_value: f64,
    ) -> f64 {
        if portfolio_value <= 0.0 {
            return 0.0;
        }

        // Per-asset notional weights over the basket.
        let mut weights: HashMap<&str, f64> = HashMap::new();
        for p in positions {
            if matrix.index_of(&p.asset).is_none() {
                debug!("{} not in correlation basket, excluded from VaR", p.asset);
                continue;
            }
            *weights.entry(p.asset.as_str()).or_insert(0.0) += p.notional() / portfolio_value;
        }

        // Walk the basket in its declared order so summation is
        // deterministic across calls.
        let mut variance = 0.0;
        for (i, asset_a) in matrix.assets.iter().enumerate() {
            let w_a = match weights.get(asset_a.as_str()) {
                Some(&w) => w,
                None => continue,
            };
            let vol_a = volatilities.get(asset_a).copied().unwrap_or(0.0);
            for (j, asset_b) in matrix.assets.iter().enumerate() {
                let w_b = match weights.get(asset_b.as_str()) {
                    Some(&w) => w,
                    None => continue,
                };
                let vol_b = volatilities.get(asset_b).copied().unwrap_or(0.0);
                variance += w_a * w_b * vol_a * vol_b * matrix.values[i][j];
            }
        }
        variance.max(0.0).sqrt()
    }

    /// Peak-to-trough drawdown fraction over an equity history.
    pub fn update_drawdown(history: &[f64]) -> f64 {
        let mut peak = f64::MIN;
        let mut max_drawdown = 0.0f64;
        for &equity in history {
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                let drawdown = (peak - equity) / peak;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        max_drawdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_score_quantiles() {
        assert_eq!(z_score(0.95), 1.645);
        assert_eq!(z_score(0.99), 2.326);
        assert_eq!(z_score(0.90), 1.282);
    }

    #[test]
    fn test_drawdown_high_water_mark() {
        let history = [100.0, 120.0, 90.0, 110.0, 80.0];
        let dd = RiskAggregator::update_drawdown(&history);
        // Peak 120 to trough 80.
        assert!((dd - (120.0 - 80.0) / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_monotonic_rise_is_zero() {
        let history = [100.0, 110.0, 125.0];
        assert_eq!(RiskAggregator::update_drawdown(&history), 0.0);
    }
}
