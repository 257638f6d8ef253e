//! Risk Types
//!
//! Portfolio-level risk snapshots, the cross-asset correlation basket, and
//! volatility forecast records.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Cross-asset correlation matrix over a fixed basket of tracked assets.
///
/// Always square and symmetric with a unit diagonal; construction validates
/// so downstream consumers never have to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Build a validated matrix.
    pub fn new(assets: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        let matrix = Self { assets, values };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Identity matrix (no cross-asset correlation) over a basket.
    pub fn identity(assets: Vec<String>) -> Self {
        let n = assets.len();
        let values = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self { assets, values }
    }

    /// Check squareness, symmetry, unit diagonal, and value bounds.
    pub fn validate(&self) -> Result<()> {
        let n = self.assets.len();
        if self.values.len() != n {
            return Err(EngineError::Aggregation(format!(
                "correlation matrix has {} rows for {} assets",
                self.values.len(),
                n
            )));
        }
        for (i, row) in self.values.iter().enumerate() {
            if row.len() != n {
                return Err(EngineError::Aggregation(format!(
                    "correlation matrix row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if (row[i] - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(EngineError::Aggregation(format!(
                    "correlation matrix diagonal [{i}][{i}] = {}, expected 1.0",
                    row[i]
                )));
            }
            for (j, &v) in row.iter().enumerate() {
                if !(-1.0..=1.0).contains(&v) {
                    return Err(EngineError::Aggregation(format!(
                        "correlation [{i}][{j}] = {v} outside [-1, 1]"
                    )));
                }
                if (v - self.values[j][i]).abs() > SYMMETRY_TOLERANCE {
                    return Err(EngineError::Aggregation(format!(
                        "correlation matrix asymmetric at [{i}][{j}]"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of assets in the basket.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the basket is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Index of an asset symbol in the basket.
    pub fn index_of(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Correlation between two assets by symbol.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i][j])
    }

    /// Mean off-diagonal correlation.
    pub fn average(&self) -> f64 {
        let n = self.assets.len();
        if n < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    sum += self.values[i][j];
                    count += 1;
                }
            }
        }
        sum / count as f64
    }
}

/// Display and alerting bands for correlation strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationBand {
    High,
    Medium,
    Low,
    VeryLow,
    Negligible,
}

impl CorrelationBand {
    /// Classify a correlation value into its band.
    pub fn classify(correlation: f64) -> Self {
        if correlation > 0.8 {
            CorrelationBand::High
        } else if correlation > 0.6 {
            CorrelationBand::Medium
        } else if correlation > 0.4 {
            CorrelationBand::Low
        } else if correlation > 0.2 {
            CorrelationBand::VeryLow
        } else {
            CorrelationBand::Negligible
        }
    }
}

impl std::fmt::Display for CorrelationBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationBand::High => write!(f, "high"),
            CorrelationBand::Medium => write!(f, "medium"),
            CorrelationBand::Low => write!(f, "low"),
            CorrelationBand::VeryLow => write!(f, "very low"),
            CorrelationBand::Negligible => write!(f, "negligible"),
        }
    }
}

/// Portfolio-level risk snapshot, replaced wholesale each aggregation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    /// Parametric value-at-risk in quote currency.
    pub portfolio_var: f64,
    /// Peak-to-trough drawdown fraction over the tracked equity history.
    pub max_drawdown: f64,
    pub total_delta: f64,
    pub total_gamma: f64,
    pub total_theta: f64,
    pub total_vega: f64,
    pub correlation_matrix: CorrelationMatrix,
    pub last_updated: DateTime<Utc>,
}

/// Volatility forecast for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolForecast {
    pub asset: String,
    /// Annualized volatility estimate, as a fraction.
    pub predicted_volatility: f64,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    pub recommendation: HedgeRecommendation,
}

/// What the forecaster suggests doing about upcoming volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeRecommendation {
    HedgeNow,
    Wait,
    ReduceHedge,
}
