//! Correlation & Cross-Hedge Analyzer
//!
//! Derives cross-asset hedge substitutions from the correlation basket and
//! per-asset volatilities, and turns band crossings between consecutive
//! aggregation cycles into alerts. Output ordering is fully deterministic.

use crate::types::{
    Alert, AlertLevel, CorrelationBand, CorrelationMatrix, CrossAssetHedge, Position,
};
use std::collections::HashMap;
use tracing::debug;

/// Cross-asset hedge analyzer.
pub struct CorrelationAnalyzer {
    /// Minimum correlation for a candidate hedge asset.
    min_correlation: f64,
}

impl CorrelationAnalyzer {
    pub fn new(min_correlation: f64) -> Self {
        Self { min_correlation }
    }

    /// Best hedge substitution for each asset with an open position.
    ///
    /// Candidates are scored by `effectiveness = |rho| * min(1, vol_hedge /
    /// vol_primary)`; ties break on higher |rho|, then the lexicographically
    /// smaller hedge symbol. The returned list ranks by effectiveness
    /// descending with primary-symbol ties resolved alphabetically.
    pub fn analyze(
        &self,
        matrix: &CorrelationMatrix,
        volatilities: &HashMap<String, f64>,
        positions: &[Position],
    ) -> Vec<CrossAssetHedge> {
        let mut primaries: Vec<&str> = Vec::new();
        for p in positions {
            if !primaries.contains(&p.asset.as_str()) {
                primaries.push(&p.asset);
            }
        }

        let mut hedges: Vec<CrossAssetHedge> = primaries
            .into_iter()
            .filter_map(|primary| self.best_candidate(primary, matrix, volatilities))
            .collect();

        hedges.sort_by(|a, b| {
            b.effectiveness
                .partial_cmp(&a.effectiveness)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.primary_asset.cmp(&b.primary_asset))
        });
        hedges
    }

    fn best_candidate(
        &self,
        primary: &str,
        matrix: &CorrelationMatrix,
        volatilities: &HashMap<String, f64>,
    ) -> Option<CrossAssetHedge> {
        let vol_primary = match volatilities.get(primary) {
            Some(&v) if v > 0.0 => v,
            _ => {
                debug!("no volatility estimate for {primary}, skipping cross-hedge");
                return None;
            }
        };
        matrix.index_of(primary)?;

        let mut best: Option<CrossAssetHedge> = None;
        for candidate in &matrix.assets {
            if candidate == primary {
                continue;
            }
            let correlation = match matrix.get(primary, candidate) {
                Some(c) if c >= self.min_correlation => c,
                _ => continue,
            };
            let vol_hedge = match volatilities.get(candidate) {
                Some(&v) if v > 0.0 => v,
                _ => continue,
            };

            let effectiveness = correlation.abs() * (vol_hedge / vol_primary).min(1.0);
            let hedge_ratio = (correlation * (vol_primary / vol_hedge)).clamp(0.0, 1.0);
            let entry = CrossAssetHedge {
                primary_asset: primary.to_string(),
                hedge_asset: candidate.clone(),
                correlation,
                hedge_ratio,
                effectiveness,
            };

            best = match best {
                None => Some(entry),
                Some(current) => {
                    if Self::beats(&entry, &current) {
                        Some(entry)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }

    /// Tie-break ordering for candidate selection.
    fn beats(a: &CrossAssetHedge, b: &CrossAssetHedge) -> bool {
        if a.effectiveness != b.effectiveness {
            return a.effectiveness > b.effectiveness;
        }
        if a.correlation.abs() != b.correlation.abs() {
            return a.correlation.abs() > b.correlation.abs();
        }
        a.hedge_asset < b.hedge_asset
    }

    /// Alerts for pairs that crossed the high-correlation band boundary
    /// between two consecutive baskets.
    pub fn band_transitions(
        &self,
        previous: &CorrelationMatrix,
        current: &CorrelationMatrix,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let n = current.assets.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &current.assets[i];
                let b = &current.assets[j];
                let now = current.values[i][j];
                let before = match previous.get(a, b) {
                    Some(v) => v,
                    None => continue,
                };

                let prev_band = CorrelationBand::classify(before);
                let next_band = CorrelationBand::classify(now);
                if prev_band == next_band {
                    continue;
                }

                let pair = format!("{a}-{b}");
                if next_band == CorrelationBand::High {
                    alerts.push(
                        Alert::new(
                            AlertLevel::Warning,
                            &format!(
                                "Correlation spike: {pair} ({before:.2} -> {now:.2})"
                            ),
                        )
                        .with_asset(&pair)
                        .with_action("adjust hedge ratios"),
                    );
                } else if prev_band == CorrelationBand::High {
                    alerts.push(
                        Alert::new(
                            AlertLevel::Info,
                            &format!(
                                "Correlation breakdown: {pair} ({before:.2} -> {now:.2})"
                            ),
                        )
                        .with_asset(&pair)
                        .with_action("hedge opportunity"),
                    );
                }
            }
        }
        alerts
    }
}
