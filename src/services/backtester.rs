//! Backtest & Attribution Engine
//!
//! Replays a historical price series through the hedge trigger rule for one
//! strategy family, accumulating trades and performance statistics, and
//! decomposes realized returns into alpha, hedging, and cost components.
//! Replay is fully deterministic for a given series and parameters, and
//! supports cooperative cancellation between steps.

use crate::error::{EngineError, Result};
use crate::services::RiskAggregator;
use crate::types::{
    BacktestResult, HedgeStrategyType, HistoricalPoint, HistoricalSeries, PerformanceAttribution,
};
use chrono::DateTime;
use dashmap::DashMap;
use tracing::{debug, info};

/// Daily observations assumed for annualization.
const PERIODS_PER_YEAR: f64 = 365.0;
/// Rolling window for the replayed risk measure.
const LOOKBACK: usize = 14;
/// Hedge open/close cost as a fraction of hedged notional.
const HEDGE_COST_RATE: f64 = 0.001;
/// Deviation scale mapping daily moves onto the [0, 1] threshold range.
const MEASURE_SCALE: f64 = 25.0;
/// A hedge releases once the measure falls below threshold * this.
const RELEASE_FRACTION: f64 = 0.8;

/// An open hedge during replay.
struct OpenHedge {
    entry_price: f64,
    size: f64,
    cost_paid: f64,
}

/// Deterministic strategy backtester.
pub struct Backtester {
    /// Running backtests (backtest_id -> cancel flag).
    running: DashMap<String, bool>,
}

impl Backtester {
    pub fn new() -> Self {
        Self {
            running: DashMap::new(),
        }
    }

    /// Request cancellation of a running backtest.
    pub fn cancel(&self, backtest_id: &str) -> bool {
        if let Some(mut entry) = self.running.get_mut(backtest_id) {
            *entry = true;
            true
        } else {
            false
        }
    }

    fn is_cancelled(&self, backtest_id: &str) -> bool {
        self.running.get(backtest_id).map(|v| *v).unwrap_or(false)
    }

    /// Replay a series against one strategy family.
    ///
    /// The replay holds a long book sized to the initial capital and opens a
    /// full offsetting hedge whenever the strategy's rolling risk measure
    /// breaches `threshold`, releasing it with hysteresis. Each hedge
    /// open/close pays [`HEDGE_COST_RATE`] of notional.
    pub fn run_backtest(
        &self,
        backtest_id: &str,
        kind: HedgeStrategyType,
        series: &HistoricalSeries,
        initial_capital: f64,
        threshold: f64,
    ) -> Result<BacktestResult> {
        if series.len() < 2 {
            return Err(EngineError::InvalidStrategy(
                "historical series needs at least two points".to_string(),
            ));
        }
        if initial_capital <= 0.0 {
            return Err(EngineError::InvalidStrategy(
                "initial capital must be positive".to_string(),
            ));
        }

        self.running.insert(backtest_id.to_string(), false);
        let result = self.replay(backtest_id, kind, series, initial_capital, threshold);
        self.running.remove(backtest_id);

        if let Ok(ref r) = result {
            info!(
                "backtest {backtest_id} complete: {} trades, {:.2}% return",
                r.total_trades,
                r.total_return * 100.0
            );
        }
        result
    }

    fn replay(
        &self,
        backtest_id: &str,
        kind: HedgeStrategyType,
        series: &HistoricalSeries,
        initial_capital: f64,
        threshold: f64,
    ) -> Result<BacktestResult> {
        let points = &series.points;
        let units = initial_capital / points[0].price;

        let mut equity = initial_capital;
        let mut equity_curve = vec![equity];
        let mut step_returns: Vec<f64> = Vec::with_capacity(points.len());
        let mut hedge: Option<OpenHedge> = None;

        let mut wins = 0u32;
        let mut losses = 0u32;
        let mut gross_win = 0.0;
        let mut gross_loss = 0.0;
        let mut total_costs = 0.0;

        let close_hedge = |open: OpenHedge,
                               price: f64,
                               equity: &mut f64,
                               total_costs: &mut f64,
                               wins: &mut u32,
                               losses: &mut u32,
                               gross_win: &mut f64,
                               gross_loss: &mut f64| {
            let exit_cost = HEDGE_COST_RATE * open.size * price;
            *equity -= exit_cost;
            *total_costs += exit_cost;
            let pnl = open.size * (open.entry_price - price) - open.cost_paid - exit_cost;
            if pnl > 0.0 {
                *wins += 1;
                *gross_win += pnl;
            } else {
                *losses += 1;
                *gross_loss += pnl.abs();
            }
            debug!("hedge closed at {price:.2}, pnl {pnl:.2}");
        };

        for i in 1..points.len() {
            if self.is_cancelled(backtest_id) {
                return Err(EngineError::Cancelled);
            }

            let prev = points[i - 1].price;
            let price = points[i].price;
            let prev_equity = equity;

            equity += units * (price - prev);
            if let Some(ref open) = hedge {
                equity -= open.size * (price - prev);
            }

            let measure = Self::risk_measure(kind, points, i);
            if hedge.is_none() && measure > threshold {
                let size = units;
                let cost = HEDGE_COST_RATE * size * price;
                equity -= cost;
                total_costs += cost;
                hedge = Some(OpenHedge {
                    entry_price: price,
                    size,
                    cost_paid: cost,
                });
                debug!("hedge opened at {price:.2}, measure {measure:.3}");
            } else if measure < threshold * RELEASE_FRACTION {
                if let Some(open) = hedge.take() {
                    close_hedge(
                        open,
                        price,
                        &mut equity,
                        &mut total_costs,
                        &mut wins,
                        &mut losses,
                        &mut gross_win,
                        &mut gross_loss,
                    );
                }
            }

            equity_curve.push(equity);
            if prev_equity > 0.0 {
                step_returns.push(equity / prev_equity - 1.0);
            }
        }

        if let Some(open) = hedge.take() {
            close_hedge(
                open,
                points[points.len() - 1].price,
                &mut equity,
                &mut total_costs,
                &mut wins,
                &mut losses,
                &mut gross_win,
                &mut gross_loss,
            );
            *equity_curve.last_mut().unwrap() = equity;
        }

        let total_trades = wins + losses;
        let total_return = equity / initial_capital - 1.0;
        let duration_days =
            (points[points.len() - 1].timestamp - points[0].timestamp) as f64 / 86_400_000.0;
        let annualized_return = if duration_days > 0.0 {
            (equity / initial_capital).powf(PERIODS_PER_YEAR / duration_days) - 1.0
        } else {
            0.0
        };

        let mean = mean(&step_returns);
        let vol = std_dev(&step_returns, mean);
        let sharpe_ratio = if vol > 0.0 {
            mean / vol * PERIODS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let max_drawdown = RiskAggregator::update_drawdown(&equity_curve);
        let calmar_ratio = if max_drawdown > 0.0 {
            annualized_return / max_drawdown
        } else {
            0.0
        };
        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_hedge_cost = if total_trades > 0 {
            total_costs / total_trades as f64 / initial_capital
        } else {
            0.0
        };

        Ok(BacktestResult {
            strategy: kind,
            period: Self::period_label(points[0].timestamp, points[points.len() - 1].timestamp),
            total_return,
            sharpe_ratio,
            max_drawdown,
            win_rate,
            avg_hedge_cost,
            total_trades,
            profit_factor,
            calmar_ratio,
        })
    }

    /// Rolling risk measure at step `i`, mapped onto [0, 1].
    ///
    /// Delta-neutral watches total deviation, protective-put only downside
    /// moves, covered-call only upside moves, collar both sides.
    fn risk_measure(kind: HedgeStrategyType, points: &[HistoricalPoint], i: usize) -> f64 {
        let start = i.saturating_sub(LOOKBACK).max(1);
        let returns: Vec<f64> = (start..=i)
            .map(|j| points[j].price / points[j - 1].price - 1.0)
            .collect();
        if returns.is_empty() {
            return 0.0;
        }

        let rms = |filter: fn(f64) -> f64| {
            let sum: f64 = returns.iter().map(|&r| filter(r).powi(2)).sum();
            (sum / returns.len() as f64).sqrt()
        };

        let deviation = match kind {
            HedgeStrategyType::DeltaNeutral => rms(|r| r),
            HedgeStrategyType::ProtectivePut => rms(|r| r.min(0.0)),
            HedgeStrategyType::CoveredCall => rms(|r| r.max(0.0)),
            HedgeStrategyType::Collar => rms(|r| r.min(0.0)).max(rms(|r| r.max(0.0))),
        };
        (deviation * MEASURE_SCALE).min(1.0)
    }

    fn period_label(start_ms: i64, end_ms: i64) -> String {
        let start = DateTime::from_timestamp_millis(start_ms)
            .map(|d| d.date_naive().to_string())
            .unwrap_or_else(|| start_ms.to_string());
        let end = DateTime::from_timestamp_millis(end_ms)
            .map(|d| d.date_naive().to_string())
            .unwrap_or_else(|| end_ms.to_string());
        format!("{start} to {end}")
    }

    /// Decompose realized returns into alpha, hedging, and cost components.
    ///
    /// Effectiveness is the variance reduction achieved by hedging;
    /// cost/benefit relates the hedging return magnitude to what it cost.
    pub fn attribute(
        period: &str,
        total_return: f64,
        hedging_return: f64,
        hedging_costs: f64,
        hedged_returns: &[f64],
        unhedged_returns: &[f64],
    ) -> PerformanceAttribution {
        let alpha_return = total_return - hedging_return;

        let var_hedged = variance(hedged_returns);
        let var_unhedged = variance(unhedged_returns);
        let effectiveness = if var_unhedged > 0.0 {
            (1.0 - var_hedged / var_unhedged).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let cost_benefit_ratio = if hedging_costs > 0.0 {
            hedging_return.abs() / hedging_costs
        } else {
            0.0
        };

        let hedged_vol = var_hedged.sqrt() * PERIODS_PER_YEAR.sqrt();
        let risk_adjusted_return = if hedged_vol > 0.0 {
            total_return / hedged_vol
        } else {
            0.0
        };

        PerformanceAttribution {
            period: period.to_string(),
            total_return,
            hedging_return,
            alpha_return,
            hedging_costs,
            effectiveness,
            cost_benefit_ratio,
            risk_adjusted_return,
        }
    }
}

impl Default for Backtester {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
