//! Simulated Collaborators
//!
//! Stand-in implementations used by the local daemon and tests: a bounded
//! random-walk feed and greeks model, an immediate-fill gateway, a rolling
//! standard-deviation volatility forecaster, and a deterministic series
//! source for reproducible backtests.

use crate::error::ExecutionError;
use crate::sources::{
    ExecutionGateway, GreeksModel, HistoricalSeriesSource, MarketDataFeed, VolatilityForecaster,
};
use crate::types::{
    Fill, GreeksDelta, HedgeOrder, HedgeRecommendation, HistoricalPoint, HistoricalSeries,
    MarketTick, Position, VolForecast,
};
use chrono::Utc;
use dashmap::DashMap;
use rand::prelude::*;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};

/// Random-walk price feed over a fixed asset set.
pub struct RandomWalkFeed {
    prices: DashMap<String, f64>,
    /// Maximum per-poll move as a fraction of the current price.
    step_pct: f64,
}

impl RandomWalkFeed {
    /// Create a feed seeded with starting prices.
    pub fn new(seeds: &[(&str, f64)], step_pct: f64) -> Self {
        let prices = DashMap::new();
        for (asset, price) in seeds {
            prices.insert(asset.to_string(), *price);
        }
        Self { prices, step_pct }
    }

    /// Current mark for an asset.
    pub fn price(&self, asset: &str) -> Option<f64> {
        self.prices.get(asset).map(|p| *p)
    }
}

impl MarketDataFeed for RandomWalkFeed {
    fn poll(&self) -> Vec<MarketTick> {
        let mut rng = rand::thread_rng();
        let mut ticks = Vec::with_capacity(self.prices.len());
        for mut entry in self.prices.iter_mut() {
            let step = *entry * self.step_pct * rng.gen_range(-1.0..1.0);
            *entry = (*entry + step).max(0.01);
            ticks.push(MarketTick::new(entry.key(), *entry));
        }
        ticks.sort_by(|a, b| a.asset.cmp(&b.asset));
        ticks
    }
}

/// Bounded random-walk greeks model.
///
/// Step magnitudes mirror typical per-tick drift for crypto options books; a
/// production deployment swaps this for a repricing model behind the same
/// trait.
pub struct RandomWalkGreeks;

impl GreeksModel for RandomWalkGreeks {
    fn update(&self, _position: &Position) -> GreeksDelta {
        let mut rng = rand::thread_rng();
        GreeksDelta {
            delta: rng.gen_range(-0.05..0.05),
            gamma: rng.gen_range(-0.0025..0.0025),
            theta: rng.gen_range(-5.0..5.0),
            vega: rng.gen_range(-10.0..10.0),
        }
    }
}

/// Gateway that fills orders at the last known mark.
///
/// `fail_times` forces the next N submissions to fail, for exercising the
/// retry path.
pub struct ImmediateFillGateway {
    marks: DashMap<String, f64>,
    fail_times: AtomicU32,
}

impl ImmediateFillGateway {
    pub fn new() -> Self {
        Self {
            marks: DashMap::new(),
            fail_times: AtomicU32::new(0),
        }
    }

    /// Set the fill price for an asset.
    pub fn set_mark(&self, asset: &str, price: f64) {
        self.marks.insert(asset.to_string(), price);
    }

    /// Make the next `n` submissions fail with a connectivity error.
    pub fn fail_next(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }
}

impl Default for ImmediateFillGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionGateway for ImmediateFillGateway {
    fn submit_hedge_order<'a>(
        &'a self,
        order: HedgeOrder,
    ) -> Pin<Box<dyn Future<Output = Result<Fill, ExecutionError>> + Send + 'a>> {
        Box::pin(async move {
            let remaining = self.fail_times.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_times.store(remaining - 1, Ordering::SeqCst);
                return Err(ExecutionError::Connectivity("simulated outage".to_string()));
            }
            let price = self
                .marks
                .get(&order.asset)
                .map(|p| *p)
                .ok_or_else(|| ExecutionError::Rejected(format!("no mark for {}", order.asset)))?;
            Ok(Fill {
                order,
                fill_price: price,
                filled_at: Utc::now(),
            })
        })
    }
}

/// Volatility forecaster from a rolling window of recorded prices.
///
/// Annualizes the sample standard deviation of simple returns as if the
/// recorded points were daily closes.
pub struct RollingStdForecaster {
    history: DashMap<String, VecDeque<f64>>,
    window: usize,
}

impl RollingStdForecaster {
    pub fn new(window: usize) -> Self {
        Self {
            history: DashMap::new(),
            window,
        }
    }
}

impl VolatilityForecaster for RollingStdForecaster {
    fn observe(&self, asset: &str, price: f64) {
        let mut entry = self.history.entry(asset.to_string()).or_default();
        entry.push_back(price);
        while entry.len() > self.window {
            entry.pop_front();
        }
    }

    fn forecast(&self, asset: &str) -> VolForecast {
        let (vol, confidence) = match self.history.get(asset) {
            Some(prices) if prices.len() >= 2 => {
                let returns: Vec<f64> = prices
                    .iter()
                    .zip(prices.iter().skip(1))
                    .map(|(a, b)| b / a - 1.0)
                    .collect();
                let mean = returns.iter().sum::<f64>() / returns.len() as f64;
                let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                    / returns.len() as f64;
                let annualized = variance.sqrt() * (365.0f64).sqrt();
                let confidence = (prices.len() as f64 / self.window as f64).min(1.0);
                (annualized, confidence)
            }
            _ => (0.5, 0.0),
        };

        let recommendation = if vol > 0.6 {
            HedgeRecommendation::HedgeNow
        } else if vol < 0.3 {
            HedgeRecommendation::ReduceHedge
        } else {
            HedgeRecommendation::Wait
        };

        VolForecast {
            asset: asset.to_string(),
            predicted_volatility: vol,
            confidence,
            recommendation,
        }
    }
}

/// Deterministic oscillating price series for reproducible backtests.
pub struct GeometricSeriesSource {
    base_price: f64,
    /// Per-step drift as a fraction of the base price.
    drift: f64,
    /// Oscillation amplitude as a fraction of the base price.
    amplitude: f64,
    start_timestamp: i64,
    step_ms: i64,
}

impl GeometricSeriesSource {
    pub fn new(base_price: f64, drift: f64, amplitude: f64) -> Self {
        Self {
            base_price,
            drift,
            amplitude,
            start_timestamp: 1_700_000_000_000,
            step_ms: 86_400_000,
        }
    }
}

impl HistoricalSeriesSource for GeometricSeriesSource {
    fn series(&self, asset: &str, points: usize) -> HistoricalSeries {
        let series = (0..points)
            .map(|i| {
                let t = i as f64;
                let price = self.base_price
                    * (1.0 + self.drift * t + self.amplitude * (t * 0.35).sin());
                HistoricalPoint {
                    timestamp: self.start_timestamp + i as i64 * self.step_ms,
                    price: price.max(0.01),
                }
            })
            .collect();
        HistoricalSeries::new(asset, series)
    }
}
