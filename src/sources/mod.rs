//! Collaborator Interfaces
//!
//! External collaborators the engine consumes: market data, hedge order
//! execution, volatility forecasting, greeks recalculation, and historical
//! series. The engine depends only on these traits; deterministic and
//! simulated implementations live in [`simulated`].

pub mod simulated;

pub use simulated::{
    GeometricSeriesSource, ImmediateFillGateway, RandomWalkFeed, RandomWalkGreeks,
    RollingStdForecaster,
};

use crate::error::ExecutionError;
use crate::types::{Fill, GreeksDelta, HedgeOrder, HistoricalSeries, MarketTick, Position, VolForecast};
use std::future::Future;
use std::pin::Pin;

/// Produces per-asset price ticks.
///
/// Implementations buffer internally and survive reconnects; `poll` drains
/// whatever is pending without ever blocking the aggregation cycle.
pub trait MarketDataFeed: Send + Sync {
    fn poll(&self) -> Vec<MarketTick>;
}

/// Submits hedge orders to an exchange.
pub trait ExecutionGateway: Send + Sync {
    /// Submit an order; resolves to a fill or an execution failure.
    fn submit_hedge_order<'a>(
        &'a self,
        order: HedgeOrder,
    ) -> Pin<Box<dyn Future<Output = Result<Fill, ExecutionError>> + Send + 'a>>;
}

/// Pluggable volatility model.
pub trait VolatilityForecaster: Send + Sync {
    fn forecast(&self, asset: &str) -> VolForecast;

    /// Feed an observed price into the model. Models that do not learn
    /// online ignore this.
    fn observe(&self, _asset: &str, _price: f64) {}
}

/// Recomputes a position's greeks for its latest mark.
pub trait GreeksModel: Send + Sync {
    fn update(&self, position: &Position) -> GreeksDelta;
}

/// Supplies historical price series for backtests.
pub trait HistoricalSeriesSource: Send + Sync {
    fn series(&self, asset: &str, points: usize) -> HistoricalSeries;
}
