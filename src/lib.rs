//! Aegis - Real-time portfolio risk aggregation and hedging decision engine
//!
//! Ingests per-asset market ticks into a position store, aggregates the book
//! into portfolio-level risk metrics (greeks, parametric VaR, correlation
//! structure), evaluates configured hedge strategies against thresholds,
//! prices multi-leg options structures, and replays historical series for
//! backtesting and performance attribution. Presentation, persistence, and
//! exchange connectivity are external consumers of the snapshots published
//! here.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::Config;
pub use error::{EngineError, ExecutionError, Result};

// Re-export commonly used types
pub use services::{
    AlertManager, Backtester, CorrelationAnalyzer, EngineSnapshot, HedgeDecisionEngine,
    PositionStore, RiskAggregator, RiskEngine, StrategyPricer,
};
pub use types::*;
