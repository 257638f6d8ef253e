pub mod alerts;
pub mod backtester;
pub mod correlation;
pub mod engine;
pub mod hedge_engine;
pub mod options_pricer;
pub mod position_store;
pub mod risk;

pub use alerts::AlertManager;
pub use backtester::Backtester;
pub use correlation::CorrelationAnalyzer;
pub use engine::{EngineSnapshot, RiskEngine};
pub use hedge_engine::{HedgeCompletion, HedgeDecisionEngine};
pub use options_pricer::StrategyPricer;
pub use position_store::PositionStore;
pub use risk::{z_score, RiskAggregator};
