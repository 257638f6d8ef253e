//! Compliance Report Types
//!
//! Strongly-typed report payloads for external compliance consumers. Each
//! report type carries its own fields; generation is a pure function over
//! committed snapshots, and submission/storage stay external.

use crate::types::{Position, RiskMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report lifecycle status as tracked by the external submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
}

/// Typed report payloads, tagged by report type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportData {
    PositionReport {
        total_positions: usize,
        total_value: f64,
        leverage: f64,
    },
    VarReport {
        portfolio_var: f64,
        confidence: f64,
        time_horizon: String,
    },
    RiskDisclosure {
        risk_level: String,
        max_loss: f64,
        hedge_ratio: f64,
    },
    StressTest {
        scenarios: u32,
        worst_case: f64,
        average_case: f64,
    },
}

impl ReportData {
    /// Position summary over a committed snapshot.
    pub fn position_report(positions: &[Position], leverage: f64) -> Self {
        ReportData::PositionReport {
            total_positions: positions.len(),
            total_value: positions.iter().map(|p| p.notional()).sum(),
            leverage,
        }
    }

    /// VaR disclosure from the committed risk frame.
    pub fn var_report(metrics: &RiskMetrics, confidence: f64, time_horizon: &str) -> Self {
        ReportData::VarReport {
            portfolio_var: metrics.portfolio_var,
            confidence,
            time_horizon: time_horizon.to_string(),
        }
    }
}

/// A compliance report handed to an external regulatory submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: ReportData,
    pub status: ReportStatus,
    pub regulatory_body: String,
}

impl ComplianceReport {
    /// Create a pending report stamped now.
    pub fn new(data: ReportData, regulatory_body: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            data,
            status: ReportStatus::Pending,
            regulatory_body: regulatory_body.to_string(),
        }
    }
}
