//! Alert Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A threshold breach or lifecycle event surfaced to operators.
///
/// Acknowledgement is one-way: once acknowledged an alert never reverts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub message: String,
    pub asset: Option<String>,
    pub action: Option<String>,
    pub acknowledged: bool,
}

impl Alert {
    /// Create an unacknowledged alert stamped now.
    pub fn new(level: AlertLevel, message: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            asset: None,
            action: None,
            acknowledged: false,
        }
    }

    /// Tag the alert with an asset symbol.
    pub fn with_asset(mut self, asset: &str) -> Self {
        self.asset = Some(asset.to_string());
        self
    }

    /// Tag the alert with a suggested action.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }
}
