//! Alert Manager
//!
//! Owns the alert lifecycle: a bounded newest-first history with
//! debounce-window deduplication, and idempotent one-way acknowledgement.

use crate::config::AlertConfig;
use crate::types::Alert;
use chrono::Duration;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Bounded recent-alert history.
pub struct AlertManager {
    history: RwLock<VecDeque<Alert>>,
    max_history: usize,
    debounce: Duration,
}

impl AlertManager {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(config.max_history)),
            max_history: config.max_history,
            debounce: Duration::seconds(config.debounce_secs),
        }
    }

    /// Record an alert, collapsing repeats.
    ///
    /// An alert matching an existing entry on (level, asset, message) within
    /// the debounce window refreshes that entry's timestamp instead of
    /// appending; otherwise it goes to the front and the oldest entry is
    /// evicted past the cap.
    pub fn raise(&self, alert: Alert) {
        let mut history = self.history.write().unwrap();
        if let Some(existing) = history.iter_mut().find(|a| {
            a.level == alert.level
                && a.asset == alert.asset
                && a.message == alert.message
                && alert.timestamp - a.timestamp < self.debounce
        }) {
            existing.timestamp = alert.timestamp;
            return;
        }

        history.push_front(alert);
        history.truncate(self.max_history);
    }

    /// Acknowledge an alert by id.
    ///
    /// Unknown ids and already-acknowledged alerts are no-ops.
    pub fn acknowledge(&self, id: &str) {
        let mut history = self.history.write().unwrap();
        if let Some(alert) = history.iter_mut().find(|a| a.id == id) {
            alert.acknowledged = true;
        }
    }

    /// Recent alerts, newest first.
    pub fn recent(&self) -> Vec<Alert> {
        self.history.read().unwrap().iter().cloned().collect()
    }

    /// Number of retained alerts.
    pub fn len(&self) -> usize {
        self.history.read().unwrap().len()
    }

    /// Whether any alerts are retained.
    pub fn is_empty(&self) -> bool {
        self.history.read().unwrap().is_empty()
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(&AlertConfig::default())
    }
}
