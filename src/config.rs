use std::env;

/// Retry/backoff policy for hedge order submission.
#[derive(Debug, Clone)]
pub struct HedgeRetryConfig {
    /// Maximum submission attempts before surfacing a critical alert.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds; doubles per attempt.
    pub backoff_base_ms: u64,
}

impl Default for HedgeRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 250,
        }
    }
}

/// Alert history and deduplication configuration.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Number of recent alerts retained; oldest evicted first.
    pub max_history: usize,
    /// Window within which identical alerts collapse into one.
    pub debounce_secs: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            debounce_secs: 60,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Aggregation cycle interval (ms).
    pub aggregation_interval_ms: u64,
    /// VaR confidence level (e.g. 0.95).
    pub var_confidence: f64,
    /// Optional VaR cap; breaches raise a critical alert.
    pub var_limit: Option<f64>,
    /// Minimum correlation for a cross-hedge candidate.
    pub min_correlation: f64,
    /// Annual risk-free rate used by the options pricer.
    pub risk_free_rate: f64,
    /// Assets in the correlation basket.
    pub tracked_assets: Vec<String>,
    /// Alert retention and dedup settings.
    pub alerts: AlertConfig,
    /// Hedge submission retry policy.
    pub hedge_retry: HedgeRetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregation_interval_ms: 2000,
            var_confidence: 0.95,
            var_limit: None,
            min_correlation: 0.5,
            risk_free_rate: 0.05,
            tracked_assets: ["BTC", "ETH", "SOL", "AVAX", "MATIC", "DOT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            alerts: AlertConfig::default(),
            hedge_retry: HedgeRetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        // Parse tracked assets from TRACKED_ASSETS env var
        // Format: "BTC,ETH,SOL"
        let tracked_assets = env::var("TRACKED_ASSETS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|a| a.trim().to_uppercase())
                    .filter(|a| !a.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or(defaults.tracked_assets);

        Self {
            aggregation_interval_ms: env::var("AGGREGATION_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.aggregation_interval_ms),
            var_confidence: env::var("VAR_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.var_confidence),
            var_limit: env::var("VAR_LIMIT").ok().and_then(|v| v.parse().ok()),
            min_correlation: env::var("MIN_CORRELATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_correlation),
            risk_free_rate: env::var("RISK_FREE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.risk_free_rate),
            tracked_assets,
            alerts: AlertConfig {
                max_history: env::var("MAX_ALERT_HISTORY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.alerts.max_history),
                debounce_secs: env::var("ALERT_DEBOUNCE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.alerts.debounce_secs),
            },
            hedge_retry: HedgeRetryConfig {
                max_attempts: env::var("HEDGE_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.hedge_retry.max_attempts),
                backoff_base_ms: env::var("HEDGE_BACKOFF_BASE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.hedge_retry.backoff_base_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.aggregation_interval_ms, 2000);
        assert_eq!(config.var_confidence, 0.95);
        assert_eq!(config.var_limit, None);
        assert_eq!(config.min_correlation, 0.5);
        assert_eq!(config.tracked_assets.len(), 6);
        assert_eq!(config.alerts.max_history, 10);
        assert_eq!(config.alerts.debounce_secs, 60);
        assert_eq!(config.hedge_retry.max_attempts, 3);
    }

    #[test]
    fn test_hedge_retry_defaults() {
        let retry = HedgeRetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_base_ms, 250);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(cloned.aggregation_interval_ms, config.aggregation_interval_ms);
        assert_eq!(cloned.tracked_assets, config.tracked_assets);
    }
}
