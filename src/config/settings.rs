use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use super::defaults;

/// Top-level configuration for the classification engine.
/// Deserializes from a TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "defaults::default_threshold_config")]
    pub thresholds: ThresholdConfig,

    #[serde(default = "defaults::default_scoring_weights")]
    pub weights: ScoringWeights,

    #[serde(default = "defaults::default_reputation_config")]
    pub reputation: ReputationConfig,

    #[serde(default = "defaults::default_tracker_config")]
    pub tracker: TrackerConfig,
}

impl EngineSettings {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let settings: EngineSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(settings)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: defaults::default_threshold_config(),
            weights: defaults::default_scoring_weights(),
            reputation: defaults::default_reputation_config(),
            tracker: defaults::default_tracker_config(),
        }
    }
}

/// Action cut points over the risk score. Updated at runtime through the
/// configuration channel; every classification reads one atomic snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Scores at or above this are challenged.
    #[serde(default = "defaults::default_challenge_threshold")]
    pub challenge: u8,

    /// Scores at or above this are blocked.
    #[serde(default = "defaults::default_block_threshold")]
    pub block: u8,
}

/// Weights for the composite scoring formula. The historical variants of
/// this system disagreed on exact values; these are the canonical set and
/// every one of them is tunable.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier on the user-agent sub-score in [0, 1].
    #[serde(default = "defaults::default_user_agent_weight")]
    pub user_agent: f64,

    /// Multiplier on (1 - behavior sub-score).
    #[serde(default = "defaults::default_behavior_weight")]
    pub behavior: f64,

    /// Multiplier on the device-fingerprint sub-score in [0, 1].
    #[serde(default = "defaults::default_fingerprint_weight")]
    pub fingerprint: f64,

    /// Multiplier on the proxy/VPN confidence score in [0, 100].
    #[serde(default = "defaults::default_reputation_weight")]
    pub reputation: f64,

    /// Flat points added when frequency exceeds `normal_rps`.
    #[serde(default = "defaults::default_frequency_elevated_points")]
    pub frequency_elevated: f64,

    /// Flat points added when frequency exceeds `high_rps`.
    #[serde(default = "defaults::default_frequency_high_points")]
    pub frequency_high: f64,

    /// Requests/second below which frequency contributes nothing.
    #[serde(default = "defaults::default_normal_rps")]
    pub normal_rps: f64,

    /// Requests/second above which frequency is treated as malicious.
    #[serde(default = "defaults::default_high_rps")]
    pub high_rps: f64,

    /// Flat points added when inter-request timing is mechanical.
    #[serde(default = "defaults::default_rhythmic_points")]
    pub rhythmic: f64,

    /// Flat points added when a crawler UA fails IP-range verification.
    #[serde(default = "defaults::default_spoofed_crawler_points")]
    pub spoofed_crawler: f64,

    /// Fixed score returned for IP-verified legitimate crawlers.
    #[serde(default = "defaults::default_verified_crawler_score")]
    pub verified_crawler_score: u8,
}

/// External reputation source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReputationConfig {
    #[serde(default = "defaults::default_reputation_enabled")]
    pub enabled: bool,

    /// Base URL; the IP is appended as a path segment.
    #[serde(default = "defaults::default_reputation_endpoint")]
    pub endpoint: String,

    /// Upper bound on the external query. On timeout the lookup
    /// contributes zero and tags `lookup_failed`.
    #[serde(default = "defaults::default_reputation_timeout_millis")]
    pub timeout_millis: u64,

    /// Proxy confidence at or above which `is_vpn_proxy` is set.
    #[serde(default = "defaults::default_vpn_proxy_threshold")]
    pub vpn_proxy_threshold: u8,

    /// Operator's home country; traffic from it scores slightly lower.
    #[serde(default = "defaults::default_home_country")]
    pub home_country: String,

    /// Provider-name fragments recognized as home-market residential ISPs.
    #[serde(default = "defaults::default_residential_isps")]
    pub residential_isps: Vec<String>,
}

/// Request-pattern tracker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Timestamps retained per session.
    #[serde(default = "defaults::default_max_samples")]
    pub max_samples: usize,

    /// Samples required before the rhythmic flag is meaningful.
    #[serde(default = "defaults::default_min_rhythm_samples")]
    pub min_rhythm_samples: usize,

    /// Inter-arrival variance (ms^2) below which timing counts as mechanical.
    #[serde(default = "defaults::default_rhythm_variance_ms2")]
    pub rhythm_variance_ms2: f64,

    /// Sessions idle longer than this are evicted.
    #[serde(default = "defaults::default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}
