use super::settings::{
    ReputationConfig, ScoringWeights, ThresholdConfig, TrackerConfig,
};

// ---------------------------------------------------------------------------
// Top-level struct defaults
// ---------------------------------------------------------------------------

pub fn default_threshold_config() -> ThresholdConfig {
    ThresholdConfig {
        challenge: default_challenge_threshold(),
        block: default_block_threshold(),
    }
}

pub fn default_scoring_weights() -> ScoringWeights {
    ScoringWeights {
        user_agent: default_user_agent_weight(),
        behavior: default_behavior_weight(),
        fingerprint: default_fingerprint_weight(),
        reputation: default_reputation_weight(),
        frequency_elevated: default_frequency_elevated_points(),
        frequency_high: default_frequency_high_points(),
        normal_rps: default_normal_rps(),
        high_rps: default_high_rps(),
        rhythmic: default_rhythmic_points(),
        spoofed_crawler: default_spoofed_crawler_points(),
        verified_crawler_score: default_verified_crawler_score(),
    }
}

pub fn default_reputation_config() -> ReputationConfig {
    ReputationConfig {
        enabled: default_reputation_enabled(),
        endpoint: default_reputation_endpoint(),
        timeout_millis: default_reputation_timeout_millis(),
        vpn_proxy_threshold: default_vpn_proxy_threshold(),
        home_country: default_home_country(),
        residential_isps: default_residential_isps(),
    }
}

pub fn default_tracker_config() -> TrackerConfig {
    TrackerConfig {
        max_samples: default_max_samples(),
        min_rhythm_samples: default_min_rhythm_samples(),
        rhythm_variance_ms2: default_rhythm_variance_ms2(),
        session_ttl_secs: default_session_ttl_secs(),
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

pub fn default_challenge_threshold() -> u8 {
    50
}

pub fn default_block_threshold() -> u8 {
    75
}

// ---------------------------------------------------------------------------
// Scoring weights
// ---------------------------------------------------------------------------

pub fn default_user_agent_weight() -> f64 {
    45.0
}

pub fn default_behavior_weight() -> f64 {
    35.0
}

pub fn default_fingerprint_weight() -> f64 {
    20.0
}

pub fn default_reputation_weight() -> f64 {
    0.25
}

pub fn default_frequency_elevated_points() -> f64 {
    15.0
}

pub fn default_frequency_high_points() -> f64 {
    30.0
}

pub fn default_normal_rps() -> f64 {
    2.0
}

pub fn default_high_rps() -> f64 {
    8.0
}

pub fn default_rhythmic_points() -> f64 {
    20.0
}

pub fn default_spoofed_crawler_points() -> f64 {
    35.0
}

pub fn default_verified_crawler_score() -> u8 {
    5
}

// ---------------------------------------------------------------------------
// Reputation lookup
// ---------------------------------------------------------------------------

pub fn default_reputation_enabled() -> bool {
    true
}

pub fn default_reputation_endpoint() -> String {
    String::from("http://127.0.0.1:9040/v1/ip")
}

pub fn default_reputation_timeout_millis() -> u64 {
    8000
}

pub fn default_vpn_proxy_threshold() -> u8 {
    65
}

pub fn default_home_country() -> String {
    String::from("US")
}

pub fn default_residential_isps() -> Vec<String> {
    [
        "comcast", "xfinity", "verizon", "at&t", "spectrum", "charter",
        "cox communications", "centurylink", "frontier",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ---------------------------------------------------------------------------
// Pattern tracker
// ---------------------------------------------------------------------------

pub fn default_max_samples() -> usize {
    10
}

pub fn default_min_rhythm_samples() -> usize {
    6
}

pub fn default_rhythm_variance_ms2() -> f64 {
    225.0
}

pub fn default_session_ttl_secs() -> u64 {
    3600
}
