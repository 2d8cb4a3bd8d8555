use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal disposition for a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Challenge,
    Block,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Challenge => write!(f, "challenge"),
            Action::Block => write!(f, "block"),
        }
    }
}

impl Action {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "challenge" => Some(Self::Challenge),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Action::Block)
    }
}

/// Display/analytics bucketing of the risk score. Monotonic in the score
/// and independent of the action thresholds — the two scales overlap by
/// convention but are never derived from one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Minimal => write!(f, "minimal"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl Severity {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minimal" => Some(Self::Minimal),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Output of one classification call. Immutable once produced; the
/// persistence and analytics collaborators consume it as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Bot/automation likelihood, always in [0, 100].
    pub risk_score: u8,

    pub action: Action,

    /// How strongly the engine stands behind the action, in [0, 100].
    pub confidence: u8,

    pub severity: Severity,

    /// Ordered, deduplicated human-readable contributing factors.
    /// Never empty — a quiet request carries the "Low Risk" sentinel.
    pub threats: Vec<String>,

    pub is_bot: bool,

    /// Crawler family name when a known bot (wanted or spoofed) matched.
    pub bot_family: Option<String>,

    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_names() {
        for action in [Action::Allow, Action::Challenge, Action::Block] {
            assert_eq!(Action::from_str_name(&action.to_string()), Some(action));
        }
        assert_eq!(Action::from_str_name("tarpit"), None);
    }

    #[test]
    fn severity_ordering_matches_escalation() {
        assert!(Severity::Minimal < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn only_block_is_blocking() {
        assert!(Action::Block.is_blocking());
        assert!(!Action::Challenge.is_blocking());
        assert!(!Action::Allow.is_blocking());
    }
}
