use crate::analysis::behavior::BehaviorAnalysis;
use crate::analysis::fingerprint::FingerprintAnalysis;
use crate::analysis::user_agent::UaAnalysis;
use crate::config::settings::ScoringWeights;
use crate::reputation::ReputationResult;

use super::tracker::PatternSnapshot;

/// Composite score plus the ordered factor list that explains it.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    /// Risk score in [0, 100].
    pub score: u8,
    /// Human-readable contributing factors, deduplicated, never empty.
    pub factors: Vec<String>,
    /// The verified-crawler short circuit fired.
    pub verified_crawler: bool,
}

/// Combine extractor, reputation, and pattern outputs into one risk score.
///
/// Deterministic: the same inputs always produce the same breakdown. The
/// running sum is clamped once at the end, so several moderate signals can
/// legitimately stack into a block while no single malformed extractor can
/// overflow the scale.
pub fn compose(
    weights: &ScoringWeights,
    ua: &UaAnalysis,
    behavior: &BehaviorAnalysis,
    fingerprint: &FingerprintAnalysis,
    reputation: &ReputationResult,
    pattern: &PatternSnapshot,
) -> ScoreBreakdown {
    // Verified legitimate crawlers bypass all penalty scoring. False
    // positives here cost the publisher search traffic.
    if reputation.verified_by_ip_range {
        if let Some(family) = ua.crawler {
            return ScoreBreakdown {
                score: weights.verified_crawler_score.min(100),
                factors: vec![format!("Verified {} crawler", family)],
                verified_crawler: true,
            };
        }
    }

    let mut total: f64 = 0.0;
    let mut factors: Vec<String> = Vec::new();

    if pattern.frequency >= weights.high_rps {
        total += weights.frequency_high;
        push_unique(
            &mut factors,
            format!("High request frequency: {:.1}/sec", pattern.frequency),
        );
    } else if pattern.frequency >= weights.normal_rps {
        total += weights.frequency_elevated;
        push_unique(
            &mut factors,
            format!("Elevated request frequency: {:.1}/sec", pattern.frequency),
        );
    }

    if pattern.is_rhythmic {
        total += weights.rhythmic;
        push_unique(
            &mut factors,
            "Mechanical request timing (low interval jitter)".to_string(),
        );
    }

    let ua_term = ua.score * weights.user_agent;
    if ua_term > 0.0 {
        total += ua_term;
        let detail = if ua.anomalies.is_empty() {
            match ua.crawler {
                Some(family) => format!("User agent matches {} signature", family),
                None => "User agent signals".to_string(),
            }
        } else {
            format!("User agent signals: {}", ua.anomalies.join(", "))
        };
        push_unique(&mut factors, detail);
    }

    let behavior_term = (1.0 - behavior.score) * weights.behavior;
    if behavior_term > 0.0 {
        total += behavior_term;
        if !behavior.signals.is_empty() {
            push_unique(
                &mut factors,
                format!("Behavioral signals: {}", behavior.signals.join(", ")),
            );
        }
    }

    let fingerprint_term = fingerprint.score * weights.fingerprint;
    if fingerprint_term > 0.0 {
        total += fingerprint_term;
        push_unique(
            &mut factors,
            format!(
                "Device fingerprint signals: {}",
                fingerprint.anomalies.join(", ")
            ),
        );
    }

    if reputation.spoofed {
        total += weights.spoofed_crawler;
        push_unique(
            &mut factors,
            "Crawler signature without matching IP range (spoofed_bot)".to_string(),
        );
    }

    let reputation_term = f64::from(reputation.proxy_score) * weights.reputation;
    if reputation.proxy_score > 0 {
        total += reputation_term;
        let tags: Vec<&str> = reputation
            .signals
            .iter()
            .map(String::as_str)
            .filter(|s| *s != "spoofed_bot")
            .collect();
        push_unique(
            &mut factors,
            format!(
                "Proxy/VPN indicators ({}): {}",
                reputation.proxy_score,
                tags.join(", ")
            ),
        );
    } else if reputation.signals.iter().any(|s| s == "lookup_failed") {
        push_unique(
            &mut factors,
            "Reputation signals: lookup_failed".to_string(),
        );
    }

    if factors.is_empty() {
        factors.push("Low Risk".to_string());
    }

    ScoreBreakdown {
        score: total.clamp(0.0, 100.0).round() as u8,
        factors,
        verified_crawler: false,
    }
}

fn push_unique(factors: &mut Vec<String>, factor: String) {
    if !factors.contains(&factor) {
        factors.push(factor);
    }
}
