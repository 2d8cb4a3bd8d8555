use crate::config::settings::ThresholdConfig;
use crate::models::verdict::{Action, Severity};

/// Map a risk score to an action against one threshold snapshot.
///
/// Pure and monotonic: for a fixed snapshot, a higher score never yields
/// a softer action.
pub fn decide(score: u8, thresholds: &ThresholdConfig) -> Action {
    if score >= thresholds.block {
        Action::Block
    } else if score >= thresholds.challenge {
        Action::Challenge
    } else {
        Action::Allow
    }
}

/// Base confidence per action branch.
const CONFIDENCE_BLOCK: u8 = 90;
const CONFIDENCE_CHALLENGE: u8 = 80;
const CONFIDENCE_ALLOW: u8 = 60;
/// Extra confidence per contributing factor beyond the second; multiple
/// independent signals agreeing is worth more than any single one.
const FACTOR_AGREEMENT_BOOST: u8 = 3;
const CONFIDENCE_CAP: u8 = 97;

pub fn confidence(action: Action, factor_count: usize) -> u8 {
    let base = match action {
        Action::Block => CONFIDENCE_BLOCK,
        Action::Challenge => CONFIDENCE_CHALLENGE,
        Action::Allow => CONFIDENCE_ALLOW,
    };
    let extra = factor_count.saturating_sub(2) as u8;
    base.saturating_add(extra.saturating_mul(FACTOR_AGREEMENT_BOOST))
        .min(CONFIDENCE_CAP)
}

/// Display/analytics bucketing. Fixed cut points, deliberately separate
/// from the configurable action thresholds even though they overlap by
/// convention.
pub fn severity(score: u8) -> Severity {
    match score {
        80..=u8::MAX => Severity::Critical,
        60..=79 => Severity::High,
        40..=59 => Severity::Medium,
        20..=39 => Severity::Low,
        _ => Severity::Minimal,
    }
}
