use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error};

use crate::analysis::user_agent::{self, UaAnalysis};
use crate::analysis::{behavior, fingerprint};
use crate::config::settings::{EngineSettings, ScoringWeights, ThresholdConfig};
use crate::config::thresholds::ThresholdStore;
use crate::models::signal::RequestSignal;
use crate::models::verdict::{Action, ClassificationResult, Severity};
use crate::reputation::source::ReputationSource;
use crate::reputation::{ReputationAnalyzer, ReputationResult};

use super::classifier;
use super::scorer;
use super::tracker::{PatternSnapshot, RequestPatternTracker};

const VERIFIED_CRAWLER_CONFIDENCE: u8 = 95;

/// The risk-scoring engine: one `classify` call per inbound request.
///
/// Stateless per call except for the pattern tracker's session history.
/// The HTTP layer, persistence, and the challenge UI live outside this
/// crate; they hand in a [`RequestSignal`] and move the
/// [`ClassificationResult`] to storage or the wire.
pub struct ClassificationEngine {
    weights: ScoringWeights,
    thresholds: Arc<ThresholdStore>,
    tracker: RequestPatternTracker,
    reputation: ReputationAnalyzer,
    /// Test-only hook invoked at the top of assembly, so tests can force
    /// a catastrophic scoring failure through the real `classify` path.
    #[cfg(test)]
    fault_injection: Option<fn()>,
}

impl ClassificationEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            weights: settings.weights.clone(),
            thresholds: Arc::new(ThresholdStore::new(settings.thresholds)),
            tracker: RequestPatternTracker::new(&settings.tracker),
            reputation: ReputationAnalyzer::new(&settings.reputation),
            #[cfg(test)]
            fault_injection: None,
        }
    }

    /// Build with an injected reputation source (tests, alternate
    /// providers).
    pub fn with_reputation_source(
        settings: &EngineSettings,
        source: Arc<dyn ReputationSource>,
    ) -> Self {
        Self {
            weights: settings.weights.clone(),
            thresholds: Arc::new(ThresholdStore::new(settings.thresholds)),
            tracker: RequestPatternTracker::new(&settings.tracker),
            reputation: ReputationAnalyzer::with_source(&settings.reputation, source),
            #[cfg(test)]
            fault_injection: None,
        }
    }

    /// Handle for the configuration channel: the host's admin surface
    /// updates thresholds through this store; classification reads one
    /// snapshot per call.
    pub fn thresholds(&self) -> Arc<ThresholdStore> {
        Arc::clone(&self.thresholds)
    }

    pub fn tracker(&self) -> &RequestPatternTracker {
        &self.tracker
    }

    /// Classify one request.
    ///
    /// Never returns an error: missing signals are scored, a dead
    /// reputation source degrades to `lookup_failed`, and a panic inside
    /// scoring fails open with a safe fallback result — a scoring bug must
    /// not take the request path down or block all traffic.
    pub async fn classify(&self, signal: &RequestSignal) -> ClassificationResult {
        let thresholds = self.thresholds.snapshot();
        let pattern = self.tracker.observe(&signal.session_id);
        let ua = user_agent::analyze(signal.user_agent.as_deref());
        let reputation = self.reputation.evaluate(signal, ua.crawler).await;

        let assembled = panic::catch_unwind(AssertUnwindSafe(|| {
            self.assemble(signal, &thresholds, &pattern, &ua, &reputation)
        }));

        match assembled {
            Ok(result) => {
                debug!(
                    session = %signal.session_id,
                    score = result.risk_score,
                    action = %result.action,
                    "Classification complete"
                );
                result
            }
            Err(_) => {
                error!(
                    session = %signal.session_id,
                    ip = %signal.ip_address,
                    "Scoring panicked; returning fail-open fallback"
                );
                Self::fail_open_fallback()
            }
        }
    }

    fn assemble(
        &self,
        signal: &RequestSignal,
        thresholds: &ThresholdConfig,
        pattern: &PatternSnapshot,
        ua: &UaAnalysis,
        reputation: &ReputationResult,
    ) -> ClassificationResult {
        #[cfg(test)]
        if let Some(fault) = self.fault_injection {
            fault();
        }

        let behavior = behavior::analyze(signal.behavior.as_ref());
        let device = fingerprint::analyze(signal.device.as_ref());

        let breakdown = scorer::compose(
            &self.weights,
            ua,
            &behavior,
            &device,
            reputation,
            pattern,
        );

        // A verified crawler is allowed outright, whatever the thresholds
        // currently say.
        let action = if breakdown.verified_crawler {
            Action::Allow
        } else {
            classifier::decide(breakdown.score, thresholds)
        };

        let confidence = if breakdown.verified_crawler {
            VERIFIED_CRAWLER_CONFIDENCE
        } else {
            classifier::confidence(action, breakdown.factors.len())
        };

        // Verified and spoofed crawlers are both bots; only one is wanted.
        let is_bot = action != Action::Allow || ua.crawler.is_some();

        ClassificationResult {
            risk_score: breakdown.score,
            action,
            confidence,
            severity: classifier::severity(breakdown.score),
            threats: breakdown.factors,
            is_bot,
            bot_family: ua.crawler.map(|family| family.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// The fail-open result: score 0, allow, sentinel factor. Availability
    /// over false positives.
    pub fn fail_open_fallback() -> ClassificationResult {
        ClassificationResult {
            risk_score: 0,
            action: Action::Allow,
            confidence: 0,
            severity: Severity::Minimal,
            threats: vec!["Analysis Error - Safe Fallback".to_string()],
            is_bot: false,
            bot_family: None,
            timestamp: Utc::now(),
        }
    }

    /// Periodic session eviction, spawned by the host process.
    pub async fn run_eviction_loop(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.tracker.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signal::BehaviorData;
    use crate::models::signal::DeviceFingerprint;
    use crate::reputation::source::ReputationAttributes;
    use anyhow::anyhow;
    use futures_util::future::BoxFuture;
    use std::net::IpAddr;

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
    const GOOGLEBOT_UA: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    struct StaticSource(ReputationAttributes);

    impl ReputationSource for StaticSource {
        fn query(&self, _ip: IpAddr) -> BoxFuture<'_, anyhow::Result<ReputationAttributes>> {
            let attrs = self.0.clone();
            Box::pin(async move { Ok(attrs) })
        }
    }

    struct FailingSource;

    impl ReputationSource for FailingSource {
        fn query(&self, _ip: IpAddr) -> BoxFuture<'_, anyhow::Result<ReputationAttributes>> {
            Box::pin(async { Err(anyhow!("unreachable")) })
        }
    }

    struct HangingSource;

    impl ReputationSource for HangingSource {
        fn query(&self, _ip: IpAddr) -> BoxFuture<'_, anyhow::Result<ReputationAttributes>> {
            Box::pin(futures_util::future::pending())
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("palisade=debug")
            .try_init();
    }

    fn clean_home_attrs() -> ReputationAttributes {
        ReputationAttributes {
            proxy: Some(false),
            risk: Some(0.0),
            provider: Some("Comcast Cable Communications".to_string()),
            country: Some("US".to_string()),
            ..Default::default()
        }
    }

    fn human_behavior() -> BehaviorData {
        BehaviorData {
            mouse_movements: Some(140),
            clicks: Some(5),
            keystrokes: Some(32),
            scroll_events: Some(7),
            avg_click_speed_ms: Some(230.0),
            mouse_variation: Some(42.0),
            time_on_page: Some(55.0),
            page_interactions: Some(11),
            ..Default::default()
        }
    }

    fn human_device() -> DeviceFingerprint {
        DeviceFingerprint {
            webdriver: Some(false),
            plugin_count: Some(3),
            device_memory: Some(8.0),
            hardware_concurrency: Some(8),
            timezone: Some("America/New_York".to_string()),
            language: Some("en-US".to_string()),
            screen_width: Some(1920.0),
            screen_height: Some(1080.0),
            viewport_width: Some(1920.0),
            viewport_height: Some(955.0),
            ..Default::default()
        }
    }

    fn signal(session: &str, ip: &str) -> RequestSignal {
        RequestSignal::new(session, ip.parse().unwrap())
    }

    #[tokio::test]
    async fn browser_with_telemetry_is_allowed() {
        init_tracing();
        let engine = ClassificationEngine::with_reputation_source(
            &EngineSettings::default(),
            Arc::new(StaticSource(clean_home_attrs())),
        );

        let mut sig = signal("human-1", "198.51.100.10");
        sig.user_agent = Some(CHROME_UA.to_string());
        sig.behavior = Some(human_behavior());
        sig.device = Some(human_device());

        let result = engine.classify(&sig).await;
        assert!(result.risk_score < 40, "score was {}", result.risk_score);
        assert_eq!(result.action, Action::Allow);
        assert!(!result.is_bot);
        assert!(!result.threats.is_empty());
    }

    #[tokio::test]
    async fn http_client_without_telemetry_is_blocked() {
        let engine = ClassificationEngine::with_reputation_source(
            &EngineSettings::default(),
            Arc::new(StaticSource(clean_home_attrs())),
        );

        let mut sig = signal("scraper-1", "203.0.113.10");
        sig.user_agent = Some("python-requests/2.28".to_string());

        let result = engine.classify(&sig).await;
        assert!(result.risk_score >= 75, "score was {}", result.risk_score);
        assert_eq!(result.action, Action::Block);
        assert!(result.is_bot);
    }

    #[tokio::test]
    async fn verified_crawler_is_always_allowed() {
        // A failing reputation source must not matter for verified bots.
        let engine = ClassificationEngine::with_reputation_source(
            &EngineSettings::default(),
            Arc::new(FailingSource),
        );

        let mut sig = signal("crawler-1", "66.249.66.1");
        sig.user_agent = Some(GOOGLEBOT_UA.to_string());
        // No behavior data at all, like a real crawler.

        let result = engine.classify(&sig).await;
        assert_eq!(result.action, Action::Allow);
        assert_eq!(result.risk_score, 5);
        assert!(result.is_bot);
        assert_eq!(result.bot_family.as_deref(), Some("Googlebot"));
        assert_eq!(result.confidence, VERIFIED_CRAWLER_CONFIDENCE);
    }

    #[tokio::test]
    async fn spoofed_crawler_is_flagged_and_escalated() {
        let engine = ClassificationEngine::with_reputation_source(
            &EngineSettings::default(),
            Arc::new(StaticSource(ReputationAttributes::default())),
        );

        let mut sig = signal("spoof-1", "203.0.113.50");
        sig.user_agent = Some(GOOGLEBOT_UA.to_string());

        let result = engine.classify(&sig).await;
        assert!(result.threats.iter().any(|t| t.contains("spoofed_bot")));
        assert!(result.risk_score >= 50, "score was {}", result.risk_score);
        assert_ne!(result.action, Action::Allow);
        assert_eq!(result.bot_family.as_deref(), Some("Googlebot"));
    }

    #[tokio::test]
    async fn reputation_timeout_degrades_gracefully() {
        let mut settings = EngineSettings::default();
        settings.reputation.timeout_millis = 20;
        let engine =
            ClassificationEngine::with_reputation_source(&settings, Arc::new(HangingSource));

        let mut sig = signal("slow-1", "198.51.100.77");
        sig.user_agent = Some(CHROME_UA.to_string());
        sig.behavior = Some(human_behavior());

        let result = engine.classify(&sig).await;
        assert!(result
            .threats
            .iter()
            .any(|t| t.contains("lookup_failed")));
        // Zero reputation contribution: still a quiet human request.
        assert_eq!(result.action, Action::Allow);
    }

    #[tokio::test]
    async fn threshold_update_reclassifies_same_bundle() {
        let mut settings = EngineSettings::default();
        settings.thresholds = ThresholdConfig {
            challenge: 50,
            block: 85,
        };
        settings.reputation.enabled = false;
        let engine = ClassificationEngine::new(&settings);

        // Mid-band bundle: browser UA, no telemetry, thin fingerprint.
        let build = |session: &str| {
            let mut sig = signal(session, "198.51.100.20");
            sig.user_agent = Some(CHROME_UA.to_string());
            sig.device = Some(DeviceFingerprint {
                plugin_count: Some(0),
                ..Default::default()
            });
            sig
        };

        let before = engine.classify(&build("cfg-a")).await;
        assert_eq!(before.action, Action::Allow, "score {}", before.risk_score);
        assert!(before.risk_score >= 40 && before.risk_score < 50);

        engine.thresholds().update(ThresholdConfig {
            challenge: 40,
            block: 75,
        });

        let after = engine.classify(&build("cfg-b")).await;
        assert_eq!(after.risk_score, before.risk_score);
        assert_eq!(after.action, Action::Challenge);
    }

    #[tokio::test]
    async fn malformed_behavior_fields_do_not_penalize() {
        let mut settings = EngineSettings::default();
        settings.reputation.enabled = false;
        let engine = ClassificationEngine::new(&settings);

        let raw = serde_json::json!({
            "sessionId": "garbled-1",
            "ipAddress": "198.51.100.30",
            "userAgent": CHROME_UA,
            "behaviorData": {
                "mouseMovements": "abc",
                "clicks": 4,
                "keystrokes": 18,
                "scrollEvents": 3
            }
        });
        let sig: RequestSignal = serde_json::from_value(raw).unwrap();

        let result = engine.classify(&sig).await;
        assert_eq!(result.action, Action::Allow);
        assert!(!result
            .threats
            .iter()
            .any(|t| t.contains("no_mouse_movement")));
    }

    #[tokio::test]
    async fn rapid_fire_sessions_accumulate_risk() {
        let mut settings = EngineSettings::default();
        settings.reputation.enabled = false;
        let engine = ClassificationEngine::new(&settings);

        let mut sig = signal("drone-1", "198.51.100.40");
        sig.user_agent = Some(CHROME_UA.to_string());
        sig.behavior = Some(human_behavior());

        // A 50ms-spaced burst just before the classified request: even with
        // clean telemetry the timing alone raises risk.
        let base = std::time::Instant::now() - Duration::from_millis(400);
        for i in 0..9u32 {
            engine
                .tracker()
                .observe_at("drone-1", base + Duration::from_millis(50 * u64::from(i)));
        }

        let result = engine.classify(&sig).await;
        assert!(result
            .threats
            .iter()
            .any(|t| t.contains("request frequency")));
        assert!(result.risk_score >= 30, "score was {}", result.risk_score);
    }

    #[tokio::test]
    async fn scoring_panic_converts_to_fallback() {
        let mut settings = EngineSettings::default();
        settings.reputation.enabled = false;
        let mut engine = ClassificationEngine::new(&settings);
        engine.fault_injection = Some(|| panic!("injected scoring failure"));

        let mut sig = signal("broken-1", "198.51.100.60");
        sig.user_agent = Some("python-requests/2.28".to_string());

        // Even a request that would otherwise block must come out as the
        // safe fallback when scoring blows up mid-flight.
        let result = engine.classify(&sig).await;
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.action, Action::Allow);
        assert_eq!(result.confidence, 0);
        assert_eq!(
            result.threats,
            vec!["Analysis Error - Safe Fallback".to_string()]
        );
        assert!(!result.is_bot);
        assert!(result.bot_family.is_none());
    }

    #[test]
    fn fallback_result_fails_open() {
        let fallback = ClassificationEngine::fail_open_fallback();
        assert_eq!(fallback.risk_score, 0);
        assert_eq!(fallback.action, Action::Allow);
        assert_eq!(
            fallback.threats,
            vec!["Analysis Error - Safe Fallback".to_string()]
        );
    }
}
