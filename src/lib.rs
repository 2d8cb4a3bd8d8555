//! Palisade is an inline risk-scoring engine for web traffic: it turns
//! one request's signals (user agent, behavioral telemetry, device
//! fingerprint, IP reputation, request timing) into a 0-100 risk score
//! and an allow / challenge / block decision.
//!
//! The engine is a library on purpose. The HTTP surface, persistence,
//! and the challenge page belong to the host; it builds a
//! [`RequestSignal`], awaits [`ClassificationEngine::classify`], and
//! acts on the [`ClassificationResult`]. The only state the engine
//! keeps between calls is per-session request timing, evicted on a TTL.
//!
//! ```no_run
//! use palisade::{ClassificationEngine, EngineSettings, RequestSignal};
//!
//! # async fn run() {
//! let settings = EngineSettings::default();
//! let engine = ClassificationEngine::new(&settings);
//!
//! let signal = RequestSignal::new("session-1", "203.0.113.7".parse().unwrap());
//! let result = engine.classify(&signal).await;
//! println!("{} -> {}", result.risk_score, result.action);
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod engine;
pub mod models;
pub mod reputation;

pub use config::settings::{EngineSettings, ReputationConfig, ScoringWeights, ThresholdConfig, TrackerConfig};
pub use config::thresholds::ThresholdStore;
pub use engine::pipeline::ClassificationEngine;
pub use engine::tracker::{PatternSnapshot, RequestPatternTracker};
pub use models::signal::{BehaviorData, DeviceFingerprint, RequestSignal};
pub use models::verdict::{Action, ClassificationResult, Severity};
pub use reputation::source::{ReputationAttributes, ReputationSource};
pub use reputation::{ReputationAnalyzer, ReputationResult};
