pub mod crawler;
pub mod source;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::settings::ReputationConfig;
use crate::models::signal::RequestSignal;

use crawler::{CrawlerDirectory, CrawlerFamily};
use source::{HttpReputationSource, ReputationAttributes, ReputationSource};

/// Per-call reputation verdict. Derived fresh for every classification;
/// caching across calls is an external concern.
#[derive(Debug, Clone)]
pub struct ReputationResult {
    pub crawler: Option<CrawlerFamily>,
    /// The crawler claim checked out against its published IP ranges.
    pub verified_by_ip_range: bool,
    /// A crawler UA from an IP outside the family's ranges.
    pub spoofed: bool,
    /// Proxy/VPN confidence in [0, 100].
    pub proxy_score: u8,
    pub is_vpn_proxy: bool,
    pub signals: Vec<String>,
}

impl ReputationResult {
    fn neutral() -> Self {
        Self {
            crawler: None,
            verified_by_ip_range: false,
            spoofed: false,
            proxy_score: 0,
            is_vpn_proxy: false,
            signals: Vec::new(),
        }
    }
}

// Contribution weights for the proxy/VPN confidence score.
const CONFIRMED_PROXY: f64 = 30.0;
const TYPE_VPN: f64 = 20.0;
const TYPE_SOCKS: f64 = 15.0;
const TYPE_HTTP: f64 = 10.0;
const SUSPICIOUS_PORT: f64 = 10.0;
const SOURCE_RISK_SCALE: f64 = 0.2;
const HOSTING_PROVIDER: f64 = 15.0;
const COMMERCIAL_VPN: f64 = 25.0;
const HOME_COUNTRY_REDUCTION: f64 = -10.0;
const HOME_RESIDENTIAL_REDUCTION: f64 = -15.0;
const FOREIGN_COUNTRY: f64 = 5.0;
const FORWARDED_FOR: f64 = 8.0;
const FORWARDED_FOR_MULTI_HOP: f64 = 7.0;
const REAL_IP: f64 = 5.0;
const VIA_HEADER: f64 = 8.0;
const PROXY_HEADER: f64 = 10.0;

const SUSPICIOUS_PORTS: &[u16] = &[1080, 3128, 4145, 8000, 8080, 8081, 8888, 9050];

const HOSTING_KEYWORDS: &[&str] = &[
    "hosting", "datacenter", "data center", "cloud", "vps", "dedicated",
    "colocation", "digitalocean", "amazon", "aws", "ovh", "hetzner",
    "linode", "vultr", "azure", "google",
];

const VPN_PROVIDERS: &[&str] = &[
    "nordvpn", "expressvpn", "surfshark", "cyberghost",
    "private internet access", "mullvad", "protonvpn", "ipvanish",
    "purevpn", "windscribe", "tunnelbear", "hide.me",
];

/// IP reputation analyzer: crawler range verification, external proxy/VPN
/// query, and proxy-header inspection.
///
/// Degrades gracefully by contract — a dead or slow reputation source
/// costs a `lookup_failed` tag, never the classification.
pub struct ReputationAnalyzer {
    directory: CrawlerDirectory,
    source: Option<Arc<dyn ReputationSource>>,
    config: ReputationConfig,
}

impl ReputationAnalyzer {
    pub fn new(config: &ReputationConfig) -> Self {
        let source: Option<Arc<dyn ReputationSource>> = if config.enabled {
            Some(Arc::new(HttpReputationSource::new(&config.endpoint)))
        } else {
            None
        };
        Self {
            directory: CrawlerDirectory::new(),
            source,
            config: config.clone(),
        }
    }

    /// Build with an injected source (tests, alternate providers).
    pub fn with_source(config: &ReputationConfig, source: Arc<dyn ReputationSource>) -> Self {
        Self {
            directory: CrawlerDirectory::new(),
            source: Some(source),
            config: config.clone(),
        }
    }

    /// Evaluate the request's IP and headers. `claimed` is the crawler
    /// family matched by user-agent analysis, if any.
    pub async fn evaluate(
        &self,
        signal: &RequestSignal,
        claimed: Option<CrawlerFamily>,
    ) -> ReputationResult {
        let mut result = ReputationResult::neutral();
        result.crawler = claimed;

        if let Some(family) = claimed {
            if self.directory.verify(family, signal.ip_address) {
                debug!(ip = %signal.ip_address, crawler = %family, "Crawler verified by IP range");
                result.verified_by_ip_range = true;
                // A verified crawler skips the proxy scoring entirely.
                return result;
            }
            debug!(ip = %signal.ip_address, crawler = %family, "Crawler UA outside published ranges");
            result.spoofed = true;
            result.signals.push("spoofed_bot".to_string());
        }

        let mut score: f64 = 0.0;

        if let Some(source) = &self.source {
            let timeout = Duration::from_millis(self.config.timeout_millis);
            match tokio::time::timeout(timeout, source.query(signal.ip_address)).await {
                Ok(Ok(attrs)) => {
                    score += self.translate(&attrs, &mut result.signals);
                }
                Ok(Err(e)) => {
                    warn!(ip = %signal.ip_address, error = %e, "Reputation lookup failed");
                    result.signals.push("lookup_failed".to_string());
                }
                Err(_) => {
                    warn!(ip = %signal.ip_address, "Reputation lookup timed out");
                    result.signals.push("lookup_failed".to_string());
                }
            }
        }

        score += inspect_proxy_headers(&signal.headers, &mut result.signals);

        result.proxy_score = score.clamp(0.0, 100.0).round() as u8;
        result.is_vpn_proxy = result.proxy_score >= self.config.vpn_proxy_threshold;
        result
    }

    /// Translate source attributes into weighted contributions.
    fn translate(&self, attrs: &ReputationAttributes, signals: &mut Vec<String>) -> f64 {
        let mut score = 0.0;

        if attrs.proxy == Some(true) {
            score += CONFIRMED_PROXY;
            signals.push("confirmed_proxy".to_string());

            if let Some(kind) = &attrs.kind {
                let kind_lower = kind.to_lowercase();
                if kind_lower.contains("vpn") {
                    score += TYPE_VPN;
                    signals.push("proxy_type:vpn".to_string());
                } else if kind_lower.contains("socks") {
                    score += TYPE_SOCKS;
                    signals.push("proxy_type:socks".to_string());
                } else if kind_lower.contains("http") {
                    score += TYPE_HTTP;
                    signals.push("proxy_type:http".to_string());
                }
            }
        }

        if let Some(port) = attrs.port {
            if SUSPICIOUS_PORTS.contains(&port) {
                score += SUSPICIOUS_PORT;
                signals.push(format!("suspicious_port:{}", port));
            }
        }

        if let Some(risk) = attrs.risk {
            let risk = risk.clamp(0.0, 100.0);
            if risk >= 1.0 {
                score += risk * SOURCE_RISK_SCALE;
                signals.push(format!("source_risk:{:.0}", risk));
            }
        }

        if let Some(provider) = &attrs.provider {
            let provider_lower = provider.to_lowercase();

            if let Some(vpn) = VPN_PROVIDERS
                .iter()
                .find(|name| provider_lower.contains(*name))
            {
                score += COMMERCIAL_VPN;
                signals.push(format!("commercial_vpn:{}", vpn));
            } else if HOSTING_KEYWORDS
                .iter()
                .any(|kw| provider_lower.contains(kw))
            {
                score += HOSTING_PROVIDER;
                signals.push("hosting_provider".to_string());
            }

            if let Some(country) = &attrs.country {
                if country.eq_ignore_ascii_case(&self.config.home_country) {
                    let residential = self
                        .config
                        .residential_isps
                        .iter()
                        .any(|isp| provider_lower.contains(&isp.to_lowercase()));
                    if residential {
                        score += HOME_RESIDENTIAL_REDUCTION;
                    } else {
                        score += HOME_COUNTRY_REDUCTION;
                    }
                } else {
                    score += FOREIGN_COUNTRY;
                    signals.push(format!("foreign_country:{}", country.to_uppercase()));
                }
            }
        } else if let Some(country) = &attrs.country {
            if country.eq_ignore_ascii_case(&self.config.home_country) {
                score += HOME_COUNTRY_REDUCTION;
            } else {
                score += FOREIGN_COUNTRY;
                signals.push(format!("foreign_country:{}", country.to_uppercase()));
            }
        }

        score
    }
}

/// Standard proxy-indicating headers carry a smaller supplementary
/// penalty; a forwarded-for chain with multiple hops weighs extra.
fn inspect_proxy_headers(headers: &HashMap<String, String>, signals: &mut Vec<String>) -> f64 {
    let mut score = 0.0;

    if let Some(value) = header_get(headers, "x-forwarded-for") {
        score += FORWARDED_FOR;
        signals.push("forwarded_for_header".to_string());
        if value.contains(',') {
            score += FORWARDED_FOR_MULTI_HOP;
            signals.push("forwarded_for_multiple_hops".to_string());
        }
    }

    if header_get(headers, "x-real-ip").is_some() {
        score += REAL_IP;
        signals.push("real_ip_header".to_string());
    }

    if header_get(headers, "via").is_some() {
        score += VIA_HEADER;
        signals.push("via_header".to_string());
    }

    if header_get(headers, "proxy-connection").is_some()
        || header_get(headers, "x-proxy-id").is_some()
    {
        score += PROXY_HEADER;
        signals.push("proxy_header".to_string());
    }

    score
}

fn header_get<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
