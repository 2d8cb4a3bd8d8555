use std::collections::HashMap;

use tracing::debug;

use crate::reputation::crawler::{self, CrawlerFamily};

/// Outcome of user-agent analysis. `score` is a penalty in [0, 1].
#[derive(Debug, Clone)]
pub struct UaAnalysis {
    pub score: f64,
    pub anomalies: Vec<String>,
    /// Normalized Shannon entropy of the character distribution.
    pub entropy: f64,
    /// Set when the UA matches a known legitimate crawler signature.
    /// The claim still needs IP-range verification before it is trusted.
    pub crawler: Option<CrawlerFamily>,
}

/// Automation tool signatures with an explicit product name. Matching one
/// of these is a stronger signal than a generic "bot" substring.
const AUTOMATION_TOOLS: &[(&str, &str)] = &[
    ("headlesschrome", "headless-chrome"),
    ("phantomjs", "phantomjs"),
    ("selenium", "selenium"),
    ("webdriver", "webdriver"),
    ("puppeteer", "puppeteer"),
    ("playwright", "playwright"),
    ("python-requests", "python-requests"),
    ("python-urllib", "python-urllib"),
    ("aiohttp", "aiohttp"),
    ("curl/", "curl"),
    ("wget/", "wget"),
    ("go-http-client", "go-http-client"),
    ("okhttp", "okhttp"),
    ("apache-httpclient", "apache-httpclient"),
    ("java/", "java-http"),
    ("libwww-perl", "libwww-perl"),
    ("scrapy", "scrapy"),
    ("node-fetch", "node-fetch"),
    ("axios/", "axios"),
    ("httpclient", "httpclient"),
];

const GENERIC_BOT_KEYWORDS: &[&str] = &["bot", "crawler", "spider", "scraper", "headless"];

/// Penalty tiers. Explicit tool name > generic keyword; a missing UA is
/// the maximum tier outright.
const EXPLICIT_TOOL_PENALTY: f64 = 0.95;
const GENERIC_KEYWORD_PENALTY: f64 = 0.7;
const LOW_ENTROPY_PENALTY: f64 = 0.4;
const LENGTH_ANOMALY_PENALTY: f64 = 0.15;
const MISSING_BROWSER_TOKENS_PENALTY: f64 = 0.2;
const CRAWLER_CLAIM_SCORE: f64 = 0.05;

const LOW_ENTROPY_THRESHOLD: f64 = 0.3;
const MIN_UA_LENGTH: usize = 20;
const MAX_UA_LENGTH: usize = 500;

/// Analyze a possibly-absent user agent string.
///
/// Never fails: a missing or empty UA is itself the strongest signal this
/// extractor can emit.
pub fn analyze(ua: Option<&str>) -> UaAnalysis {
    let ua = match ua {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return UaAnalysis {
                score: 1.0,
                anomalies: vec!["missing_user_agent".to_string()],
                entropy: 0.0,
                crawler: None,
            }
        }
    };

    let entropy = normalized_entropy(ua);
    let lower = ua.to_lowercase();

    // A known crawler signature short-circuits the penalty checks. The
    // reputation step decides whether the claim is verified or spoofed.
    if let Some(family) = crawler::match_user_agent(&lower) {
        debug!(crawler = %family, "User agent matches crawler signature");
        return UaAnalysis {
            score: CRAWLER_CLAIM_SCORE,
            anomalies: Vec::new(),
            entropy,
            crawler: Some(family),
        };
    }

    let mut score: f64 = 0.0;
    let mut anomalies: Vec<String> = Vec::new();

    let mut matched_tool = false;
    for (token, name) in AUTOMATION_TOOLS {
        if lower.contains(token) {
            score += EXPLICIT_TOOL_PENALTY;
            anomalies.push(format!("automation_tool:{}", name));
            matched_tool = true;
            break;
        }
    }

    if !matched_tool {
        for keyword in GENERIC_BOT_KEYWORDS {
            if lower.contains(keyword) {
                score += GENERIC_KEYWORD_PENALTY;
                anomalies.push(format!("generic_bot_keyword:{}", keyword));
                matched_tool = true;
                break;
            }
        }
    }

    if entropy < LOW_ENTROPY_THRESHOLD {
        score += LOW_ENTROPY_PENALTY;
        anomalies.push("low_entropy".to_string());
    }

    if ua.len() < MIN_UA_LENGTH {
        score += LENGTH_ANOMALY_PENALTY;
        anomalies.push("short_user_agent".to_string());
    } else if ua.len() > MAX_UA_LENGTH {
        score += LENGTH_ANOMALY_PENALTY;
        anomalies.push("long_user_agent".to_string());
    }

    if !matched_tool && !is_browser_user_agent(&lower) {
        score += MISSING_BROWSER_TOKENS_PENALTY;
        anomalies.push("missing_browser_tokens".to_string());
    }

    UaAnalysis {
        score: score.clamp(0.0, 1.0),
        anomalies,
        entropy,
        crawler: None,
    }
}

/// Shannon entropy of the character distribution, divided by log2 of the
/// string length so the result lands in [0, 1] for typical strings.
fn normalized_entropy(s: &str) -> f64 {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    if len < 2 {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in &chars {
        *counts.entry(*c).or_insert(0) += 1;
    }

    let len_f = len as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / len_f;
            -p * p.log2()
        })
        .sum();

    entropy / len_f.log2()
}

fn is_browser_user_agent(lower: &str) -> bool {
    lower.contains("mozilla/5.0")
        && (lower.contains("applewebkit")
            || lower.contains("gecko")
            || lower.contains("trident")
            || lower.contains("chrome")
            || lower.contains("firefox")
            || lower.contains("safari"))
}
