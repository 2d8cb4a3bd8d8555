use std::net::IpAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Deserializer};

/// Per-IP attributes returned by the external reputation source.
///
/// Every field is optional; sources differ in coverage and the analyzer
/// must tolerate any subset being absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReputationAttributes {
    /// Whether the source considers this IP a proxy. Accepts booleans or
    /// the "yes"/"no" strings some providers return.
    #[serde(default, deserialize_with = "lenient_yes_no")]
    pub proxy: Option<bool>,

    /// Proxy sub-type: "vpn", "socks", "http", ...
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Proxy service port, where known.
    #[serde(default)]
    pub port: Option<u16>,

    /// The source's own 0-100 risk estimate.
    #[serde(default, deserialize_with = "lenient_number")]
    pub risk: Option<f64>,

    /// ASN / organization / provider name string.
    #[serde(default)]
    pub provider: Option<String>,

    /// ISO country code of the IP.
    #[serde(default)]
    pub country: Option<String>,
}

fn lenient_yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => Some(b),
        serde_json::Value::String(s) => match s.to_lowercase().as_str() {
            "yes" | "true" | "1" => Some(true),
            "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Seam for the external reputation query, so tests can inject static,
/// failing, or hanging sources.
pub trait ReputationSource: Send + Sync {
    fn query(&self, ip: IpAddr) -> BoxFuture<'_, Result<ReputationAttributes>>;
}

/// Production source: one HTTP GET per IP against the configured endpoint.
///
/// The analyzer wraps every call in a timeout, so this client only needs
/// to be honest about errors, not fast to give up.
pub struct HttpReputationSource {
    client: HyperClient<HttpConnector, Full<Bytes>>,
    endpoint: String,
}

impl HttpReputationSource {
    pub fn new(endpoint: &str) -> Self {
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build_http();
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

impl ReputationSource for HttpReputationSource {
    fn query(&self, ip: IpAddr) -> BoxFuture<'_, Result<ReputationAttributes>> {
        let url = format!("{}/{}", self.endpoint, ip);
        Box::pin(async move {
            let req = hyper::Request::builder()
                .method(hyper::Method::GET)
                .uri(&url)
                .header("Accept", "application/json")
                .body(Full::new(Bytes::new()))
                .context("Failed to build reputation request")?;

            let resp = self
                .client
                .request(req)
                .await
                .with_context(|| format!("Reputation request to {} failed", url))?;

            let status = resp.status();
            if !status.is_success() {
                bail!("Reputation source returned {}", status);
            }

            let body = resp
                .into_body()
                .collect()
                .await
                .context("Failed to read reputation response body")?
                .to_bytes();

            let attrs: ReputationAttributes = serde_json::from_slice(&body)
                .context("Malformed reputation response payload")?;
            Ok(attrs)
        })
    }
}
