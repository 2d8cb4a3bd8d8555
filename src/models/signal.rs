use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer};

/// One inbound analysis call: everything the client SDK and the HTTP layer
/// collected about a single request.
///
/// Constructed once per call and never persisted by the engine itself.
/// Every telemetry field is optional — missing data is a signal, not an
/// error (the extractors turn absence into sub-scores).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSignal {
    pub session_id: String,

    #[serde(default)]
    pub user_agent: Option<String>,

    pub ip_address: IpAddr,

    /// Lower-cased request header names -> values.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default, rename = "behaviorData")]
    pub behavior: Option<BehaviorData>,

    #[serde(default, rename = "deviceFingerprint")]
    pub device: Option<DeviceFingerprint>,

    #[serde(default)]
    pub country_code: Option<String>,
}

impl RequestSignal {
    pub fn new(session_id: impl Into<String>, ip_address: IpAddr) -> Self {
        Self {
            session_id: session_id.into(),
            user_agent: None,
            ip_address,
            headers: HashMap::new(),
            behavior: None,
            device: None,
            country_code: None,
        }
    }
}

/// A single mouse movement sample: page coordinates plus milliseconds
/// since page load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MousePoint {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

/// Behavioral telemetry reported by the embedded client script.
///
/// Deserialization is deliberately lenient: a wrong-typed field (e.g.
/// `"mouseMovements": "abc"`) becomes `None` and contributes nothing,
/// so one corrupted field never aborts classification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorData {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub mouse_movements: Option<u64>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: Option<u64>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub keystrokes: Option<u64>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub scroll_events: Option<u64>,

    /// Average delay between mousedown and mouseup, in milliseconds.
    #[serde(default, rename = "avgClickSpeed", deserialize_with = "lenient_f64")]
    pub avg_click_speed_ms: Option<f64>,

    /// Variance of mouse movement deltas, as computed by the client.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mouse_variation: Option<f64>,

    /// Raw scroll deltas in order of occurrence.
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub scroll_pattern: Option<Vec<f64>>,

    /// Seconds spent on the page before the beacon fired.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_on_page: Option<f64>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub page_interactions: Option<u64>,

    /// Sampled mouse path, used for linearity and natural-pause checks.
    #[serde(default, deserialize_with = "lenient_mouse_points")]
    pub mouse_points: Option<Vec<MousePoint>>,

    /// Milliseconds between consecutive clicks.
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub click_intervals: Option<Vec<f64>>,
}

/// Device descriptors reported by the client script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFingerprint {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub webdriver: Option<bool>,

    /// Number of navigator plugins. Accepts either a list or a count.
    #[serde(default, rename = "plugins", deserialize_with = "lenient_count")]
    pub plugin_count: Option<u64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub device_memory: Option<f64>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub hardware_concurrency: Option<u64>,

    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub screen_width: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub screen_height: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub viewport_width: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub viewport_height: Option<f64>,
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------
// The client script runs in hostile territory; bots tamper with the payload.
// Wrong-typed fields decode to None instead of failing the whole signal.

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    // Some clients serialize counts as floats ("clicks": 4.0); an integral
    // non-negative float is still a valid count.
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64)
    }))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|f| f.is_finite()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

fn lenient_f64_vec<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_f64())
            .filter(|f| f.is_finite())
            .collect()
    }))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => Some(items.len() as u64),
        other => other.as_u64(),
    })
}

fn lenient_mouse_points<'de, D>(deserializer: D) -> Result<Option<Vec<MousePoint>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| {
                let obj = v.as_object()?;
                Some(MousePoint {
                    x: obj.get("x")?.as_f64()?,
                    y: obj.get("y")?.as_f64()?,
                    t: obj.get("t")?.as_f64()?,
                })
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_signal() {
        let raw = serde_json::json!({
            "sessionId": "s-1",
            "ipAddress": "203.0.113.7",
            "userAgent": "Mozilla/5.0",
            "headers": {"accept": "text/html"},
            "behaviorData": {
                "mouseMovements": 42,
                "clicks": 3,
                "avgClickSpeed": 220.5,
                "scrollPattern": [120.0, 80.0, 95.0]
            },
            "deviceFingerprint": {
                "webdriver": false,
                "plugins": ["pdf", "widevine"],
                "hardwareConcurrency": 8
            },
            "countryCode": "DE"
        });

        let signal: RequestSignal = serde_json::from_value(raw).unwrap();
        assert_eq!(signal.session_id, "s-1");
        let behavior = signal.behavior.unwrap();
        assert_eq!(behavior.mouse_movements, Some(42));
        assert_eq!(behavior.avg_click_speed_ms, Some(220.5));
        assert_eq!(signal.device.unwrap().plugin_count, Some(2));
    }

    #[test]
    fn malformed_fields_decode_to_none() {
        let raw = serde_json::json!({
            "sessionId": "s-2",
            "ipAddress": "198.51.100.4",
            "behaviorData": {
                "mouseMovements": "abc",
                "clicks": {"nested": true},
                "avgClickSpeed": "fast",
                "scrollPattern": "not-a-list"
            },
            "deviceFingerprint": {
                "webdriver": "yes",
                "plugins": 7
            }
        });

        let signal: RequestSignal = serde_json::from_value(raw).unwrap();
        let behavior = signal.behavior.unwrap();
        assert_eq!(behavior.mouse_movements, None);
        assert_eq!(behavior.clicks, None);
        assert_eq!(behavior.avg_click_speed_ms, None);
        assert_eq!(behavior.scroll_pattern, None);

        let device = signal.device.unwrap();
        assert_eq!(device.webdriver, None);
        assert_eq!(device.plugin_count, Some(7));
    }

    #[test]
    fn float_counts_decode_when_integral() {
        let raw = serde_json::json!({
            "sessionId": "s-4",
            "ipAddress": "198.51.100.8",
            "behaviorData": {
                "clicks": 4.0,
                "keystrokes": 3.5,
                "mouseMovements": -2.0
            }
        });

        let signal: RequestSignal = serde_json::from_value(raw).unwrap();
        let behavior = signal.behavior.unwrap();
        assert_eq!(behavior.clicks, Some(4));
        assert_eq!(behavior.keystrokes, None);
        assert_eq!(behavior.mouse_movements, None);
    }

    #[test]
    fn missing_optional_sections_are_none() {
        let raw = serde_json::json!({
            "sessionId": "s-3",
            "ipAddress": "192.0.2.1"
        });

        let signal: RequestSignal = serde_json::from_value(raw).unwrap();
        assert!(signal.user_agent.is_none());
        assert!(signal.behavior.is_none());
        assert!(signal.device.is_none());
        assert!(signal.headers.is_empty());
    }
}
