use crate::models::signal::DeviceFingerprint;

/// Outcome of device-fingerprint analysis. `score` is a penalty in [0, 1].
#[derive(Debug, Clone)]
pub struct FingerprintAnalysis {
    pub score: f64,
    pub anomalies: Vec<String>,
}

const WEBDRIVER_FLAG: f64 = 0.9;
const PLUGIN_ANOMALY: f64 = 0.2;
const MISSING_HARDWARE_PROFILE: f64 = 0.15;
const VIEWPORT_EXCEEDS_SCREEN: f64 = 0.25;
const LOCALE_MISMATCH: f64 = 0.15;

const MAX_PLAUSIBLE_PLUGINS: u64 = 30;

/// Languages whose real-user population overwhelmingly reports a timezone
/// in the listed regions. Deliberately short: only high-confidence pairs,
/// since travelers and VPN users make locale checks noisy.
const EXPECTED_TZ_REGIONS: &[(&str, &[&str])] = &[
    ("ru", &["Europe/", "Asia/"]),
    ("zh", &["Asia/", "Australia/"]),
    ("ja", &["Asia/"]),
    ("ko", &["Asia/"]),
];

/// Analyze the device fingerprint, where available.
///
/// An absent fingerprint contributes nothing here — the behavioral
/// extractor already penalizes clients that produced no telemetry at all.
pub fn analyze(device: Option<&DeviceFingerprint>) -> FingerprintAnalysis {
    let device = match device {
        Some(d) => d,
        None => {
            return FingerprintAnalysis {
                score: 0.0,
                anomalies: Vec::new(),
            }
        }
    };

    let mut score: f64 = 0.0;
    let mut anomalies: Vec<String> = Vec::new();

    if device.webdriver == Some(true) {
        score += WEBDRIVER_FLAG;
        anomalies.push("webdriver_flag".to_string());
    }

    match device.plugin_count {
        Some(0) => {
            score += PLUGIN_ANOMALY;
            anomalies.push("no_plugins".to_string());
        }
        Some(n) if n > MAX_PLAUSIBLE_PLUGINS => {
            score += PLUGIN_ANOMALY;
            anomalies.push("excessive_plugins".to_string());
        }
        _ => {}
    }

    if device.device_memory.is_none() && device.hardware_concurrency.is_none() {
        score += MISSING_HARDWARE_PROFILE;
        anomalies.push("missing_hardware_profile".to_string());
    }

    if viewport_exceeds_screen(device) {
        score += VIEWPORT_EXCEEDS_SCREEN;
        anomalies.push("viewport_exceeds_screen".to_string());
    }

    if locale_mismatch(device) {
        score += LOCALE_MISMATCH;
        anomalies.push("locale_mismatch".to_string());
    }

    FingerprintAnalysis {
        score: score.clamp(0.0, 1.0),
        anomalies,
    }
}

fn viewport_exceeds_screen(device: &DeviceFingerprint) -> bool {
    let wider = matches!(
        (device.viewport_width, device.screen_width),
        (Some(vw), Some(sw)) if vw > sw
    );
    let taller = matches!(
        (device.viewport_height, device.screen_height),
        (Some(vh), Some(sh)) if vh > sh
    );
    wider || taller
}

fn locale_mismatch(device: &DeviceFingerprint) -> bool {
    let (tz, lang) = match (&device.timezone, &device.language) {
        (Some(tz), Some(lang)) => (tz.as_str(), lang.as_str()),
        _ => return false,
    };

    // UTC as the reported zone is the classic headless-environment default.
    if tz == "UTC" || tz == "Etc/UTC" {
        return true;
    }

    let primary = lang.split(['-', '_']).next().unwrap_or("").to_lowercase();
    for (expected_lang, regions) in EXPECTED_TZ_REGIONS {
        if primary == *expected_lang {
            return !regions.iter().any(|region| tz.starts_with(region));
        }
    }

    false
}
