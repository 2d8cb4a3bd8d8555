use crate::models::signal::BehaviorData;

/// Outcome of behavioral analysis. `score` is human-likeness in [0, 1]:
/// 1.0 reads as a perfect human, 0.0 as fully mechanical or absent.
#[derive(Debug, Clone)]
pub struct BehaviorAnalysis {
    pub score: f64,
    pub signals: Vec<String>,
}

// Penalty weights subtracted from the perfect-human baseline.
const NO_MOUSE_MOVEMENT: f64 = 0.25;
const NO_CLICKS: f64 = 0.10;
const NO_KEYSTROKES: f64 = 0.10;
const NO_SCROLLING: f64 = 0.10;
const RAPID_CLICKING: f64 = 0.20;
const LOW_MOUSE_VARIATION: f64 = 0.20;
const LINEAR_MOUSE_PATH: f64 = 0.20;
const NO_NATURAL_PAUSES: f64 = 0.15;
const MECHANICAL_SCROLLING: f64 = 0.15;
const UNIFORM_CLICK_INTERVALS: f64 = 0.20;

const MIN_HUMAN_CLICK_MS: f64 = 100.0;
const MIN_MOUSE_VARIATION: f64 = 5.0;
const NATURAL_PAUSE_MS: f64 = 100.0;
/// Straight-line distance / path length above this reads as a scripted
/// point-to-point move rather than a human hand.
const LINEARITY_RATIO: f64 = 0.98;

/// Analyze the behavioral telemetry bundle.
///
/// Missing bundle scores 0.0 with a `no_behavior_data` signal — a client
/// that never produced telemetry is indistinguishable from one that
/// stripped the script. Fields that failed lenient decoding are `None`
/// and are skipped (they contribute nothing, per the malformed-signal
/// policy).
pub fn analyze(data: Option<&BehaviorData>) -> BehaviorAnalysis {
    let data = match data {
        Some(d) => d,
        None => {
            return BehaviorAnalysis {
                score: 0.0,
                signals: vec!["no_behavior_data".to_string()],
            }
        }
    };

    let mut score: f64 = 1.0;
    let mut signals: Vec<String> = Vec::new();

    if data.mouse_movements == Some(0) {
        score -= NO_MOUSE_MOVEMENT;
        signals.push("no_mouse_movement".to_string());
    }

    if data.clicks == Some(0) {
        score -= NO_CLICKS;
        signals.push("no_clicks".to_string());
    }

    if data.keystrokes == Some(0) {
        score -= NO_KEYSTROKES;
        signals.push("no_keystrokes".to_string());
    }

    if data.scroll_events == Some(0) {
        score -= NO_SCROLLING;
        signals.push("no_scrolling".to_string());
    }

    if let Some(speed) = data.avg_click_speed_ms {
        if speed > 0.0 && speed < MIN_HUMAN_CLICK_MS && data.clicks.unwrap_or(0) > 0 {
            score -= RAPID_CLICKING;
            signals.push("rapid_clicking".to_string());
        }
    }

    if let Some(variation) = data.mouse_variation {
        if variation < MIN_MOUSE_VARIATION && data.mouse_movements.unwrap_or(0) > 0 {
            score -= LOW_MOUSE_VARIATION;
            signals.push("low_mouse_variation".to_string());
        }
    }

    if let Some(points) = data.mouse_points.as_deref() {
        if points.len() >= 3 && path_linearity(points) > LINEARITY_RATIO {
            score -= LINEAR_MOUSE_PATH;
            signals.push("linear_mouse_path".to_string());
        }
        if points.len() >= 5 && !has_natural_pause(points) {
            score -= NO_NATURAL_PAUSES;
            signals.push("no_natural_pauses".to_string());
        }
    }

    if let Some(deltas) = data.scroll_pattern.as_deref() {
        if deltas.len() >= 3 && is_mechanical_scroll(deltas) {
            score -= MECHANICAL_SCROLLING;
            signals.push("mechanical_scrolling".to_string());
        }
    }

    if let Some(intervals) = data.click_intervals.as_deref() {
        if intervals.len() >= 3 && is_rapid_uniform(intervals) {
            score -= UNIFORM_CLICK_INTERVALS;
            signals.push("uniform_click_intervals".to_string());
        }
    }

    BehaviorAnalysis {
        score: score.clamp(0.0, 1.0),
        signals,
    }
}

/// Ratio of straight-line distance to traveled path length.
fn path_linearity(points: &[crate::models::signal::MousePoint]) -> f64 {
    let mut path_len = 0.0;
    for pair in points.windows(2) {
        path_len += ((pair[1].x - pair[0].x).powi(2) + (pair[1].y - pair[0].y).powi(2)).sqrt();
    }
    if path_len <= f64::EPSILON {
        // Zero travel with multiple samples is as mechanical as it gets.
        return 1.0;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let direct = ((last.x - first.x).powi(2) + (last.y - first.y).powi(2)).sqrt();
    direct / path_len
}

fn has_natural_pause(points: &[crate::models::signal::MousePoint]) -> bool {
    points
        .windows(2)
        .any(|pair| pair[1].t - pair[0].t > NATURAL_PAUSE_MS)
}

/// Every delta (near-)identical reads as a scripted scroll loop.
fn is_mechanical_scroll(deltas: &[f64]) -> bool {
    let first = deltas[0];
    deltas.iter().all(|d| (d - first).abs() < 0.5)
}

fn is_rapid_uniform(intervals: &[f64]) -> bool {
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    if mean >= 200.0 {
        return false;
    }
    let variance = intervals
        .iter()
        .map(|i| (i - mean).powi(2))
        .sum::<f64>()
        / intervals.len() as f64;
    variance.sqrt() < 20.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signal::MousePoint;

    fn human_bundle() -> BehaviorData {
        BehaviorData {
            mouse_movements: Some(120),
            clicks: Some(4),
            keystrokes: Some(25),
            scroll_events: Some(6),
            avg_click_speed_ms: Some(240.0),
            mouse_variation: Some(38.5),
            scroll_pattern: Some(vec![110.0, 64.0, 131.0, 87.0]),
            time_on_page: Some(42.0),
            page_interactions: Some(9),
            mouse_points: Some(vec![
                MousePoint { x: 10.0, y: 10.0, t: 0.0 },
                MousePoint { x: 45.0, y: 80.0, t: 130.0 },
                MousePoint { x: 30.0, y: 160.0, t: 410.0 },
                MousePoint { x: 90.0, y: 140.0, t: 700.0 },
                MousePoint { x: 160.0, y: 240.0, t: 1200.0 },
            ]),
            click_intervals: Some(vec![850.0, 1420.0, 610.0]),
        }
    }

    #[test]
    fn missing_bundle_scores_zero() {
        let analysis = analyze(None);
        assert_eq!(analysis.score, 0.0);
        assert_eq!(analysis.signals, vec!["no_behavior_data".to_string()]);
    }

    #[test]
    fn human_telemetry_scores_high() {
        let analysis = analyze(Some(&human_bundle()));
        assert!(analysis.score > 0.9, "score was {}", analysis.score);
        assert!(analysis.signals.is_empty());
    }

    #[test]
    fn dead_telemetry_collects_every_zero_signal() {
        let data = BehaviorData {
            mouse_movements: Some(0),
            clicks: Some(0),
            keystrokes: Some(0),
            scroll_events: Some(0),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(analysis.score < 0.5);
        for signal in ["no_mouse_movement", "no_clicks", "no_keystrokes", "no_scrolling"] {
            assert!(analysis.signals.contains(&signal.to_string()), "{}", signal);
        }
    }

    #[test]
    fn malformed_fields_contribute_nothing() {
        // Lenient decoding turns wrong-typed fields into None; None must
        // not be treated as zero.
        let data = BehaviorData {
            mouse_movements: None,
            clicks: Some(3),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(!analysis.signals.contains(&"no_mouse_movement".to_string()));
    }

    #[test]
    fn rapid_clicking_flagged() {
        let data = BehaviorData {
            clicks: Some(12),
            avg_click_speed_ms: Some(35.0),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(analysis.signals.contains(&"rapid_clicking".to_string()));
    }

    #[test]
    fn linear_path_and_missing_pauses_flagged() {
        let points: Vec<MousePoint> = (0..8)
            .map(|i| MousePoint {
                x: i as f64 * 25.0,
                y: i as f64 * 25.0,
                t: i as f64 * 40.0,
            })
            .collect();
        let data = BehaviorData {
            mouse_points: Some(points),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(analysis.signals.contains(&"linear_mouse_path".to_string()));
        assert!(analysis.signals.contains(&"no_natural_pauses".to_string()));
    }

    #[test]
    fn mechanical_scroll_and_uniform_clicks_flagged() {
        let data = BehaviorData {
            scroll_pattern: Some(vec![100.0, 100.0, 100.0, 100.0]),
            click_intervals: Some(vec![50.0, 52.0, 51.0, 50.0]),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(analysis.signals.contains(&"mechanical_scrolling".to_string()));
        assert!(analysis.signals.contains(&"uniform_click_intervals".to_string()));
    }

    #[test]
    fn score_is_clamped() {
        let points: Vec<MousePoint> = (0..8)
            .map(|i| MousePoint { x: i as f64, y: i as f64, t: i as f64 * 10.0 })
            .collect();
        let data = BehaviorData {
            mouse_movements: Some(0),
            clicks: Some(0),
            keystrokes: Some(0),
            scroll_events: Some(0),
            avg_click_speed_ms: Some(20.0),
            mouse_variation: Some(0.1),
            scroll_pattern: Some(vec![50.0, 50.0, 50.0]),
            mouse_points: Some(points),
            click_intervals: Some(vec![40.0, 40.0, 40.0]),
            ..Default::default()
        };
        let analysis = analyze(Some(&data));
        assert!(analysis.score >= 0.0);
    }
}
