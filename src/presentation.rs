use crate::image_classifier::snapshot::{ClassLabel, Snapshot};
use crate::live_loop::core::LoopState;
use std::fmt;

pub const DEFAULT_THRESHOLD: f32 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    Detected,
    NotDetected,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Detected => "detected",
            DetectionStatus::NotDetected => "not detected",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub class_name: ClassLabel,
    /// 0-100, rounded to two decimals.
    pub percent: f64,
    pub status: DetectionStatus,
}

/// Probability in hundredths of a percent, so 0.8 becomes 8000.
fn hundredths_of_percent(probability: f32) -> i64 {
    (probability as f64 * 10_000.0).round() as i64
}

/// One row per class, in snapshot order.
///
/// A class is detected when its rounded percent is strictly above
/// `threshold * 100`. Only the row is rounded; the threshold is scaled to
/// hundredths of a percent as is, so 80.00% is not detected at 0.80 while
/// 80.01% is.
pub fn adapt(snapshot: &Snapshot, threshold: f32) -> Vec<PredictionView> {
    let threshold = threshold as f64 * 10_000.0;

    snapshot
        .records()
        .iter()
        .map(|record| {
            let hundredths = hundredths_of_percent(record.probability);
            PredictionView {
                class_name: record.class_name.clone(),
                percent: hundredths as f64 / 100.0,
                status: if hundredths as f64 > threshold {
                    DetectionStatus::Detected
                } else {
                    DetectionStatus::NotDetected
                },
            }
        })
        .collect()
}

/// Everything a display needs to draw one frame of the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayView {
    pub loop_state: LoopState,
    pub rows: Vec<PredictionView>,
    pub top_class: Option<ClassLabel>,
}

impl DisplayView {
    pub fn new(loop_state: LoopState, snapshot: Option<&Snapshot>, threshold: f32) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                loop_state,
                rows: adapt(snapshot, threshold),
                top_class: Some(snapshot.top_record().class_name.clone()),
            },
            None => Self {
                loop_state,
                rows: vec![],
                top_class: None,
            },
        }
    }

    /// Label of the single Start/Stop toggle.
    pub fn toggle_label(&self) -> &'static str {
        match self.loop_state {
            LoopState::Idle => "Start",
            LoopState::Starting => "Starting...",
            LoopState::Running => "Stop",
            LoopState::Stopping => "Stopping...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_classifier::snapshot::PredictionRecord;

    fn snapshot(probabilities: &[(&str, f32)]) -> Snapshot {
        Snapshot::new(
            probabilities
                .iter()
                .map(|(name, p)| PredictionRecord::new(*name, *p))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_cat_dog_none_scenario() {
        let snapshot = snapshot(&[("cat", 0.10), ("dog", 0.85), ("none", 0.05)]);

        let rows = adapt(&snapshot, DEFAULT_THRESHOLD);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].class_name, "cat");
        assert_eq!(rows[0].percent, 10.0);
        assert_eq!(rows[0].status, DetectionStatus::NotDetected);
        assert_eq!(rows[1].class_name, "dog");
        assert_eq!(rows[1].percent, 85.0);
        assert_eq!(rows[1].status, DetectionStatus::Detected);
        assert_eq!(rows[2].status, DetectionStatus::NotDetected);
    }

    #[test]
    fn test_status_flips_exactly_at_threshold() {
        let rows = adapt(&snapshot(&[("a", 0.80), ("b", 0.20)]), 0.80);
        assert_eq!(rows[0].percent, 80.0);
        assert_eq!(rows[0].status, DetectionStatus::NotDetected);

        let rows = adapt(&snapshot(&[("a", 0.8001), ("b", 0.1999)]), 0.80);
        assert_eq!(rows[0].percent, 80.01);
        assert_eq!(rows[0].status, DetectionStatus::Detected);
    }

    #[test]
    fn test_threshold_between_hundredths_is_not_rounded() {
        let rows = adapt(&snapshot(&[("a", 0.8001), ("b", 0.1999)]), 0.80006);
        assert_eq!(rows[0].percent, 80.01);
        assert_eq!(rows[0].status, DetectionStatus::Detected);

        let rows = adapt(&snapshot(&[("a", 0.8001), ("b", 0.1999)]), 0.80014);
        assert_eq!(rows[0].status, DetectionStatus::NotDetected);
    }

    #[test]
    fn test_percent_rounds_to_two_decimals() {
        let rows = adapt(&snapshot(&[("a", 0.123456), ("b", 0.876544)]), 0.80);

        assert_eq!(rows[0].percent, 12.35);
        assert_eq!(rows[1].percent, 87.65);
    }

    #[test]
    fn test_adapt_is_pure() {
        let snapshot = snapshot(&[("cat", 0.3), ("dog", 0.7)]);

        assert_eq!(adapt(&snapshot, 0.5), adapt(&snapshot, 0.5));
        assert_eq!(adapt(&snapshot, 0.5)[1].status, DetectionStatus::Detected);
        assert_eq!(adapt(&snapshot, 0.8)[1].status, DetectionStatus::NotDetected);
    }

    #[test]
    fn test_display_view_without_snapshot() {
        let view = DisplayView::new(LoopState::Idle, None, DEFAULT_THRESHOLD);

        assert!(view.rows.is_empty());
        assert_eq!(view.top_class, None);
        assert_eq!(view.toggle_label(), "Start");
    }

    #[test]
    fn test_display_view_top_class() {
        let snapshot = snapshot(&[("cat", 0.10), ("dog", 0.85), ("none", 0.05)]);
        let view = DisplayView::new(LoopState::Running, Some(&snapshot), DEFAULT_THRESHOLD);

        assert_eq!(view.top_class.as_deref(), Some("dog"));
        assert_eq!(view.toggle_label(), "Stop");
    }
}
