use crate::common::{Detection, Severity};

/// Detections below this confidence are discarded.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const MAJOR_THRESHOLD: f64 = 0.8;
pub const CRITICAL_THRESHOLD: f64 = 0.9;

/// Severity band for a confidence, or `None` if it does not survive filtering.
/// NaN never survives.
pub fn classify(confidence: f64) -> Option<Severity> {
    if confidence >= CRITICAL_THRESHOLD {
        Some(Severity::Critical)
    } else if confidence >= MAJOR_THRESHOLD {
        Some(Severity::Major)
    } else if confidence >= CONFIDENCE_THRESHOLD {
        Some(Severity::Minor)
    } else {
        None
    }
}

pub fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Minor => 0.1,
        Severity::Major => 0.3,
        Severity::Critical => 0.6,
    }
}

/// Quality score over classified detections, clamped to `[0, 1]`.
pub fn quality_score(detections: &[Detection]) -> f64 {
    if detections.is_empty() {
        return 1.0;
    }
    let penalty: f64 = detections
        .iter()
        .filter_map(|d| d.severity)
        .map(severity_weight)
        .sum();
    (1.0 - penalty).max(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub surviving: Vec<Detection>,
    pub quality_score: f64,
}

/// Filters, classifies and scores the raw detections of one unit.
pub fn score(detections: Vec<Detection>) -> Scored {
    let surviving: Vec<Detection> = detections
        .into_iter()
        .filter_map(|d| classify(d.confidence).map(|severity| d.with_severity(severity)))
        .collect();
    let quality_score = quality_score(&surviving);

    Scored {
        surviving,
        quality_score,
    }
}
