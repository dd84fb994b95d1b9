use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectCategory {
    Scratch,
    Dent,
    Discoloration,
    Crack,
    Contamination,
}

impl DefectCategory {
    pub const ALL: [DefectCategory; 5] = [
        DefectCategory::Scratch,
        DefectCategory::Dent,
        DefectCategory::Discoloration,
        DefectCategory::Crack,
        DefectCategory::Contamination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefectCategory::Scratch => "scratch",
            DefectCategory::Dent => "dent",
            DefectCategory::Discoloration => "discoloration",
            DefectCategory::Crack => "crack",
            DefectCategory::Contamination => "contamination",
        }
    }
}

impl fmt::Display for DefectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Banding of a surviving detection's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate defect found by the analyze stage.
///
/// `severity` stays `None` until the score stage classifies the detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub id: String,
    pub region: BoundingBox,
    pub confidence: f64,
    pub category: DefectCategory,
    pub severity: Option<Severity>,
}

impl Detection {
    pub fn new(
        id: impl Into<String>,
        region: BoundingBox,
        confidence: f64,
        category: DefectCategory,
    ) -> Self {
        Self {
            id: id.into(),
            region,
            confidence,
            category,
            severity: None,
        }
    }

    pub(crate) fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// Count of detections per severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityHistogram {
    pub minor: usize,
    pub major: usize,
    pub critical: usize,
}

impl SeverityHistogram {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Minor => self.minor += 1,
            Severity::Major => self.major += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn merge(&mut self, other: &SeverityHistogram) {
        self.minor += other.minor;
        self.major += other.major;
        self.critical += other.critical;
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Minor => self.minor,
            Severity::Major => self.major,
            Severity::Critical => self.critical,
        }
    }

    pub fn total(&self) -> usize {
        self.minor + self.major + self.critical
    }
}

impl<'a> FromIterator<&'a Detection> for SeverityHistogram {
    fn from_iter<I: IntoIterator<Item = &'a Detection>>(iter: I) -> Self {
        let mut histogram = SeverityHistogram::default();
        for severity in iter.into_iter().filter_map(|d| d.severity) {
            histogram.record(severity);
        }
        histogram
    }
}
