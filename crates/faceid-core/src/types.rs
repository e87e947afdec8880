use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default acceptance threshold: candidates at or beyond this distance are not matches.
pub const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.6;
/// Default strict threshold: candidates closer than this are strong matches.
pub const DEFAULT_STRONG_THRESHOLD: f32 = 0.4;

/// Two descriptors of different length were compared.
///
/// Almost always means records produced by a different extraction model
/// were mixed into the store.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("descriptor dimensions do not match: expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Face descriptor: a fixed-length embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(pub Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean (L2) distance to another descriptor of the same length.
    pub fn distance(&self, other: &Descriptor) -> Result<f32, DimensionMismatch> {
        if self.len() != other.len() {
            return Err(DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }

        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// One face found by an extractor.
#[derive(Debug, Clone)]
pub struct Detection {
    pub descriptor: Descriptor,
    /// Detector score for this face region, in [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A registered identity as persisted by the identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub descriptor: Descriptor,
    pub image_source: String,
    /// Extraction confidence of the registered face.
    pub confidence: f32,
}

impl EmbeddingRecord {
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            name: self.name.clone(),
            registered_at: self.registered_at,
            image_source: self.image_source.clone(),
            confidence: self.confidence,
        }
    }
}

/// Public fields of a record, without the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub image_source: String,
    pub confidence: f32,
}

/// Coarse reliability of a match, derived from distance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    Strong,
    Weak,
    None,
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBand::Strong => f.write_str("strong"),
            ConfidenceBand::Weak => f.write_str("weak"),
            ConfidenceBand::None => f.write_str("no match"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("threshold must be a positive finite number, got {0}")]
    NotPositive(f32),
    #[error("strong threshold {strong} exceeds acceptance threshold {accept}")]
    Inverted { strong: f32, accept: f32 },
}

/// Distance thresholds for the two-band classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Distances strictly below this are matches.
    pub accept: f32,
    /// Distances strictly below this are strong matches.
    pub strong: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT_THRESHOLD,
            strong: DEFAULT_STRONG_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for value in [self.accept, self.strong] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ThresholdError::NotPositive(value));
            }
        }
        if self.strong > self.accept {
            return Err(ThresholdError::Inverted {
                strong: self.strong,
                accept: self.accept,
            });
        }
        Ok(())
    }

    pub fn classify(&self, distance: f32) -> ConfidenceBand {
        if distance < self.strong {
            ConfidenceBand::Strong
        } else if distance < self.accept {
            ConfidenceBand::Weak
        } else {
            ConfidenceBand::None
        }
    }
}

/// A stored identity that passed the acceptance threshold for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub name: String,
    pub distance: f32,
    /// `1 - distance`; can be negative for distant descriptors.
    pub similarity: f32,
    pub band: ConfidenceBand,
    pub registered_at: DateTime<Utc>,
}

/// Outcome of comparing the faces in two images.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub distance: f32,
    pub similarity: f32,
    pub is_match: bool,
    pub band: ConfidenceBand,
    pub first_confidence: f32,
    pub second_confidence: f32,
}
