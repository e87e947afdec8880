//! Ranking a probe descriptor against the registered gallery.

use crate::types::{ConfidenceBand, Descriptor, DimensionMismatch, EmbeddingRecord, MatchResult, Thresholds};
use std::cmp::Ordering;

/// Strategy for comparing a probe descriptor against registered identities.
pub trait Matcher {
    /// Rank every gallery record within the acceptance threshold, best first.
    ///
    /// The gallery is a read-only snapshot; an empty result is a normal outcome.
    fn rank(&self, probe: &Descriptor, gallery: &[EmbeddingRecord]) -> Result<Vec<MatchResult>, DimensionMismatch>;

    /// Distance and band between two descriptors.
    fn compare(&self, a: &Descriptor, b: &Descriptor) -> Result<(f32, ConfidenceBand), DimensionMismatch>;
}

/// L2-distance matcher with a two-band (strong/weak) classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMatcher {
    pub thresholds: Thresholds,
}

impl EuclideanMatcher {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl Matcher for EuclideanMatcher {
    fn rank(&self, probe: &Descriptor, gallery: &[EmbeddingRecord]) -> Result<Vec<MatchResult>, DimensionMismatch> {
        let mut matches = Vec::new();

        // Every record is measured so a mixed-model store always surfaces.
        for record in gallery {
            let distance = probe.distance(&record.descriptor)?;
            tracing::trace!(name = %record.name, distance, "candidate distance");

            if distance < self.thresholds.accept {
                matches.push(MatchResult {
                    name: record.name.clone(),
                    distance,
                    similarity: 1.0 - distance,
                    band: self.thresholds.classify(distance),
                    registered_at: record.registered_at,
                });
            }
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(matches)
    }

    fn compare(&self, a: &Descriptor, b: &Descriptor) -> Result<(f32, ConfidenceBand), DimensionMismatch> {
        let distance = a.distance(b)?;
        Ok((distance, self.thresholds.classify(distance)))
    }
}
