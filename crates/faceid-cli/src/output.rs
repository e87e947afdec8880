//! Human-readable rendering of registry results.

use faceid_core::{Comparison, Identification, RecordSummary, StoredRecord, Thresholds};
use std::fmt::Write;

pub fn registration(stored: &StoredRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Face registered successfully!");
    let _ = writeln!(out, "Name: {}", stored.record.name);
    let _ = writeln!(out, "Confidence: {:.3}", stored.record.confidence);
    let _ = write!(out, "Embedding saved to: {}", stored.path.display());
    out
}

pub fn identification(result: &Identification) -> String {
    if result.gallery_size == 0 {
        return "No registered faces found".to_string();
    }
    if result.matches.is_empty() {
        return "No matching faces found".to_string();
    }

    let mut out = format!("Found {} match(es):", result.matches.len());
    for m in &result.matches {
        let _ = write!(out, "\n  {} (distance: {:.3}, confidence: {})", m.name, m.distance, m.band);
    }
    out
}

pub fn comparison(result: &Comparison) -> String {
    format!(
        "Comparison result:\n  Distance: {:.3}\n  Similarity: {:.3}\n  Match: {} ({})",
        result.distance,
        result.similarity,
        if result.is_match { "Yes" } else { "No" },
        result.band,
    )
}

pub fn listing(faces: &[RecordSummary]) -> String {
    if faces.is_empty() {
        return "No registered faces found".to_string();
    }

    let mut out = format!("Found {} registered face(s):", faces.len());
    for face in faces {
        let _ = write!(
            out,
            "\n  {} (registered: {}, confidence: {:.3})",
            face.name,
            face.registered_at.format("%Y-%m-%d"),
            face.confidence
        );
    }
    out
}

/// Threshold legend appended to `--help`.
pub fn threshold_legend(t: &Thresholds) -> String {
    format!(
        "Confidence thresholds:\n  Strong match: distance < {}\n  Weak match:   distance < {}\n  No match:     distance >= {}",
        t.strong, t.accept, t.accept
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use faceid_core::{ConfidenceBand, Descriptor, EmbeddingRecord, MatchResult};
    use std::path::PathBuf;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_registration() {
        let stored = StoredRecord {
            record: EmbeddingRecord {
                name: "John Doe".into(),
                registered_at: ts("2024-05-01T10:00:00Z"),
                descriptor: Descriptor::new(vec![0.0]),
                image_source: "/tmp/john.jpg".into(),
                confidence: 0.98765,
            },
            path: PathBuf::from("/people/john doe/face_embedding.json"),
        };
        let text = registration(&stored);
        assert!(text.contains("Name: John Doe"));
        assert!(text.contains("Confidence: 0.988"));
        assert!(text.ends_with("Embedding saved to: /people/john doe/face_embedding.json"));
    }

    #[test]
    fn test_identification_variants() {
        let empty_store = Identification { matches: vec![], probe_confidence: 0.9, gallery_size: 0 };
        assert_eq!(identification(&empty_store), "No registered faces found");

        let no_match = Identification { matches: vec![], probe_confidence: 0.9, gallery_size: 3 };
        assert_eq!(identification(&no_match), "No matching faces found");

        let found = Identification {
            matches: vec![MatchResult {
                name: "alice".into(),
                distance: 0.31234,
                similarity: 0.68766,
                band: ConfidenceBand::Strong,
                registered_at: ts("2024-01-01T00:00:00Z"),
            }],
            probe_confidence: 0.9,
            gallery_size: 3,
        };
        assert_eq!(
            identification(&found),
            "Found 1 match(es):\n  alice (distance: 0.312, confidence: strong)"
        );
    }

    #[test]
    fn test_comparison_no_match() {
        let text = comparison(&Comparison {
            distance: 0.8,
            similarity: 0.2,
            is_match: false,
            band: ConfidenceBand::None,
            first_confidence: 0.9,
            second_confidence: 0.9,
        });
        assert!(text.contains("Distance: 0.800"));
        assert!(text.contains("Similarity: 0.200"));
        assert!(text.ends_with("Match: No (no match)"));
    }

    #[test]
    fn test_listing() {
        assert_eq!(listing(&[]), "No registered faces found");

        let faces = vec![RecordSummary {
            name: "bob".into(),
            registered_at: ts("2023-11-30T23:59:00Z"),
            image_source: "bob.jpg".into(),
            confidence: 0.5,
        }];
        assert_eq!(
            listing(&faces),
            "Found 1 registered face(s):\n  bob (registered: 2023-11-30, confidence: 0.500)"
        );
    }

    #[test]
    fn test_threshold_legend() {
        let legend = threshold_legend(&Thresholds::default());
        assert!(legend.contains("Strong match: distance < 0.4"));
        assert!(legend.contains("No match:     distance >= 0.6"));
    }
}
