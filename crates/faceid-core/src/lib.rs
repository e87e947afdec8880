//! faceid-core — Face identity registry and matching engine.
//!
//! Descriptors come from an [`Extractor`] (SCRFD detection + ArcFace
//! recognition via ONNX Runtime by default), are persisted one record per
//! identity by an [`IdentityStore`], and are ranked by L2 distance with a
//! strong/weak confidence band by a [`Matcher`].

pub mod alignment;
pub mod detector;
pub mod engine;
pub mod extractor;
pub mod matcher;
pub mod recognizer;
pub mod registry;
pub mod store;
pub mod types;

pub use extractor::{ExtractError, Extractor, ExtractorLoader, OnnxExtractor};
pub use matcher::{EuclideanMatcher, Matcher};
pub use registry::{Identification, Registry, RegistryError};
pub use store::{FsIdentityStore, IdentityStore, StoreError, StoredRecord};
pub use types::{
    BoundingBox, Comparison, ConfidenceBand, Descriptor, Detection, DimensionMismatch, EmbeddingRecord,
    MatchResult, RecordSummary, ThresholdError, Thresholds, DEFAULT_ACCEPT_THRESHOLD, DEFAULT_STRONG_THRESHOLD,
};
