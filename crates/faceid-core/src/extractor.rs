//! Image → face descriptors.
//!
//! [`Extractor`] is the seam between the matching core and whatever model
//! produces descriptors. [`OnnxExtractor`] is the SCRFD + ArcFace pipeline.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Detection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("{0}")]
    Other(String),
}

/// Produces zero or more face detections from encoded image bytes.
pub trait Extractor: Send {
    fn extract(&mut self, image: &[u8]) -> Result<Vec<Detection>, ExtractError>;
}

/// Deferred extractor construction, invoked at most once per successful load.
pub type ExtractorLoader =
    Arc<dyn Fn() -> Result<Box<dyn Extractor>, ExtractError> + Send + Sync>;

/// SCRFD detection followed by ArcFace recognition for every detected face.
pub struct OnnxExtractor {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxExtractor {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, ExtractError> {
        let detector = FaceDetector::load(&model_dir.join(SCRFD_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(ARCFACE_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }

    /// Loader that builds an [`OnnxExtractor`] from `model_dir` on demand.
    pub fn loader(model_dir: PathBuf) -> ExtractorLoader {
        Arc::new(move || {
            tracing::info!(dir = %model_dir.display(), "loading face models");
            Ok(Box::new(OnnxExtractor::load(&model_dir)?) as Box<dyn Extractor>)
        })
    }
}

impl Extractor for OnnxExtractor {
    fn extract(&mut self, image: &[u8]) -> Result<Vec<Detection>, ExtractError> {
        let img = image::load_from_memory(image)?.to_rgb8();
        tracing::debug!(width = img.width(), height = img.height(), "image decoded");

        let faces = self.detector.detect(&img)?;
        let mut detections = Vec::with_capacity(faces.len());
        for face in faces {
            let descriptor = self.recognizer.extract(&img, &face)?;
            detections.push(Detection {
                descriptor,
                confidence: face.confidence,
                bbox: face,
            });
        }
        Ok(detections)
    }
}
