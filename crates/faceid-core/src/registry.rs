//! Register, identify, compare and list faces.
//!
//! [`Registry`] ties the extractor engine to an [`IdentityStore`] and a
//! [`Matcher`]. Models are loaded lazily on the first operation that needs
//! them (or explicitly through [`Registry::ensure_ready`]) and only once per
//! registry. `register` is the only operation that writes.

use crate::engine::{spawn_engine, EngineError, EngineHandle};
use crate::extractor::{ExtractError, ExtractorLoader};
use crate::matcher::{EuclideanMatcher, Matcher};
use crate::store::{FsIdentityStore, IdentityStore, StoreError, StoredRecord};
use crate::types::{Comparison, ConfidenceBand, Detection, DimensionMismatch, MatchResult, RecordSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("image file not found: {}", path.display())]
    ImageNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no face detected in {}", .0.display())]
    NoFaceDetected(PathBuf),
    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatch),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("face extraction failed for {}: {source}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },
    #[error("failed to load face models: {0}")]
    ModelLoad(#[source] ExtractError),
    #[error(transparent)]
    Engine(EngineError),
}

/// Result of identifying the face in one image.
#[derive(Debug, Clone)]
pub struct Identification {
    /// Candidates within the acceptance threshold, best first.
    pub matches: Vec<MatchResult>,
    /// Detector confidence of the query face.
    pub probe_confidence: f32,
    /// Number of registered identities considered.
    pub gallery_size: usize,
}

/// Face registry over a store, a matcher and a lazily loaded extractor.
pub struct Registry<S = FsIdentityStore, M = EuclideanMatcher> {
    store: S,
    matcher: M,
    loader: ExtractorLoader,
    engine: OnceCell<EngineHandle>,
}

impl<S: IdentityStore, M: Matcher> Registry<S, M> {
    pub fn new(store: S, matcher: M, loader: ExtractorLoader) -> Self {
        Self {
            store,
            matcher,
            loader,
            engine: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the extractor has been loaded.
    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }

    /// Load the extractor and start the engine thread if not already done.
    ///
    /// Concurrent callers wait on the same load; a failed load leaves the
    /// registry unloaded so a later call retries.
    pub async fn ensure_ready(&self) -> Result<&EngineHandle, RegistryError> {
        self.engine
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let extractor = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| RegistryError::ModelLoad(ExtractError::Other(e.to_string())))?
                    .map_err(RegistryError::ModelLoad)?;
                let handle = spawn_engine(extractor).map_err(RegistryError::Engine)?;
                tracing::info!("face models loaded");
                Ok::<_, RegistryError>(handle)
            })
            .await
    }

    /// Register the face in `image` under `name`, replacing any prior record.
    pub async fn register(&self, name: &str, image: &Path) -> Result<StoredRecord, RegistryError> {
        let bytes = read_image(image).await?;
        tracing::info!(name, image = %image.display(), "registering face");

        let face = self.extract_first(image, bytes).await?;
        let stored = self.store.put(
            name,
            face.descriptor,
            &image.display().to_string(),
            face.confidence,
        )?;

        tracing::info!(
            name,
            confidence = face.confidence,
            path = %stored.path.display(),
            "face registered"
        );
        Ok(stored)
    }

    /// Rank registered identities against the face in `image`.
    pub async fn identify(&self, image: &Path) -> Result<Identification, RegistryError> {
        let bytes = read_image(image).await?;
        tracing::info!(image = %image.display(), "identifying face");

        let probe = self.extract_first(image, bytes).await?;
        let gallery = self.store.get_all()?;
        if gallery.is_empty() {
            tracing::info!("no registered faces");
        }

        let matches = self.matcher.rank(&probe.descriptor, &gallery)?;
        tracing::info!(
            candidates = gallery.len(),
            matches = matches.len(),
            best = matches.first().map(|m| m.distance),
            "identification finished"
        );

        Ok(Identification {
            matches,
            probe_confidence: probe.confidence,
            gallery_size: gallery.len(),
        })
    }

    /// Compare the faces in two images without touching the store.
    ///
    /// Both files are read before extraction starts on either.
    pub async fn compare(&self, first: &Path, second: &Path) -> Result<Comparison, RegistryError> {
        let first_bytes = read_image(first).await?;
        let second_bytes = read_image(second).await?;
        tracing::info!(first = %first.display(), second = %second.display(), "comparing faces");

        let a = self.extract_first(first, first_bytes).await?;
        let b = self.extract_first(second, second_bytes).await?;

        let (distance, band) = self.matcher.compare(&a.descriptor, &b.descriptor)?;
        tracing::info!(distance, %band, "comparison finished");

        Ok(Comparison {
            distance,
            similarity: 1.0 - distance,
            is_match: band != ConfidenceBand::None,
            band,
            first_confidence: a.confidence,
            second_confidence: b.confidence,
        })
    }

    /// Registered identities, oldest registration first.
    pub fn list(&self) -> Result<Vec<RecordSummary>, RegistryError> {
        let mut faces: Vec<RecordSummary> = self.store.get_all()?.iter().map(|r| r.summary()).collect();
        faces.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(faces)
    }

    /// Extract the first face the extractor reports, warning when there are more.
    async fn extract_first(&self, image: &Path, bytes: Vec<u8>) -> Result<Detection, RegistryError> {
        let engine = self.ensure_ready().await?;
        let faces = engine.extract(bytes).await.map_err(|e| match e {
            EngineError::Extract(source) => RegistryError::Extraction {
                path: image.to_path_buf(),
                source,
            },
            other => RegistryError::Engine(other),
        })?;

        if faces.len() > 1 {
            tracing::warn!(
                faces = faces.len(),
                image = %image.display(),
                "multiple faces detected, using the first one"
            );
        }

        faces
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NoFaceDetected(image.to_path_buf()))
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>, RegistryError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| RegistryError::ImageNotFound {
            path: path.to_path_buf(),
            source,
        })
}
