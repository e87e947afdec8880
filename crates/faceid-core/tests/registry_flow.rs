use faceid_core::{
    BoundingBox, ConfidenceBand, Descriptor, Detection, EuclideanMatcher, ExtractError, Extractor, ExtractorLoader,
    FsIdentityStore, IdentityStore, Registry, RegistryError, Thresholds,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Each image file holds one line per face: `confidence descriptor...`.
struct LineExtractor;

impl Extractor for LineExtractor {
    fn extract(&mut self, image: &[u8]) -> Result<Vec<Detection>, ExtractError> {
        let text = String::from_utf8_lossy(image);
        let mut faces = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let mut fields = line.split_whitespace().map(|f| f.parse::<f32>());
            let confidence = fields
                .next()
                .transpose()
                .map_err(|e| ExtractError::Other(e.to_string()))?
                .unwrap_or(0.0);
            let values = fields
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ExtractError::Other(e.to_string()))?;
            faces.push(Detection {
                descriptor: Descriptor::new(values),
                confidence,
                bbox: BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 0.0,
                    height: 0.0,
                    confidence,
                    landmarks: None,
                },
            });
        }
        Ok(faces)
    }
}

fn loader() -> ExtractorLoader {
    Arc::new(|| Ok(Box::new(LineExtractor) as Box<dyn Extractor>))
}

fn write(dir: &Path, file: &str, contents: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn register_identify_list_reregister() {
    let dir = tempfile::tempdir().unwrap();
    let people = dir.path().join("people");
    let registry = Registry::new(
        FsIdentityStore::new(&people),
        EuclideanMatcher::new(Thresholds::default()),
        loader(),
    );

    assert!(registry.list().unwrap().is_empty());

    let alice = write(dir.path(), "alice.jpg", "0.97 0.10 0.20 0.30\n");
    let bob = write(dir.path(), "bob.jpg", "0.91 0.60 0.20 0.30\n");
    let stored = registry.register("Alice", &alice).await.unwrap();
    assert_eq!(stored.path, people.join("alice").join("face_embedding.json"));
    assert!((stored.record.confidence - 0.97).abs() < 1e-6);
    registry.register("Bob", &bob).await.unwrap();

    // Same image → exact match on top.
    let found = registry.identify(&alice).await.unwrap();
    assert_eq!(found.matches.len(), 2);
    assert_eq!(found.matches[0].name, "Alice");
    assert!(found.matches[0].distance < 1e-6);
    assert_eq!(found.matches[0].band, ConfidenceBand::Strong);
    assert_eq!(found.matches[1].name, "Bob");
    assert_eq!(found.matches[1].band, ConfidenceBand::Weak);

    // Someone else entirely.
    let stranger = write(dir.path(), "stranger.jpg", "0.88 0.10 1.00 0.30\n");
    assert!(registry.identify(&stranger).await.unwrap().matches.is_empty());

    // Re-registration replaces the record.
    let alice_new = write(dir.path(), "alice-2024.jpg", "0.99 0.12 0.21 0.30\n");
    registry.register("alice", &alice_new).await.unwrap();

    let faces = registry.list().unwrap();
    assert_eq!(faces.len(), 2);
    let alice_rows: Vec<_> = faces.iter().filter(|f| f.name.eq_ignore_ascii_case("alice")).collect();
    assert_eq!(alice_rows.len(), 1);
    assert_eq!(alice_rows[0].image_source, alice_new.display().to_string());
    assert!(faces[0].registered_at <= faces[1].registered_at);

    // The store on disk agrees.
    assert_eq!(FsIdentityStore::new(&people).get_all().unwrap().len(), 2);
}

#[tokio::test]
async fn corrupt_record_does_not_break_identify() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(FsIdentityStore::new(dir.path()), EuclideanMatcher::default(), loader());

    let img = write(dir.path(), "h.jpg", "0.9 0.5 0.5\n");
    registry.register("hank", &img).await.unwrap();

    let broken = dir.path().join("ivy");
    std::fs::create_dir_all(&broken).unwrap();
    std::fs::write(broken.join("face_embedding.json"), "{\"name\": \"ivy\"").unwrap();

    let found = registry.identify(&img).await.unwrap();
    assert_eq!(found.matches.len(), 1);
    assert_eq!(found.matches[0].name, "hank");
    assert_eq!(registry.list().unwrap().len(), 1);
}

#[tokio::test]
async fn compare_without_store_access() {
    let dir = tempfile::tempdir().unwrap();
    let people = dir.path().join("people");
    let registry = Registry::new(FsIdentityStore::new(&people), EuclideanMatcher::default(), loader());

    let a = write(dir.path(), "a.jpg", "0.95 0.30 0.40\n");
    let b = write(dir.path(), "b.jpg", "0.90 0.32 0.45\n0.40 0.90 0.90\n");
    let result = registry.compare(&a, &b).await.unwrap();

    assert!(result.is_match);
    assert_eq!(result.band, ConfidenceBand::Strong);
    assert!((result.first_confidence - 0.95).abs() < 1e-6);
    assert!((result.second_confidence - 0.90).abs() < 1e-6);
    assert!(!people.exists());
}

#[tokio::test]
async fn model_load_failure_surfaces() {
    let dir = tempfile::tempdir().unwrap();
    let failing: ExtractorLoader = Arc::new(|| Err(ExtractError::Other("det_10g.onnx missing".into())));
    let registry = Registry::new(FsIdentityStore::new(dir.path()), EuclideanMatcher::default(), failing);

    let img = write(dir.path(), "x.jpg", "0.9 0.1\n");
    let err = registry.identify(&img).await.unwrap_err();
    assert!(matches!(err, RegistryError::ModelLoad(_)));
    assert!(err.to_string().contains("det_10g.onnx"));
}
