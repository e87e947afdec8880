use anyhow::{Context, Result};
use faceid_core::Thresholds;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration: `FACEID_*` environment variables over an optional TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the identity store, one subdirectory per identity.
    pub people_dir: PathBuf,
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    pub thresholds: Thresholds,
}

/// Keys accepted in the file named by `FACEID_CONFIG`. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    people_dir: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    match_threshold: Option<f32>,
    strong_threshold: Option<f32>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match env("FACEID_CONFIG") {
            Some(path) => read_file(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let data_dir = env("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("faceid");

        let people_dir = env("FACEID_PEOPLE_DIR")
            .map(PathBuf::from)
            .or(file.people_dir)
            .unwrap_or_else(|| data_dir.join("people"));
        let model_dir = env("FACEID_MODEL_DIR")
            .map(PathBuf::from)
            .or(file.model_dir)
            .unwrap_or_else(|| data_dir.join("models"));

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            accept: env_f32(&env, "FACEID_MATCH_THRESHOLD")?
                .or(file.match_threshold)
                .unwrap_or(defaults.accept),
            strong: env_f32(&env, "FACEID_STRONG_THRESHOLD")?
                .or(file.strong_threshold)
                .unwrap_or(defaults.strong),
        };
        thresholds.validate().context("invalid match thresholds")?;

        Ok(Self {
            people_dir,
            model_dir,
            thresholds,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

fn env_f32(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<f32>> {
    env(key)
        .map(|v| v.trim().parse::<f32>().with_context(|| format!("{key}={v:?} is not a number")))
        .transpose()
}
