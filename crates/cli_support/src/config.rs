//! JSON run configuration with one section per run mode.

use models::{FcnConfig, VggConfig, BACKBONE_STRIDE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "args.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config {path} has no '{section}' section")]
    MissingSection { path: PathBuf, section: &'static str },
    #[error("invalid '{section}' section: {source}")]
    InvalidSection {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Predict,
}

impl RunMode {
    pub fn section(self) -> &'static str {
        match self {
            RunMode::Train => "train",
            RunMode::Predict => "predict",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Read `path` and deserialize the section belonging to `mode`.
pub fn load_section<T: DeserializeOwned>(path: &Path, mode: RunMode) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut root: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let section = mode.section();
    let value = root
        .get_mut(section)
        .map(serde_json::Value::take)
        .ok_or_else(|| ConfigError::MissingSection {
            path: path.to_path_buf(),
            section,
        })?;
    serde_json::from_value(value).map_err(|source| ConfigError::InvalidSection { section, source })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    #[default]
    CategoricalCrossentropy,
    WeightedCategoricalCrossentropy,
}

/// Backbone width override; small widths keep experiments and tests cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneSection {
    pub widths: [usize; 5],
    pub fc_channels: usize,
}

impl From<BackboneSection> for VggConfig {
    fn from(section: BackboneSection) -> Self {
        VggConfig {
            widths: section.widths,
            fc_channels: section.fc_channels,
        }
    }
}

fn default_classes() -> usize {
    21
}
fn default_input_size() -> usize {
    224
}
fn default_true() -> bool {
    true
}
fn default_drop_rate() -> f64 {
    0.5
}
fn default_weight_decay() -> f32 {
    5e-5
}
fn default_learning_rate() -> f64 {
    1e-4
}
fn default_momentum() -> f64 {
    0.9
}
fn default_image_index() -> usize {
    1
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model: String,
    pub train_img_dir: PathBuf,
    pub train_gt_dir: PathBuf,
    pub val_img_dir: PathBuf,
    pub val_gt_dir: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub log_dir: PathBuf,
    #[serde(default = "default_classes")]
    pub classes: usize,
    /// Side of the square network input.
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_true")]
    pub bilinear: bool,
    #[serde(default = "default_drop_rate")]
    pub drop_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[serde(default)]
    pub loss: LossKind,
    /// Raw per-class weights for the weighted loss; normalized before use.
    #[serde(default)]
    pub class_weights: Option<Vec<f32>>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub backbone: Option<BackboneSection>,
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg: Self = load_section(path, RunMode::Train)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("epochs must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::Invalid("learning_rate must be > 0".into()));
        }
        if let Some(weights) = &self.class_weights {
            if weights.len() != self.classes {
                return Err(ConfigError::Invalid(format!(
                    "class_weights has {} entries for {} classes",
                    weights.len(),
                    self.classes
                )));
            }
        }
        validate_model(self.classes, self.input_size)
    }

    pub fn fcn_config(&self) -> FcnConfig {
        FcnConfig {
            classes: self.classes,
            input_shape: (self.input_size, self.input_size),
            bilinear: self.bilinear,
            drop_rate: self.drop_rate,
            weight_decay: self.weight_decay,
            backbone: self.backbone.clone().map(Into::into).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictConfig {
    pub model: String,
    pub img_dir: PathBuf,
    /// Directory searched for the latest checkpoint.
    pub log_dir: PathBuf,
    /// Ground truth for a third comparison panel.
    #[serde(default)]
    pub gt_dir: Option<PathBuf>,
    #[serde(default = "default_image_index")]
    pub image_index: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_classes")]
    pub classes: usize,
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_true")]
    pub bilinear: bool,
    #[serde(default)]
    pub backbone: Option<BackboneSection>,
}

impl PredictConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg: Self = load_section(path, RunMode::Predict)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_model(self.classes, self.input_size)
    }

    /// Model settings for inference; dropout is inactive there so its rate is irrelevant.
    pub fn fcn_config(&self) -> FcnConfig {
        FcnConfig {
            classes: self.classes,
            input_shape: (self.input_size, self.input_size),
            bilinear: self.bilinear,
            backbone: self.backbone.clone().map(Into::into).unwrap_or_default(),
            ..FcnConfig::default()
        }
    }
}

fn validate_model(classes: usize, input_size: usize) -> Result<(), ConfigError> {
    if classes == 0 || classes > usize::from(u8::MAX) + 1 {
        return Err(ConfigError::Invalid(format!(
            "classes must be in 1..=256, got {classes}"
        )));
    }
    if input_size == 0 || input_size % BACKBONE_STRIDE != 0 {
        return Err(ConfigError::Invalid(format!(
            "input_size must be a positive multiple of {BACKBONE_STRIDE}, got {input_size}"
        )));
    }
    Ok(())
}
