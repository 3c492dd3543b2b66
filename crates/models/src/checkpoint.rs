//! Checkpoint naming, discovery and persistence.
//!
//! Files are named `weights-{epoch:02}-{loss:.2}-{acc:.2}-{val_loss:.2}-{val_acc:.2}-.bin`
//! with a 1-based epoch, and stored with burn's full-precision binary recorder.

use crate::fcn::Fcn;
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHECKPOINT_PREFIX: &str = "weights-";
/// Extension written by `BinFileRecorder`.
pub const CHECKPOINT_EXTENSION: &str = "bin";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to record {path}: {message}")]
    Recorder { path: PathBuf, message: String },
}

/// Epoch and metrics encoded in a checkpoint file name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointName {
    /// 1-based.
    pub epoch: usize,
    pub loss: f32,
    pub acc: f32,
    pub val_loss: f32,
    pub val_acc: f32,
}

impl CheckpointName {
    pub fn file_name(&self) -> String {
        format!(
            "{CHECKPOINT_PREFIX}{:02}-{:.2}-{:.2}-{:.2}-{:.2}-.{CHECKPOINT_EXTENSION}",
            self.epoch, self.loss, self.acc, self.val_loss, self.val_acc
        )
    }

    /// Parse a file name produced by [`CheckpointName::file_name`]. Metrics come
    /// back rounded to two decimals.
    pub fn parse(file_name: &str) -> Option<Self> {
        let body = file_name
            .strip_prefix(CHECKPOINT_PREFIX)?
            .strip_suffix(CHECKPOINT_EXTENSION)?
            .strip_suffix("-.")?;
        let mut parts = body.split('-');
        let epoch = parts.next()?.parse().ok()?;
        let mut metric = || parts.next()?.parse::<f32>().ok();
        let name = Self {
            epoch,
            loss: metric()?,
            acc: metric()?,
            val_loss: metric()?,
            val_acc: metric()?,
        };
        parts.next().is_none().then_some(name)
    }
}

fn is_checkpoint(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| {
                n.starts_with(CHECKPOINT_PREFIX)
                    && n.ends_with(&format!(".{CHECKPOINT_EXTENSION}"))
            })
}

/// Checkpoint files in `dir`, sorted by file name. A missing directory has none.
pub fn list_checkpoints(dir: &Path) -> Result<Vec<PathBuf>, CheckpointError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CheckpointError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    let mut found = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| CheckpointError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if is_checkpoint(&path) {
            found.push(path);
        }
    }
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}

/// Last checkpoint by file name. Past epoch 99 this no longer tracks training order.
pub fn latest_lexicographic(dir: &Path) -> Result<Option<PathBuf>, CheckpointError> {
    Ok(list_checkpoints(dir)?.pop())
}

/// Checkpoint with the highest parsed epoch; names that do not parse fall back to
/// file-name order behind every parsed one.
pub fn latest_checkpoint(dir: &Path) -> Result<Option<PathBuf>, CheckpointError> {
    let latest = list_checkpoints(dir)?.into_iter().max_by_key(|path| {
        let epoch = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(CheckpointName::parse)
            .map(|name| name.epoch);
        (epoch, path.file_name().map(|n| n.to_os_string()))
    });
    Ok(latest)
}

fn recorder() -> BinFileRecorder<FullPrecisionSettings> {
    BinFileRecorder::<FullPrecisionSettings>::new()
}

pub fn save_weights<B: Backend>(model: &Fcn<B>, path: &Path) -> Result<(), CheckpointError> {
    model
        .clone()
        .save_file(path, &recorder())
        .map_err(|e| CheckpointError::Recorder {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load weights from `path` into `model`, which must have the same architecture.
pub fn load_weights<B: Backend>(
    model: Fcn<B>,
    path: &Path,
    device: &B::Device,
) -> Result<Fcn<B>, CheckpointError> {
    model
        .load_file(path, &recorder(), device)
        .map_err(|e| CheckpointError::Recorder {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
