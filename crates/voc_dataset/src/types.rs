//! Core types and error definitions for voc_dataset.

use burn::tensor::{backend::Backend, Tensor};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, SegDatasetError>;

#[derive(Debug, Error)]
pub enum SegDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file missing or unreadable: {path}: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no label file for image {image} in {label_dir}")]
    MissingLabel { image: PathBuf, label_dir: PathBuf },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
    #[error("cannot assemble an empty batch")]
    EmptyBatch,
}

/// Host-side sample before tensor construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Image in CHW layout, normalized to [0, 1].
    pub image_chw: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Row-major class ids (`height * width`), absent in inference mode.
    pub label: Option<Vec<u8>>,
}

/// A single sample as batch-shaped tensors (leading dimension of 1).
#[derive(Debug, Clone)]
pub struct Sample<B: Backend> {
    /// Shape: [1, 3, height, width].
    pub image: Tensor<B, 4>,
    /// One-hot labels, shape: [1, height, width, classes].
    pub label: Option<Tensor<B, 4>>,
}
