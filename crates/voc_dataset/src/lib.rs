//! Segmentation dataset loading, augmentation and Burn-compatible batching.
//!
//! This crate provides:
//! - Image/label pair discovery from a directory pair
//! - Resizing, label decoding and one-hot encoding
//! - Paired image/label augmentation
//! - An endlessly repeating, per-epoch shuffled batch flow

pub mod aug;
pub mod dataset;
pub mod labels;
pub mod loader;
pub mod types;

pub use aug::{TransformPipeline, TransformPipelineBuilder};
pub use dataset::{find_label, load_label_map, DatasetConfig, SegmentationDataset};
pub use labels::{decode_label_map, one_hot_hwc};
pub use loader::{DataLoader, Flow, SegBatch};
pub use types::*;
