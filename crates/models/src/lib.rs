//! Burn segmentation models for the VOC pipeline.
//!
//! - `Vgg16`: convolutional backbone exposing the pool3/pool4/fc7 taps.
//! - `Fcn`: fully-convolutional heads at output stride 32, 16 or 8.
//! - `Architecture`: the static name registry the drivers build from.
//!
//! Checkpoint naming and persistence live in [`checkpoint`] so training and
//! prediction agree on one format.

pub mod checkpoint;
pub mod error;
pub mod fcn;
pub mod graph;
pub mod registry;
pub mod upsample;
pub mod vgg;

pub use checkpoint::{
    latest_checkpoint, latest_lexicographic, list_checkpoints, load_weights, save_weights,
    CheckpointError, CheckpointName,
};
pub use error::ModelError;
pub use fcn::{Fcn, FcnConfig, BACKBONE_STRIDE};
pub use graph::{layer_graph, LayerGraph, LayerKind, LayerNode};
pub use registry::{build, Architecture, ARCHITECTURES};
pub use vgg::{Vgg16, VggConfig};

pub mod prelude {
    pub use crate::checkpoint::{CheckpointError, CheckpointName};
    pub use crate::fcn::{Fcn, FcnConfig};
    pub use crate::registry::Architecture;
    pub use crate::vgg::VggConfig;
}
