#![recursion_limit = "256"]

pub mod diagram;
pub mod loss;
pub mod util;

pub use loss::{
    make_weight_map, pixel_accuracy, pixelwise_crossentropy, weighted_pixelwise_crossentropy,
    Objective, VOC_CLASS_WEIGHT,
};
pub use util::{run_train, BestCheckpoint, EpochMetrics, TrainSummary};

/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
