#![recursion_limit = "256"]

pub mod factory;
pub mod predict;

#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

pub use factory::{Segmenter, SegmenterFactory};
pub use predict::{run_predict, PredictOutcome, PANEL_GAP};

pub mod prelude {
    pub use crate::factory::{Segmenter, SegmenterFactory};
    pub use crate::predict::{run_predict, PredictOutcome};
    pub use crate::InferenceBackend;
}
