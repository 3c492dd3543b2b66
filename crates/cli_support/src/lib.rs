pub mod args;
pub mod config;
pub mod logging;

pub use args::{ConfigArgs, PredictArgs};
pub use config::{
    load_section, BackboneSection, ConfigError, LossKind, PredictConfig, RunMode, TrainConfig,
    DEFAULT_CONFIG_PATH,
};
pub use logging::init_tracing;
