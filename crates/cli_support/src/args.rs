use clap::Args;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Config file location shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// JSON file holding the `train` and `predict` sections.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Prediction overrides on top of the `predict` section.
#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Dataset index to predict; overrides `image_index`.
    #[arg(long)]
    pub index: Option<usize>,
    /// Output directory; overrides `output_dir`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}
