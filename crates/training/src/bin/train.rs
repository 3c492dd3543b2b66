use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, TrainConfig};
use training::run_train;

#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Train a VGG-FCN segmentation model from the `train` config section"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = TrainConfig::load(&args.config.config)?;
    let summary = run_train(&cfg)?;
    if let Some(best) = summary.best() {
        tracing::info!(
            epoch = best.epoch,
            val_acc = best.val_acc,
            checkpoints = summary.checkpoints.len(),
            "training complete"
        );
    }
    Ok(())
}
