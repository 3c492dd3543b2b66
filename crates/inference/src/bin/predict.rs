use clap::Parser;
use cli_support::{init_tracing, PredictArgs, PredictConfig};
use inference::run_predict;

#[derive(Parser, Debug)]
#[command(
    name = "predict",
    about = "Segment one image with the latest checkpoint and save a comparison figure"
)]
struct Args {
    #[command(flatten)]
    predict: PredictArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = PredictConfig::load(&args.predict.config.config)?;
    if let Some(index) = args.predict.index {
        cfg.image_index = index;
    }
    if let Some(dir) = args.predict.output_dir {
        cfg.output_dir = dir;
    }
    let outcome = run_predict(&cfg)?;
    println!("{}", outcome.figure.display());
    Ok(())
}
