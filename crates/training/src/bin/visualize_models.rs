use anyhow::Context;
use clap::Parser;
use models::{layer_graph, Architecture, FcnConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "visualize_models",
    about = "Write Graphviz and PNG diagrams of every FCN architecture"
)]
struct Args {
    /// Directory for `<name>.dot` and `<name>.png`.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Build flags each architecture is drawn with.
fn diagram_config(arch: Architecture) -> FcnConfig {
    match arch {
        Architecture::VggFcn32s => FcnConfig {
            bilinear: true,
            ..FcnConfig::default()
        },
        Architecture::VggFcn16s => FcnConfig::default(),
        Architecture::VggFcn8s => FcnConfig {
            drop_rate: 0.5,
            bilinear: true,
            ..FcnConfig::default()
        },
    }
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    for arch in Architecture::all() {
        let cfg = diagram_config(arch);
        cfg.validate()?;
        let graph = layer_graph(arch, &cfg);

        let dot_path = args.output_dir.join(format!("{arch}.dot"));
        fs::write(&dot_path, graph.to_dot(arch.name()))
            .with_context(|| format!("failed to write {}", dot_path.display()))?;

        let png_path = args.output_dir.join(format!("{arch}.png"));
        training::diagram::render(&graph)
            .save(&png_path)
            .with_context(|| format!("failed to write {}", png_path.display()))?;

        tracing::info!(
            arch = %arch,
            layers = graph.nodes.len(),
            dot = %dot_path.display(),
            png = %png_path.display(),
            "wrote model diagram"
        );
    }
    Ok(())
}
