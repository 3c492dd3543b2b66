//! Single-image prediction and the comparison figure written for it.

use crate::factory::SegmenterFactory;
use anyhow::Context;
use cli_support::PredictConfig;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use vision_core::overlay::{chw_to_rgb, compose_panels};
use vision_core::palette::{class_name, label_to_img};
use voc_dataset::{find_label, load_label_map, DatasetConfig, SegmentationDataset};

/// Pixels between and around figure panels.
pub const PANEL_GAP: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictOutcome {
    /// Written figure, `predict_<index>.png`.
    pub figure: PathBuf,
    pub checkpoint: Option<PathBuf>,
    /// Row-major class ids at network resolution.
    pub label_map: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Predict `cfg.image_index` and save input | prediction (| ground truth) side by side.
pub fn run_predict(cfg: &PredictConfig) -> anyhow::Result<PredictOutcome> {
    cfg.validate()?;
    let side = u32::try_from(cfg.input_size).context("input_size does not fit in u32")?;
    // Opened unlabeled: only the predicted image's ground truth matters here.
    let dataset =
        SegmentationDataset::open(DatasetConfig::new(cfg.classes, (side, side), &cfg.img_dir))
            .with_context(|| format!("failed to open dataset {}", cfg.img_dir.display()))?;
    let sample = dataset.load_raw(cfg.image_index)?;
    let image_path = dataset
        .image_path(cfg.image_index)
        .context("image index has no path")?;
    tracing::info!(index = cfg.image_index, image = %image_path.display(), "predicting");

    let (width, height) = (sample.width, sample.height);
    let truth_ids = match &cfg.gt_dir {
        Some(gt_dir) => ground_truth(gt_dir, image_path, (width, height), cfg.classes)?,
        None => None,
    };

    let segmenter = SegmenterFactory.build(&cfg.model, &cfg.fcn_config(), &cfg.log_dir)?;
    let label_map = segmenter.segment(&sample.image_chw, width as usize, height as usize)?;
    let present: BTreeSet<u8> = label_map.iter().copied().collect();
    let names: Vec<&str> = present.into_iter().filter_map(class_name).collect();
    tracing::info!(classes = ?names, "predicted classes");

    let input = chw_to_rgb(&sample.image_chw, width, height);
    let predicted = label_to_img(&label_map, width, height);
    let truth = truth_ids
        .as_ref()
        .map(|ids| label_to_img(ids, width, height));
    let mut panels = vec![&input, &predicted];
    if let Some(truth) = &truth {
        panels.push(truth);
    }
    let figure = compose_panels(&panels, PANEL_GAP);

    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("failed to create {}", cfg.output_dir.display()))?;
    let figure_path = cfg
        .output_dir
        .join(format!("predict_{}.png", cfg.image_index));
    figure
        .save(&figure_path)
        .with_context(|| format!("failed to write {}", figure_path.display()))?;
    tracing::info!(figure = %figure_path.display(), panels = panels.len(), "saved prediction");

    Ok(PredictOutcome {
        figure: figure_path,
        checkpoint: segmenter.checkpoint().map(PathBuf::from),
        label_map,
        width,
        height,
    })
}

/// Class ids of the label matching `image` in `gt_dir`, or `None` with a warning
/// when that image has no label.
fn ground_truth(
    gt_dir: &Path,
    image: &Path,
    size: (u32, u32),
    classes: usize,
) -> anyhow::Result<Option<Vec<u8>>> {
    let Some(label) = find_label(gt_dir, image)? else {
        tracing::warn!(
            image = %image.display(),
            gt_dir = %gt_dir.display(),
            "no ground truth for image; figure will have two panels"
        );
        return Ok(None);
    };
    Ok(Some(load_label_map(&label, size, classes)?))
}
