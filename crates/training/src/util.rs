use anyhow::Context;
use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use cli_support::{LossKind, TrainConfig};
use models::{save_weights, Architecture, CheckpointName, Fcn};
use std::fs;
use std::path::{Path, PathBuf};
use voc_dataset::{DataLoader, DatasetConfig, Flow, SegmentationDataset};

use crate::loss::{make_weight_map, pixel_accuracy, Objective, VOC_CLASS_WEIGHT};
use crate::TrainBackend;

type ADBackend = Autodiff<TrainBackend>;

/// Mean training and validation metrics of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    /// 1-based.
    pub epoch: usize,
    pub loss: f32,
    pub acc: f32,
    pub val_loss: f32,
    pub val_acc: f32,
}

impl EpochMetrics {
    pub fn checkpoint_name(&self) -> CheckpointName {
        CheckpointName {
            epoch: self.epoch,
            loss: self.loss,
            acc: self.acc,
            val_loss: self.val_loss,
            val_acc: self.val_acc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainSummary {
    pub epochs: Vec<EpochMetrics>,
    /// Checkpoints written, oldest first.
    pub checkpoints: Vec<PathBuf>,
}

impl TrainSummary {
    /// Earliest epoch with the highest validation accuracy.
    pub fn best(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .rev()
            .filter(|m| !m.val_acc.is_nan())
            .max_by(|a, b| a.val_acc.total_cmp(&b.val_acc))
    }
}

/// Best-only checkpoint policy on validation accuracy.
#[derive(Debug, Clone)]
pub struct BestCheckpoint {
    dir: PathBuf,
    best_val_acc: Option<f32>,
}

impl BestCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            best_val_acc: None,
        }
    }

    pub fn best_val_acc(&self) -> Option<f32> {
        self.best_val_acc
    }

    /// Path to save to when `metrics.val_acc` beats every earlier epoch.
    pub fn observe(&mut self, metrics: &EpochMetrics) -> Option<PathBuf> {
        let improved = match self.best_val_acc {
            None => !metrics.val_acc.is_nan(),
            Some(best) => metrics.val_acc > best,
        };
        if !improved {
            return None;
        }
        self.best_val_acc = Some(metrics.val_acc);
        Some(self.dir.join(metrics.checkpoint_name().file_name()))
    }
}

fn objective(cfg: &TrainConfig) -> Objective {
    match cfg.loss {
        LossKind::CategoricalCrossentropy => Objective::CrossEntropy,
        LossKind::WeightedCategoricalCrossentropy => {
            let raw = cfg
                .class_weights
                .clone()
                .unwrap_or_else(|| VOC_CLASS_WEIGHT.to_vec());
            Objective::Weighted(make_weight_map(&raw))
        }
    }
}

fn open_split(
    cfg: &TrainConfig,
    img_dir: &Path,
    gt_dir: &Path,
    augment: bool,
) -> anyhow::Result<SegmentationDataset> {
    let side = u32::try_from(cfg.input_size).context("input_size does not fit in u32")?;
    let dataset_cfg = DatasetConfig::new(cfg.classes, (side, side), img_dir)
        .with_label_dir(Some(gt_dir.to_path_buf()))
        .with_augment(augment)
        .with_seed(cfg.seed);
    SegmentationDataset::open(dataset_cfg)
        .with_context(|| format!("failed to open dataset {}", img_dir.display()))
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_scalar().elem::<f32>()
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Mean (loss, accuracy) over `steps` batches of `flow`.
fn evaluate(
    model: &Fcn<TrainBackend>,
    flow: &mut Flow<'_, TrainBackend>,
    steps: usize,
    objective: &Objective,
) -> anyhow::Result<(f32, f32)> {
    let mut losses = Vec::with_capacity(steps);
    let mut accs = Vec::with_capacity(steps);
    for _ in 0..steps {
        let batch = flow.next().context("validation loader yielded no batch")??;
        let labels = batch.labels.context("validation batch has no labels")?;
        let probs = model.forward(batch.images);
        losses.push(scalar(objective.compute(labels.clone(), probs.clone())));
        accs.push(scalar(pixel_accuracy(labels, probs)));
    }
    Ok((mean(&losses), mean(&accs)))
}

pub fn run_train(cfg: &TrainConfig) -> anyhow::Result<TrainSummary> {
    cfg.validate()?;
    fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("failed to create log_dir {}", cfg.log_dir.display()))?;

    let arch = Architecture::from_name(&cfg.model)?;
    let fcn_cfg = cfg.fcn_config();

    let trn_dataset = open_split(cfg, &cfg.train_img_dir, &cfg.train_gt_dir, true)?;
    let val_dataset = open_split(cfg, &cfg.val_img_dir, &cfg.val_gt_dir, false)?;
    let (trn_len, val_len) = (trn_dataset.len(), val_dataset.len());
    let train_loader = DataLoader::new(trn_dataset, cfg.batch_size, true)?.with_seed(cfg.seed);
    let val_loader = DataLoader::new(val_dataset, cfg.batch_size, false)?;

    let steps_per_epoch = train_loader.batches_per_epoch();
    let validation_steps = val_loader.batches_per_epoch();
    tracing::info!(
        model = %arch,
        train_img_len = trn_len,
        val_img_len = val_len,
        epochs = cfg.epochs,
        batch_size = cfg.batch_size,
        steps_per_epoch,
        validation_steps,
        "starting training"
    );
    if steps_per_epoch == 0 {
        anyhow::bail!(
            "{} training images cannot fill one batch of {}",
            trn_len,
            cfg.batch_size
        );
    }
    if validation_steps == 0 {
        anyhow::bail!(
            "{} validation images cannot fill one batch of {}",
            val_len,
            cfg.batch_size
        );
    }

    let device = <ADBackend as Backend>::Device::default();
    let mut model = arch.build::<ADBackend>(&fcn_cfg, &device)?;
    let mut optim = SgdConfig::new()
        .with_momentum(Some(MomentumConfig {
            momentum: cfg.momentum,
            dampening: 0.0,
            nesterov: true,
        }))
        .with_weight_decay(Some(WeightDecayConfig::new(fcn_cfg.weight_decay)))
        .init();
    let objective = objective(cfg);

    let mut train_flow = train_loader.flow::<ADBackend>(&device);
    let mut val_flow = val_loader.flow::<TrainBackend>(&device);
    let mut best = BestCheckpoint::new(&cfg.log_dir);
    let mut summary = TrainSummary::default();

    for epoch in 1..=cfg.epochs {
        let mut losses = Vec::with_capacity(steps_per_epoch);
        let mut accs = Vec::with_capacity(steps_per_epoch);
        for _ in 0..steps_per_epoch {
            let batch = train_flow.next().context("training loader yielded no batch")??;
            let labels = batch.labels.context("training batch has no labels")?;
            let probs = model.forward(batch.images);
            let loss = objective.compute(labels.clone(), probs.clone());
            accs.push(scalar(pixel_accuracy(labels, probs.detach())));
            losses.push(scalar(loss.clone().detach()));

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let eval_model = model.valid();
        let (val_loss, val_acc) =
            evaluate(&eval_model, &mut val_flow, validation_steps, &objective)?;
        let metrics = EpochMetrics {
            epoch,
            loss: mean(&losses),
            acc: mean(&accs),
            val_loss,
            val_acc,
        };
        tracing::info!(
            epoch,
            loss = metrics.loss,
            acc = metrics.acc,
            val_loss,
            val_acc,
            "epoch finished"
        );

        if let Some(path) = best.observe(&metrics) {
            save_weights(&eval_model, &path)?;
            tracing::info!(path = %path.display(), val_acc, "saved checkpoint");
            summary.checkpoints.push(path);
        }
        summary.epochs.push(metrics);
    }

    tracing::info!(log_dir = %cfg.log_dir.display(), "saved weights");
    Ok(summary)
}
