use cli_support::{BackboneSection, LossKind, TrainConfig};
use image::{Rgb, RgbImage};
use models::{latest_checkpoint, CheckpointName};
use std::fs;
use std::path::{Path, PathBuf};
use training::run_train;
use vision_core::palette::voc_color;

fn write_split(root: &Path, name: &str, count: usize) -> anyhow::Result<(PathBuf, PathBuf)> {
    let img_dir = root.join(name).join("img");
    let gt_dir = root.join(name).join("gt");
    fs::create_dir_all(&img_dir)?;
    fs::create_dir_all(&gt_dir)?;
    for i in 0..count {
        let class = (i % 2 + 1) as u8;
        let img = RgbImage::from_fn(40, 36, |x, y| {
            if x < 20 {
                Rgb([200, (y * 5) as u8, 30 * class])
            } else {
                Rgb([20, 20, (x * 3) as u8])
            }
        });
        img.save(img_dir.join(format!("{i:04}.png")))?;
        let gt = RgbImage::from_fn(40, 36, |x, _| {
            if x < 20 {
                voc_color(class)
            } else {
                voc_color(0)
            }
        });
        gt.save(gt_dir.join(format!("{i:04}.png")))?;
    }
    Ok((img_dir, gt_dir))
}

fn tiny_config(root: &Path, model: &str, train: usize, val: usize) -> anyhow::Result<TrainConfig> {
    let (train_img_dir, train_gt_dir) = write_split(root, "train", train)?;
    let (val_img_dir, val_gt_dir) = write_split(root, "val", val)?;
    Ok(TrainConfig {
        model: model.into(),
        train_img_dir,
        train_gt_dir,
        val_img_dir,
        val_gt_dir,
        epochs: 2,
        batch_size: 2,
        log_dir: root.join("logs"),
        classes: 3,
        input_size: 32,
        bilinear: true,
        drop_rate: 0.5,
        weight_decay: 5e-5,
        learning_rate: 1e-3,
        momentum: 0.9,
        loss: LossKind::CategoricalCrossentropy,
        class_weights: None,
        seed: Some(3),
        backbone: Some(BackboneSection {
            widths: [2, 2, 4, 4, 4],
            fc_channels: 8,
        }),
    })
}

#[test]
fn trains_and_writes_best_checkpoint() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), "vgg_fcn8s", 4, 2)?;
    let summary = run_train(&cfg)?;

    assert_eq!(summary.epochs.len(), 2);
    assert_eq!(summary.epochs[0].epoch, 1);
    for m in &summary.epochs {
        assert!(m.loss.is_finite() && m.val_loss.is_finite());
        assert!((0.0..=1.0).contains(&m.acc) && (0.0..=1.0).contains(&m.val_acc));
    }

    // The first epoch always improves on "no checkpoint yet".
    assert!(!summary.checkpoints.is_empty());
    for path in &summary.checkpoints {
        assert!(path.is_file(), "{}", path.display());
    }
    let latest = latest_checkpoint(&cfg.log_dir)?.expect("checkpoint on disk");
    assert_eq!(Some(&latest), summary.checkpoints.last());
    let name = latest
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(CheckpointName::parse)
        .expect("parsable checkpoint name");
    assert_eq!(Some(name.epoch), summary.best().map(|m| m.epoch));
    Ok(())
}

#[test]
fn weighted_objective_trains_too() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut cfg = tiny_config(tmp.path(), "vgg_fcn32s", 2, 2)?;
    cfg.epochs = 1;
    cfg.loss = LossKind::WeightedCategoricalCrossentropy;
    cfg.class_weights = Some(vec![1.0, 5.0, 5.0]);
    let summary = run_train(&cfg)?;
    assert_eq!(summary.epochs.len(), 1);
    assert!(summary.epochs[0].loss.is_finite());
    Ok(())
}

#[test]
fn validation_split_smaller_than_a_batch_is_fatal() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), "vgg_fcn16s", 4, 1)?;
    let err = run_train(&cfg).unwrap_err();
    assert!(err.to_string().contains("validation images"), "{err}");
    Ok(())
}

#[test]
fn unknown_model_name_is_fatal() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), "vgg_fcn2s", 2, 2)?;
    assert!(run_train(&cfg).is_err());
    Ok(())
}
