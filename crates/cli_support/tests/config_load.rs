use std::fs;
use std::path::{Path, PathBuf};

use cli_support::{ConfigError, LossKind, PredictConfig, TrainConfig};

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("args.json");
    fs::write(&path, contents).expect("write temp config");
    path
}

const FULL: &str = r#"{
    "train": {
        "model": "vgg_fcn8s",
        "train_img_dir": "voc/train/img",
        "train_gt_dir": "voc/train/gt",
        "val_img_dir": "voc/val/img",
        "val_gt_dir": "voc/val/gt",
        "epochs": 3,
        "batch_size": 4,
        "log_dir": "logs",
        "loss": "weighted_categorical_crossentropy",
        "backbone": { "widths": [4, 4, 8, 8, 8], "fc_channels": 16 }
    },
    "predict": {
        "model": "vgg_fcn8s",
        "img_dir": "voc/val/img",
        "log_dir": "logs"
    }
}"#;

#[test]
fn loads_train_section_with_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = TrainConfig::load(&write_config(dir.path(), FULL))?;
    assert_eq!(cfg.model, "vgg_fcn8s");
    assert_eq!(cfg.epochs, 3);
    assert_eq!(cfg.classes, 21);
    assert_eq!(cfg.input_size, 224);
    assert!(cfg.bilinear);
    assert_eq!(cfg.loss, LossKind::WeightedCategoricalCrossentropy);
    assert_eq!(cfg.class_weights, None);

    let fcn = cfg.fcn_config();
    assert_eq!(fcn.input_shape, (224, 224));
    assert_eq!(fcn.backbone.widths, [4, 4, 8, 8, 8]);
    assert!((fcn.weight_decay - 5e-5).abs() < 1e-12);
    Ok(())
}

#[test]
fn loads_predict_section_with_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = PredictConfig::load(&write_config(dir.path(), FULL))?;
    assert_eq!(cfg.image_index, 1);
    assert_eq!(cfg.output_dir, PathBuf::from("."));
    assert_eq!(cfg.gt_dir, None);
    assert_eq!(cfg.fcn_config().backbone.fc_channels, 4096);
    Ok(())
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = TrainConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_json_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = TrainConfig::load(&write_config(dir.path(), "{ \"train\": ")).unwrap_err();
    assert!(matches!(err, ConfigError::Json { .. }));
}

#[test]
fn missing_section_and_missing_key_are_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(dir.path(), r#"{ "predict": { "model": "vgg_fcn32s" } }"#);
    assert!(matches!(
        TrainConfig::load(&path).unwrap_err(),
        ConfigError::MissingSection { section: "train", .. }
    ));
    // img_dir and log_dir are required.
    assert!(matches!(
        PredictConfig::load(&path).unwrap_err(),
        ConfigError::InvalidSection { section: "predict", .. }
    ));
}

#[test]
fn wrongly_typed_or_out_of_range_values_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let typed = FULL.replace("\"epochs\": 3", "\"epochs\": \"three\"");
    assert!(matches!(
        TrainConfig::load(&write_config(dir.path(), &typed)).unwrap_err(),
        ConfigError::InvalidSection { .. }
    ));

    let zero_batch = FULL.replace("\"batch_size\": 4", "\"batch_size\": 0");
    assert!(matches!(
        TrainConfig::load(&write_config(dir.path(), &zero_batch)).unwrap_err(),
        ConfigError::Invalid(_)
    ));

    let bad_weights = FULL.replace("\"epochs\": 3", "\"epochs\": 3, \"class_weights\": [1.0, 2.0]");
    assert!(matches!(
        TrainConfig::load(&write_config(dir.path(), &bad_weights)).unwrap_err(),
        ConfigError::Invalid(_)
    ));
}
