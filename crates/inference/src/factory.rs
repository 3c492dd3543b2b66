use crate::InferenceBackend;
use anyhow::Context;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use models::{latest_checkpoint, load_weights, Architecture, Fcn, FcnConfig};
use std::path::{Path, PathBuf};

/// FCN ready for inference, with the checkpoint its weights came from.
pub struct Segmenter {
    model: Fcn<InferenceBackend>,
    checkpoint: Option<PathBuf>,
    device: <InferenceBackend as Backend>::Device,
}

impl Segmenter {
    /// `None` when running on freshly initialized weights.
    pub fn checkpoint(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }

    /// Argmax class id per pixel for one CHW image in 0..1, row-major.
    pub fn segment(
        &self,
        image_chw: &[f32],
        width: usize,
        height: usize,
    ) -> anyhow::Result<Vec<u8>> {
        let input = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(image_chw.to_vec(), [1, 3, height, width]),
            &self.device,
        );
        let labels = self
            .model
            .predict_labels(input)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("failed to read predicted labels: {e:?}"))?;
        Ok(labels
            .into_iter()
            .map(|id| u8::try_from(id).unwrap_or(0))
            .collect())
    }
}

/// Builds segmenters from a model name and the newest checkpoint in a log directory.
pub struct SegmenterFactory;

impl SegmenterFactory {
    /// Without a checkpoint the model keeps its random initialization; a checkpoint
    /// that exists but fails to load is an error.
    pub fn build(
        &self,
        model: &str,
        cfg: &FcnConfig,
        log_dir: &Path,
    ) -> anyhow::Result<Segmenter> {
        let device = <InferenceBackend as Backend>::Device::default();
        let arch = Architecture::from_name(model)?;
        let fcn = arch.build::<InferenceBackend>(cfg, &device)?;

        let checkpoint = latest_checkpoint(log_dir)?;
        let model = match &checkpoint {
            Some(path) => {
                let model = load_weights(fcn, path, &device)
                    .with_context(|| format!("failed to load weights for {arch}"))?;
                tracing::info!(arch = %arch, checkpoint = %path.display(), "loaded weights");
                model
            }
            None => {
                tracing::warn!(
                    arch = %arch,
                    log_dir = %log_dir.display(),
                    "no checkpoint found; predicting with untrained weights"
                );
                fcn
            }
        };
        Ok(Segmenter {
            model,
            checkpoint,
            device,
        })
    }
}
