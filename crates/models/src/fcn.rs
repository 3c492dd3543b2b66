//! Fully-convolutional segmentation heads over the VGG16 backbone.

use crate::error::ModelError;
use crate::registry::Architecture;
use crate::upsample::upsampler;
use crate::vgg::{Vgg16, VggConfig};
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d};
use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Coarsest backbone stride; inputs must divide evenly by it.
pub const BACKBONE_STRIDE: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct FcnConfig {
    pub classes: usize,
    /// Input (height, width).
    pub input_shape: (usize, usize),
    /// Initialize upsampling layers as bilinear interpolation.
    pub bilinear: bool,
    /// Dropout after fc6/fc7.
    pub drop_rate: f64,
    /// L2 penalty applied by the optimizer.
    pub weight_decay: f32,
    pub backbone: VggConfig,
}

impl Default for FcnConfig {
    fn default() -> Self {
        Self {
            classes: 21,
            input_shape: (224, 224),
            bilinear: true,
            drop_rate: 0.5,
            weight_decay: 5e-5,
            backbone: VggConfig::vgg16(),
        }
    }
}

impl FcnConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes == 0 {
            return Err(ModelError::InvalidConfig("classes must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.drop_rate) {
            return Err(ModelError::InvalidConfig(format!(
                "drop_rate must be in [0, 1), got {}",
                self.drop_rate
            )));
        }
        if self.backbone.widths.contains(&0) || self.backbone.fc_channels == 0 {
            return Err(ModelError::InvalidConfig(
                "backbone widths and fc_channels must be > 0".into(),
            ));
        }
        let (height, width) = self.input_shape;
        if height == 0
            || width == 0
            || height % BACKBONE_STRIDE != 0
            || width % BACKBONE_STRIDE != 0
        {
            return Err(ModelError::InvalidInputShape {
                height,
                width,
                stride: BACKBONE_STRIDE,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Module)]
pub struct Fcn<B: Backend> {
    backbone: Vgg16<B>,
    score_fr: Conv2d<B>,
    upscore2: Option<ConvTranspose2d<B>>,
    score_pool4: Option<Conv2d<B>>,
    upscore_pool4: Option<ConvTranspose2d<B>>,
    score_pool3: Option<Conv2d<B>>,
    upscore: ConvTranspose2d<B>,
    output_stride: usize,
    classes: usize,
}

impl<B: Backend> Fcn<B> {
    /// Build without validating; use [`Architecture::build`] for checked construction.
    pub(crate) fn new(arch: Architecture, cfg: &FcnConfig, device: &B::Device) -> Self {
        let classes = cfg.classes;
        let widths = cfg.backbone.widths;
        let stride = arch.output_stride();
        let score = |channels: usize| Conv2dConfig::new([channels, classes], [1, 1]).init(device);

        let backbone = Vgg16::new(&cfg.backbone, cfg.drop_rate, device);
        let score_fr = score(cfg.backbone.fc_channels);
        let (upscore2, score_pool4) = if stride <= 16 {
            (
                Some(upsampler(classes, 2, cfg.bilinear, device)),
                Some(score(widths[3])),
            )
        } else {
            (None, None)
        };
        let (upscore_pool4, score_pool3) = if stride <= 8 {
            (
                Some(upsampler(classes, 2, cfg.bilinear, device)),
                Some(score(widths[2])),
            )
        } else {
            (None, None)
        };
        let upscore = upsampler(classes, stride, cfg.bilinear, device);

        Self {
            backbone,
            score_fr,
            upscore2,
            score_pool4,
            upscore_pool4,
            score_pool3,
            upscore,
            output_stride: stride,
            classes,
        }
    }

    pub fn output_stride(&self) -> usize {
        self.output_stride
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    /// Per-pixel class scores, shape [batch, classes, height, width].
    pub fn forward_logits(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let features = self.backbone.forward(images);
        let mut score = self.score_fr.forward(features.fc7);
        if let (Some(up), Some(skip)) = (&self.upscore2, &self.score_pool4) {
            score = up.forward(score) + skip.forward(features.pool4);
        }
        if let (Some(up), Some(skip)) = (&self.upscore_pool4, &self.score_pool3) {
            score = up.forward(score) + skip.forward(features.pool3);
        }
        self.upscore.forward(score)
    }

    /// Class probabilities, shape [batch, height, width, classes]; each pixel sums to 1.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        softmax(self.forward_logits(images), 1)
            .swap_dims(1, 2)
            .swap_dims(2, 3)
    }

    /// Argmax class id per pixel, shape [batch, height, width].
    pub fn predict_labels(&self, images: Tensor<B, 4>) -> Tensor<B, 3, Int> {
        self.forward_logits(images).argmax(1).squeeze(1)
    }
}
