//! VGG16 convolutional backbone with fully-convolutional fc6/fc7.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// 3x3 convolutions per block, VGG16 layout.
pub const CONVS_PER_BLOCK: [usize; 5] = [2, 2, 3, 3, 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VggConfig {
    /// Output channels of the five conv blocks.
    pub widths: [usize; 5],
    /// Channels of the fc6/fc7 layers expressed as convolutions.
    pub fc_channels: usize,
}

impl VggConfig {
    pub fn vgg16() -> Self {
        Self {
            widths: [64, 128, 256, 512, 512],
            fc_channels: 4096,
        }
    }
}

impl Default for VggConfig {
    fn default() -> Self {
        Self::vgg16()
    }
}

#[derive(Debug, Module)]
pub struct VggBlock<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pool: MaxPool2d,
}

impl<B: Backend> VggBlock<B> {
    fn new(in_channels: usize, out_channels: usize, depth: usize, device: &B::Device) -> Self {
        let mut convs = Vec::with_capacity(depth);
        let mut channels = in_channels;
        for _ in 0..depth {
            convs.push(
                Conv2dConfig::new([channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            channels = out_channels;
        }
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        Self { convs, pool }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = input;
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }
        self.pool.forward(x)
    }
}

/// Intermediate maps the FCN heads read from.
pub struct VggFeatures<B: Backend> {
    /// Stride 8.
    pub pool3: Tensor<B, 4>,
    /// Stride 16.
    pub pool4: Tensor<B, 4>,
    /// Stride 32, after fc6/fc7.
    pub fc7: Tensor<B, 4>,
}

#[derive(Debug, Module)]
pub struct Vgg16<B: Backend> {
    blocks: Vec<VggBlock<B>>,
    fc6: Conv2d<B>,
    fc7: Conv2d<B>,
    dropout: Dropout,
}

impl<B: Backend> Vgg16<B> {
    pub fn new(cfg: &VggConfig, drop_rate: f64, device: &B::Device) -> Self {
        let mut blocks = Vec::with_capacity(5);
        let mut channels = 3;
        for (width, depth) in cfg.widths.iter().zip(CONVS_PER_BLOCK) {
            blocks.push(VggBlock::new(channels, *width, depth, device));
            channels = *width;
        }
        let fc6 = Conv2dConfig::new([channels, cfg.fc_channels], [7, 7])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .init(device);
        let fc7 = Conv2dConfig::new([cfg.fc_channels, cfg.fc_channels], [1, 1]).init(device);
        let dropout = DropoutConfig::new(drop_rate).init();
        Self {
            blocks,
            fc6,
            fc7,
            dropout,
        }
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> VggFeatures<B> {
        // blocks always holds the five VGG stages built in `new`.
        let pool3 = self.blocks[..3]
            .iter()
            .fold(images, |x, block| block.forward(x));
        let pool4 = self.blocks[3].forward(pool3.clone());
        let pool5 = self.blocks[4].forward(pool4.clone());
        let x = self.dropout.forward(relu(self.fc6.forward(pool5)));
        let fc7 = self.dropout.forward(relu(self.fc7.forward(x)));
        VggFeatures { pool3, pool4, fc7 }
    }
}
