//! Learnable upsampling layers for the FCN heads.

use burn::module::Param;
use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Transposed convolution that scales spatial dims by exactly `factor` (even, or 1).
///
/// Kernel `2 * factor`, stride `factor`, padding `factor / 2`. With `bilinear`
/// the weights start as a per-channel bilinear interpolation kernel.
pub fn upsampler<B: Backend>(
    channels: usize,
    factor: usize,
    bilinear: bool,
    device: &B::Device,
) -> ConvTranspose2d<B> {
    let kernel = 2 * factor;
    let padding = factor / 2;
    let mut layer = ConvTranspose2dConfig::new([channels, channels], [kernel, kernel])
        .with_stride([factor, factor])
        .with_padding([padding, padding])
        .with_bias(false)
        .init(device);
    if bilinear {
        let weight = Tensor::<B, 4>::from_data(bilinear_kernel(channels, kernel), device);
        layer.weight = Param::from_tensor(weight);
    }
    layer
}

/// 1-D bilinear filter taps for a kernel of `size`.
pub fn bilinear_taps(size: usize) -> Vec<f32> {
    let factor = size.div_ceil(2) as f32;
    let center = if size % 2 == 1 {
        factor - 1.0
    } else {
        factor - 0.5
    };
    (0..size)
        .map(|i| 1.0 - (i as f32 - center).abs() / factor)
        .collect()
}

/// Weights `[channels, channels, size, size]` mapping each channel onto itself.
pub fn bilinear_kernel(channels: usize, size: usize) -> TensorData {
    let taps = bilinear_taps(size);
    let mut weights = vec![0.0f32; channels * channels * size * size];
    for c in 0..channels {
        let base = (c * channels + c) * size * size;
        for (y, ty) in taps.iter().enumerate() {
            for (x, tx) in taps.iter().enumerate() {
                weights[base + y * size + x] = ty * tx;
            }
        }
    }
    TensorData::new(weights, [channels, channels, size, size])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn taps_for_factor_two() {
        let taps = bilinear_taps(4);
        let expected = [0.25, 0.75, 0.75, 0.25];
        for (t, e) in taps.iter().zip(expected) {
            assert!((t - e).abs() < 1e-6);
        }
    }

    #[test]
    fn kernel_is_channel_diagonal() {
        let data = bilinear_kernel(2, 4).to_vec::<f32>().unwrap();
        // Cross-channel block (in 0 -> out 1) stays zero.
        assert!(data[16..32].iter().all(|v| *v == 0.0));
        assert!((data[5] - 0.5625).abs() < 1e-6);
    }

    #[test]
    fn bilinear_upsampling_preserves_constant_interior() {
        let device = Default::default();
        let layer = upsampler::<TestBackend>(1, 2, true, &device);
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let out = layer.forward(input);
        assert_eq!(out.dims(), [1, 1, 8, 8]);
        let values = out.into_data().to_vec::<f32>().unwrap();
        // Away from the border each output pixel receives full bilinear weight.
        assert!((values[3 * 8 + 3] - 1.0).abs() < 1e-5);
    }
}
