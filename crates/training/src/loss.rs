//! Pixelwise objectives and metrics over `[batch, height, width, classes]` tensors.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Lower clamp applied to predicted probabilities before the log.
pub const EPSILON: f32 = 1e-7;

/// Raw PASCAL VOC per-class weights, background first.
pub const VOC_CLASS_WEIGHT: [f32; 21] = [
    1.0, 51.0, 151.0, 43.0, 64.0, 83.0, 23.0, 31.0, 15.0, 47.0, 51.0, 47.0, 25.0, 47.0, 36.0,
    10.0, 86.0, 49.0, 46.0, 27.0, 51.0,
];

/// Normalize raw class weights so they sum to 1.
///
/// An all-zero input is returned unchanged.
pub fn make_weight_map(weights: &[f32]) -> Vec<f32> {
    let total: f32 = weights.iter().sum();
    if total == 0.0 {
        return weights.to_vec();
    }
    weights.iter().map(|w| w / total).collect()
}

/// Cross-entropy averaged over every pixel in the batch.
pub fn pixelwise_crossentropy<B: Backend>(
    y_true: Tensor<B, 4>,
    y_pred: Tensor<B, 4>,
) -> Tensor<B, 1> {
    let [batch, height, width, _] = y_pred.dims();
    let pixels = (batch * height * width) as f32;
    (y_true * y_pred.clamp(EPSILON, 1.0).log())
        .sum()
        .neg()
        .div_scalar(pixels)
}

/// Class-weighted cross-entropy summed over the batch and divided by `height * width`.
///
/// `weights` has one entry per class. The divisor leaves out the batch size, so with
/// unit weights this equals [`pixelwise_crossentropy`] only for a batch of one; a
/// batch of `n` gives `n` times the plain mean.
pub fn weighted_pixelwise_crossentropy<B: Backend>(
    y_true: Tensor<B, 4>,
    y_pred: Tensor<B, 4>,
    weights: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let [_, height, width, classes] = y_pred.dims();
    let weights = weights.reshape([1, 1, 1, classes]);
    (y_true * y_pred.clamp(EPSILON, 1.0).log() * weights)
        .sum()
        .neg()
        .div_scalar((height * width) as f32)
}

/// Fraction of pixels whose predicted class matches the one-hot target.
pub fn pixel_accuracy<B: Backend>(y_true: Tensor<B, 4>, y_pred: Tensor<B, 4>) -> Tensor<B, 1> {
    y_true
        .argmax(3)
        .equal(y_pred.argmax(3))
        .float()
        .mean()
}

/// Training objective selected by configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    CrossEntropy,
    /// Normalized per-class weights.
    Weighted(Vec<f32>),
}

impl Objective {
    pub fn compute<B: Backend>(&self, y_true: Tensor<B, 4>, y_pred: Tensor<B, 4>) -> Tensor<B, 1> {
        match self {
            Objective::CrossEntropy => pixelwise_crossentropy(y_true, y_pred),
            Objective::Weighted(weights) => {
                let device = y_pred.device();
                let weights = Tensor::<B, 1>::from_data(
                    TensorData::new(weights.clone(), [weights.len()]),
                    &device,
                );
                weighted_pixelwise_crossentropy(y_true, y_pred, weights)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_data().to_vec::<f32>().unwrap()[0]
    }

    /// Two pixels, two classes: targets [0, 1], predictions favor class 0 on both.
    fn two_pixels() -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 4>) {
        let y_true = tensor(vec![1.0, 0.0, 0.0, 1.0], [1, 1, 2, 2]);
        let y_pred = tensor(vec![0.8, 0.2, 0.6, 0.4], [1, 1, 2, 2]);
        (y_true, y_pred)
    }

    #[test]
    fn weight_map_sums_to_one() {
        let map = make_weight_map(&VOC_CLASS_WEIGHT);
        assert_eq!(map.len(), 21);
        assert!((map.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((map[2] / map[0] - 151.0).abs() < 1e-3);
    }

    #[test]
    fn plain_crossentropy_matches_hand_computation() {
        let (y_true, y_pred) = two_pixels();
        let expected = -(0.8f32.ln() + 0.4f32.ln()) / 2.0;
        assert!((scalar(pixelwise_crossentropy(y_true, y_pred)) - expected).abs() < 1e-5);
    }

    #[test]
    fn uniform_weights_reduce_to_plain_crossentropy_at_batch_one() {
        let (y_true, y_pred) = two_pixels();
        let ones = Tensor::<TestBackend, 1>::ones([2], &Default::default());
        let weighted = scalar(weighted_pixelwise_crossentropy(
            y_true.clone(),
            y_pred.clone(),
            ones,
        ));
        let plain = scalar(pixelwise_crossentropy(y_true, y_pred));
        assert!((weighted - plain).abs() < 1e-6);
    }

    #[test]
    fn weighted_loss_is_normalized_by_pixels_not_batch() {
        let y_true = tensor(vec![1.0, 0.0, 1.0, 0.0], [2, 1, 1, 2]);
        let y_pred = tensor(vec![0.5, 0.5, 0.5, 0.5], [2, 1, 1, 2]);
        let weights = Tensor::<TestBackend, 1>::from_floats([2.0, 1.0], &Default::default());
        let loss = scalar(weighted_pixelwise_crossentropy(y_true, y_pred, weights));
        // Two samples of one pixel each, both summed over a single-pixel area.
        assert!((loss - 4.0 * 2.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn uniform_weights_scale_with_batch_size() {
        let y_true = tensor(vec![1.0, 0.0, 0.0, 1.0], [2, 1, 1, 2]);
        let y_pred = tensor(vec![0.8, 0.2, 0.4, 0.6], [2, 1, 1, 2]);
        let ones = Tensor::<TestBackend, 1>::ones([2], &Default::default());
        let weighted = scalar(weighted_pixelwise_crossentropy(
            y_true.clone(),
            y_pred.clone(),
            ones,
        ));
        let plain = scalar(pixelwise_crossentropy(y_true, y_pred));
        assert!((weighted - 2.0 * plain).abs() < 1e-5);
    }

    #[test]
    fn zero_probability_is_clamped() {
        let y_true = tensor(vec![1.0, 0.0], [1, 1, 1, 2]);
        let y_pred = tensor(vec![0.0, 1.0], [1, 1, 1, 2]);
        let loss = scalar(pixelwise_crossentropy(y_true, y_pred));
        assert!(loss.is_finite());
        assert!((loss + EPSILON.ln()).abs() < 1e-3);
    }

    #[test]
    fn accuracy_counts_matching_argmax() {
        let (y_true, y_pred) = two_pixels();
        assert!((scalar(pixel_accuracy(y_true, y_pred)) - 0.5).abs() < 1e-6);
    }
}
