//! Paired image/label augmentation.

use image::{GrayImage, RgbImage};
use rand::{Rng, SeedableRng};

/// Randomized transforms applied to a resized image and its class-id map.
///
/// Geometric transforms touch both; photometric ones only the image.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    /// Probability of applying a horizontal flip.
    pub flip_horizontal_prob: f32,
    /// Probability of applying a light color jitter (brightness/contrast).
    pub color_jitter_prob: f32,
    /// Max jitter scale for brightness/contrast.
    pub color_jitter_strength: f32,
    /// Seed for reproducible augmentation; mixed with the sample index and epoch.
    pub seed: Option<u64>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self {
            flip_horizontal_prob: 0.5,
            color_jitter_prob: 0.0,
            color_jitter_strength: 0.1,
            seed: None,
        }
    }
}

impl TransformPipeline {
    /// Pipeline that never changes its input.
    pub fn identity() -> Self {
        Self {
            flip_horizontal_prob: 0.0,
            color_jitter_prob: 0.0,
            color_jitter_strength: 0.0,
            seed: None,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.flip_horizontal_prob <= 0.0
            && (self.color_jitter_prob <= 0.0 || self.color_jitter_strength <= 0.0)
    }

    pub fn describe(&self) -> String {
        format!(
            "flip_p={:.2} color_jitter_p={:.2} strength={:.2} seed={}",
            self.flip_horizontal_prob,
            self.color_jitter_prob,
            self.color_jitter_strength,
            self.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }

    pub(crate) fn apply(
        &self,
        img: &mut RgbImage,
        label: Option<&mut GrayImage>,
        index: usize,
        epoch: usize,
    ) {
        if self.is_identity() {
            return;
        }
        // Seeded: deterministic per (sample index, epoch). Otherwise thread-local.
        let mut rng_local;
        let mut seeded_rng;
        let rng: &mut dyn rand::RngCore = if let Some(seed) = self.seed {
            seeded_rng = rand::rngs::StdRng::seed_from_u64(sample_seed(seed, index, epoch));
            &mut seeded_rng
        } else {
            rng_local = rand::rng();
            &mut rng_local
        };

        maybe_hflip(img, label, self.flip_horizontal_prob, rng);
        maybe_jitter(
            img,
            self.color_jitter_prob,
            self.color_jitter_strength,
            rng,
        );
    }
}

/// Per-sample seed; the epoch occupies the high half so it never cancels the index.
fn sample_seed(seed: u64, index: usize, epoch: usize) -> u64 {
    seed ^ index as u64 ^ ((epoch as u64) << 32)
}

#[derive(Debug, Clone)]
pub struct TransformPipelineBuilder {
    inner: TransformPipeline,
}

impl Default for TransformPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPipelineBuilder {
    pub fn new() -> Self {
        Self {
            inner: TransformPipeline::default(),
        }
    }
    pub fn flip_horizontal_prob(mut self, p: f32) -> Self {
        self.inner.flip_horizontal_prob = p;
        self
    }
    pub fn color_jitter(mut self, prob: f32, strength: f32) -> Self {
        self.inner.color_jitter_prob = prob;
        self.inner.color_jitter_strength = strength;
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.inner.seed = seed;
        self
    }
    pub fn build(self) -> TransformPipeline {
        self.inner
    }
}

pub(crate) fn maybe_hflip(
    img: &mut RgbImage,
    label: Option<&mut GrayImage>,
    prob: f32,
    rng: &mut dyn rand::RngCore,
) {
    if prob <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) < prob {
        image::imageops::flip_horizontal_in_place(img);
        if let Some(label) = label {
            image::imageops::flip_horizontal_in_place(label);
        }
    }
}

pub(crate) fn maybe_jitter(
    img: &mut RgbImage,
    prob: f32,
    strength: f32,
    rng: &mut dyn rand::RngCore,
) {
    if prob <= 0.0 || strength <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) >= prob {
        return;
    }
    let bright = 1.0 + rng.random_range(-strength..strength);
    let contrast = 1.0 + rng.random_range(-strength..strength);
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            let mut v = (v - 0.5) * contrast + 0.5;
            v *= bright;
            pixel[c] = (v.clamp(0.0, 1.0) * 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod aug_tests {
    use super::*;
    use image::{Luma, Rgb};
    use rand::rng;

    #[test]
    fn hflip_moves_image_and_label_together() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let mut label = GrayImage::new(2, 1);
        label.put_pixel(0, 0, Luma([7]));

        let mut rng = rng();
        maybe_hflip(&mut img, Some(&mut label), 1.0, &mut rng);

        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 0, 0]));
        assert_eq!(label.get_pixel(1, 0), &Luma([7]));
        assert_eq!(label.get_pixel(0, 0), &Luma([0]));
    }

    #[test]
    fn seeded_pipeline_is_reproducible_per_index() {
        let pipeline = TransformPipelineBuilder::new()
            .flip_horizontal_prob(0.5)
            .color_jitter(1.0, 0.3)
            .seed(Some(7))
            .build();
        let base = RgbImage::from_fn(4, 4, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 90]));

        let mut a = base.clone();
        let mut b = base.clone();
        pipeline.apply(&mut a, None, 3, 2);
        pipeline.apply(&mut b, None, 3, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_pipeline_varies_across_epochs() {
        let pipeline = TransformPipelineBuilder::new()
            .flip_horizontal_prob(0.5)
            .seed(Some(3))
            .build();
        let base = RgbImage::from_fn(4, 1, |x, _| Rgb([(x * 60) as u8, 0, 0]));
        let outcomes: std::collections::BTreeSet<Vec<u8>> = (0..16)
            .map(|epoch| {
                let mut img = base.clone();
                pipeline.apply(&mut img, None, 0, epoch);
                img.into_raw()
            })
            .collect();
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn epoch_and_index_do_not_collide() {
        assert_ne!(sample_seed(9, 1, 0), sample_seed(9, 0, 1));
        assert_eq!(sample_seed(9, 4, 0), 9 ^ 4);
    }

    #[test]
    fn identity_pipeline_leaves_input_untouched() {
        let base = RgbImage::from_pixel(3, 3, Rgb([12, 34, 56]));
        let mut img = base.clone();
        TransformPipeline::identity().apply(&mut img, None, 0, 0);
        assert_eq!(img, base);
    }
}
