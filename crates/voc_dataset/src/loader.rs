//! Shuffled, batched, endlessly repeating traversal of a dataset.

use crate::dataset::SegmentationDataset;
use crate::labels::one_hot_hwc;
use crate::types::{DatasetResult, RawSample, SegDatasetError};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Emit a progress line after this many batches.
const LOG_EVERY_BATCHES: usize = 100;

pub struct SegBatch<B: Backend> {
    /// Shape: [batch, 3, height, width].
    pub images: Tensor<B, 4>,
    /// One-hot labels, shape: [batch, height, width, classes]; absent in inference mode.
    pub labels: Option<Tensor<B, 4>>,
    /// Dataset indices in batch order.
    pub indices: Vec<usize>,
    /// Zero-based epoch this batch belongs to.
    pub epoch: usize,
}

#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: SegmentationDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
}

impl DataLoader {
    pub fn new(
        dataset: SegmentationDataset,
        batch_size: usize,
        shuffle: bool,
    ) -> DatasetResult<Self> {
        if batch_size == 0 {
            return Err(SegDatasetError::InvalidBatchSize);
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle,
            drop_last: true,
            seed: None,
        })
    }

    /// Seed for reproducible epoch permutations.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Drop the trailing partial batch of each epoch (default: true).
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn dataset(&self) -> &SegmentationDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batches_per_epoch(&self) -> usize {
        let len = self.dataset.len();
        if self.drop_last {
            len / self.batch_size
        } else {
            len.div_ceil(self.batch_size)
        }
    }

    /// Endless batch iterator; each epoch re-permutes the order when shuffling.
    ///
    /// Yields nothing when the dataset cannot fill a single batch.
    pub fn flow<B: Backend>(&self, device: &B::Device) -> Flow<'_, B> {
        let rng = match self.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
        };
        let now = Instant::now();
        Flow {
            loader: self,
            device: device.clone(),
            order: Vec::new(),
            cursor: 0,
            epoch: 0,
            started_epoch: false,
            rng,
            processed_batches: 0,
            processed_samples: 0,
            total_load_time: Duration::ZERO,
            started: now,
        }
    }
}

pub struct Flow<'a, B: Backend> {
    loader: &'a DataLoader,
    device: B::Device,
    order: Vec<usize>,
    cursor: usize,
    epoch: usize,
    started_epoch: bool,
    rng: rand::rngs::StdRng,
    processed_batches: usize,
    processed_samples: usize,
    total_load_time: Duration,
    started: Instant,
}

impl<B: Backend> Flow<'_, B> {
    fn start_epoch(&mut self) {
        if self.started_epoch {
            self.epoch += 1;
        }
        self.started_epoch = true;
        self.order = (0..self.loader.dataset.len()).collect();
        if self.loader.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor = 0;
    }

    fn next_indices(&mut self) -> Option<Vec<usize>> {
        if self.loader.batches_per_epoch() == 0 {
            return None;
        }
        let batch_size = self.loader.batch_size;
        let remaining = self.order.len().saturating_sub(self.cursor);
        let exhausted = remaining == 0 || (self.loader.drop_last && remaining < batch_size);
        if !self.started_epoch || exhausted {
            self.start_epoch();
        }
        let end = (self.cursor + batch_size).min(self.order.len());
        let indices = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(indices)
    }

    fn assemble(&mut self, indices: Vec<usize>) -> DatasetResult<SegBatch<B>> {
        let loader = self.loader;
        let dataset = &loader.dataset;
        let epoch = self.epoch;
        let t_load = Instant::now();
        let samples = indices
            .par_iter()
            .map(|&i| dataset.load_raw_at_epoch(i, epoch))
            .collect::<DatasetResult<Vec<RawSample>>>()?;
        self.total_load_time += t_load.elapsed();

        let first = samples.first().ok_or(SegDatasetError::EmptyBatch)?;
        let (w, h) = (first.width as usize, first.height as usize);
        let classes = dataset.classes();
        let batch_len = samples.len();

        let mut images_buf = Vec::with_capacity(batch_len * 3 * w * h);
        let mut labels_buf = Vec::with_capacity(batch_len * h * w * classes);
        for sample in &samples {
            images_buf.extend_from_slice(&sample.image_chw);
            if let Some(ids) = &sample.label {
                labels_buf.extend(one_hot_hwc(ids, classes));
            }
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(images_buf, [batch_len, 3, h, w]),
            &self.device,
        );
        let labels = dataset.has_labels().then(|| {
            Tensor::<B, 4>::from_data(
                TensorData::new(labels_buf, [batch_len, h, w, classes]),
                &self.device,
            )
        });

        self.processed_batches += 1;
        self.processed_samples += batch_len;
        if self.processed_batches % LOG_EVERY_BATCHES == 0 {
            let secs = self.started.elapsed().as_secs_f32().max(0.001);
            tracing::debug!(
                epoch = self.epoch,
                batches = self.processed_batches,
                samples = self.processed_samples,
                img_per_sec = self.processed_samples as f32 / secs,
                avg_load_ms = (self.total_load_time.as_secs_f64() * 1000.0)
                    / self.processed_batches as f64,
                "data loader progress"
            );
        }

        Ok(SegBatch {
            images,
            labels,
            indices,
            epoch: self.epoch,
        })
    }
}

impl<B: Backend> Iterator for Flow<'_, B> {
    type Item = DatasetResult<SegBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.next_indices()?;
        Some(self.assemble(indices))
    }
}
