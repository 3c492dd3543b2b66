//! Indexed access to image/label pairs on disk.

use crate::aug::TransformPipeline;
use crate::labels::{decode_label_map, one_hot_hwc};
use crate::types::{DatasetResult, RawSample, Sample, SegDatasetError};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::imageops::FilterType;
use image::{GrayImage, ImageError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions recognized as images, in label-lookup preference order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Number of classes for one-hot encoding.
    pub classes: usize,
    /// Target (width, height) every sample is resized to.
    pub input_size: (u32, u32),
    pub img_dir: PathBuf,
    /// Ground-truth directory; `None` in inference mode.
    pub label_dir: Option<PathBuf>,
    /// Enable randomized augmentation.
    pub augment: bool,
    /// Seed for reproducible augmentation.
    pub seed: Option<u64>,
    /// Optional transform override; if None, the default pipeline is used when `augment` is set.
    pub transform: Option<TransformPipeline>,
}

impl DatasetConfig {
    pub fn new(classes: usize, input_size: (u32, u32), img_dir: impl Into<PathBuf>) -> Self {
        Self {
            classes,
            input_size,
            img_dir: img_dir.into(),
            label_dir: None,
            augment: false,
            seed: None,
            transform: None,
        }
    }

    pub fn with_label_dir(mut self, label_dir: Option<PathBuf>) -> Self {
        self.label_dir = label_dir;
        self
    }

    pub fn with_augment(mut self, augment: bool) -> Self {
        self.augment = augment;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_transform(mut self, transform: TransformPipeline) -> Self {
        self.transform = Some(transform);
        self
    }

    fn pipeline(&self) -> TransformPipeline {
        if !self.augment {
            return TransformPipeline::identity();
        }
        let mut pipeline = self.transform.clone().unwrap_or_default();
        if pipeline.seed.is_none() {
            pipeline.seed = self.seed;
        }
        pipeline
    }
}

#[derive(Debug, Clone)]
struct PairIndex {
    image: PathBuf,
    label: Option<PathBuf>,
}

/// Fixed-length, immutable collection of image/label file pairs.
///
/// Index `i` maps to the same file pair for the lifetime of the instance;
/// files are decoded lazily on each access.
#[derive(Debug, Clone)]
pub struct SegmentationDataset {
    cfg: DatasetConfig,
    pairs: Vec<PairIndex>,
    pipeline: TransformPipeline,
}

impl SegmentationDataset {
    pub fn open(cfg: DatasetConfig) -> DatasetResult<Self> {
        let images = list_images(&cfg.img_dir)?;
        let pairs = match &cfg.label_dir {
            None => images
                .into_iter()
                .map(|image| PairIndex { image, label: None })
                .collect(),
            Some(label_dir) => {
                let labels = labels_by_stem(label_dir)?;
                images
                    .into_iter()
                    .map(|image| {
                        let label = file_stem(&image)
                            .and_then(|stem| labels.get(stem))
                            .cloned()
                            .ok_or_else(|| SegDatasetError::MissingLabel {
                                image: image.clone(),
                                label_dir: label_dir.clone(),
                            })?;
                        Ok(PairIndex {
                            image,
                            label: Some(label),
                        })
                    })
                    .collect::<DatasetResult<Vec<_>>>()?
            }
        };
        let pipeline = cfg.pipeline();
        tracing::debug!(
            img_dir = %cfg.img_dir.display(),
            samples = pairs.len(),
            augment = %pipeline.describe(),
            "indexed segmentation dataset"
        );
        Ok(Self {
            cfg,
            pairs,
            pipeline,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn classes(&self) -> usize {
        self.cfg.classes
    }

    pub fn has_labels(&self) -> bool {
        self.cfg.label_dir.is_some()
    }

    pub fn image_path(&self, index: usize) -> Option<&Path> {
        self.pairs.get(index).map(|p| p.image.as_path())
    }

    /// Decode, resize and (optionally) augment one sample on the host.
    ///
    /// Equivalent to [`SegmentationDataset::load_raw_at_epoch`] at epoch 0.
    pub fn load_raw(&self, index: usize) -> DatasetResult<RawSample> {
        self.load_raw_at_epoch(index, 0)
    }

    /// Like [`SegmentationDataset::load_raw`]; seeded augmentation draws a fresh
    /// transform for every `epoch`.
    pub fn load_raw_at_epoch(&self, index: usize, epoch: usize) -> DatasetResult<RawSample> {
        let pair = self
            .pairs
            .get(index)
            .ok_or(SegDatasetError::IndexOutOfRange {
                index,
                len: self.pairs.len(),
            })?;
        let (width, height) = self.cfg.input_size;

        let img = open_image(&pair.image)?.to_rgb8();
        let mut img = image::imageops::resize(&img, width, height, FilterType::Triangle);

        let mut label = match &pair.label {
            Some(path) => {
                let ids = load_label_map(path, self.cfg.input_size, self.cfg.classes)?;
                GrayImage::from_raw(width, height, ids)
            }
            None => None,
        };

        self.pipeline.apply(&mut img, label.as_mut(), index, epoch);

        let plane = (width * height) as usize;
        let mut image_chw = vec![0.0f32; plane * 3];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = (y * width + x) as usize;
            image_chw[base] = pixel[0] as f32 / 255.0;
            image_chw[plane + base] = pixel[1] as f32 / 255.0;
            image_chw[2 * plane + base] = pixel[2] as f32 / 255.0;
        }

        Ok(RawSample {
            image_chw,
            width,
            height,
            label: label.map(GrayImage::into_raw),
        })
    }

    /// Load one sample as batch-shaped tensors.
    pub fn get<B: Backend>(&self, index: usize, device: &B::Device) -> DatasetResult<Sample<B>> {
        let raw = self.load_raw(index)?;
        let (w, h) = (raw.width as usize, raw.height as usize);
        let image = Tensor::<B, 4>::from_data(TensorData::new(raw.image_chw, [1, 3, h, w]), device);
        let label = raw.label.map(|ids| {
            let classes = self.cfg.classes;
            Tensor::<B, 4>::from_data(
                TensorData::new(one_hot_hwc(&ids, classes), [1, h, w, classes]),
                device,
            )
        });
        Ok(Sample { image, label })
    }
}

/// Decode the label image at `path` into class ids at `size` (width, height).
pub fn load_label_map(path: &Path, size: (u32, u32), classes: usize) -> DatasetResult<Vec<u8>> {
    let raw = open_image(path)?.to_rgb8();
    // Nearest keeps every pixel an existing class color.
    let resized = image::imageops::resize(&raw, size.0, size.1, FilterType::Nearest);
    Ok(decode_label_map(&resized, classes))
}

/// Label file in `label_dir` whose stem matches `image`, if any.
pub fn find_label(label_dir: &Path, image: &Path) -> DatasetResult<Option<PathBuf>> {
    let Some(stem) = file_stem(image) else {
        return Ok(None);
    };
    Ok(labels_by_stem(label_dir)?.remove(stem))
}

fn open_image(path: &Path) -> DatasetResult<image::DynamicImage> {
    image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => SegDatasetError::MissingFile {
            path: path.to_path_buf(),
            source,
        },
        other => SegDatasetError::Image {
            path: path.to_path_buf(),
            source: other,
        },
    })
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().position(|e| *e == ext)
}

/// Image files directly under `dir`, sorted by file name.
fn list_images(dir: &Path) -> DatasetResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| SegDatasetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SegDatasetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && extension_rank(&path).is_some() {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Label files keyed by stem; when a stem has several extensions the earliest in
/// [`IMAGE_EXTENSIONS`] wins.
fn labels_by_stem(dir: &Path) -> DatasetResult<BTreeMap<String, PathBuf>> {
    let mut by_stem: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in list_images(dir)? {
        let Some(stem) = file_stem(&path).map(str::to_string) else {
            continue;
        };
        let replace = match by_stem.get(&stem) {
            Some(existing) => extension_rank(&path) < extension_rank(existing),
            None => true,
        };
        if replace {
            by_stem.insert(stem, path);
        }
    }
    Ok(by_stem)
}
