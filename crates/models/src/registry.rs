//! Static registry of the named FCN variants.

use crate::error::ModelError;
use crate::fcn::{Fcn, FcnConfig};
use burn::tensor::backend::Backend;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    VggFcn32s,
    VggFcn16s,
    VggFcn8s,
}

/// Every buildable architecture, keyed by its configuration name.
pub const ARCHITECTURES: [(&str, Architecture); 3] = [
    ("vgg_fcn32s", Architecture::VggFcn32s),
    ("vgg_fcn16s", Architecture::VggFcn16s),
    ("vgg_fcn8s", Architecture::VggFcn8s),
];

impl Architecture {
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        ARCHITECTURES
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, arch)| *arch)
            .ok_or_else(|| ModelError::UnknownArchitecture {
                name: name.to_string(),
                known: known_names(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Architecture::VggFcn32s => "vgg_fcn32s",
            Architecture::VggFcn16s => "vgg_fcn16s",
            Architecture::VggFcn8s => "vgg_fcn8s",
        }
    }

    /// Stride of the coarsest map that is upsampled straight to full resolution.
    pub fn output_stride(self) -> usize {
        match self {
            Architecture::VggFcn32s => 32,
            Architecture::VggFcn16s => 16,
            Architecture::VggFcn8s => 8,
        }
    }

    pub fn all() -> impl Iterator<Item = Architecture> {
        ARCHITECTURES.iter().map(|(_, arch)| *arch)
    }

    pub fn build<B: Backend>(
        self,
        cfg: &FcnConfig,
        device: &B::Device,
    ) -> Result<Fcn<B>, ModelError> {
        cfg.validate()?;
        tracing::debug!(
            arch = self.name(),
            classes = cfg.classes,
            height = cfg.input_shape.0,
            width = cfg.input_shape.1,
            bilinear = cfg.bilinear,
            "building model"
        );
        Ok(Fcn::new(self, cfg, device))
    }
}

impl FromStr for Architecture {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn known_names() -> String {
    ARCHITECTURES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Look up `name` and build it in one step.
pub fn build<B: Backend>(
    name: &str,
    cfg: &FcnConfig,
    device: &B::Device,
) -> Result<Fcn<B>, ModelError> {
    Architecture::from_name(name)?.build(cfg, device)
}
