use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown architecture '{name}' (known: {known})")]
    UnknownArchitecture { name: String, known: String },
    #[error("input shape {height}x{width} must be a positive multiple of {stride}")]
    InvalidInputShape {
        height: usize,
        width: usize,
        stride: usize,
    },
    #[error("invalid model config: {0}")]
    InvalidConfig(String),
}
