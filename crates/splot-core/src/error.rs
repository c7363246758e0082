use thiserror::Error;

use crate::PrimitiveKind;

/// Errors reported by the renderer and its building blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{kind} batch is full ({capacity} instances)")]
    CapacityExceeded { kind: PrimitiveKind, capacity: usize },
    #[error("{kind} batch of {capacity} instances cannot be allocated")]
    CapacityTooLarge { kind: PrimitiveKind, capacity: usize },
    #[error("colorscale `{0}` is not registered")]
    ColorScaleNotFound(String),
    #[error("invalid colorscale: {0}")]
    InvalidColorScale(String),
    #[error("argument `{0}` is not a finite number")]
    NonFinite(&'static str),
    #[error("no usable graphics backend: {0}")]
    Unavailable(String),
    #[error("renderer has been destroyed")]
    Destroyed,
    #[error("all 24-bit picking ids are in use")]
    IdsExhausted,
    #[error("gpu error: {0}")]
    Gpu(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
