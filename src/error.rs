use thiserror::Error;

/// Fatal failures of the viewer core.
///
/// Everything here aborts the operation that raised it and leaves prior
/// state unchanged; the top-level driver decides whether to terminate.
/// Ignorable inputs (unknown configuration keys, interaction outside the
/// bound viewport, out-of-window seeds) never surface as errors.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("configuration line {line} has no 'key = value' form: {text:?}")]
    ConfigSyntax { line: usize, text: String },

    #[error("unknown interpolation mode {0:?}")]
    UnknownInterpolation(String),

    #[error("image geometry mismatch in sequence at volume {index}")]
    GeometryMismatch { index: usize },

    #[error("unsupported scalar kind {0:?}")]
    UnsupportedScalarKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
