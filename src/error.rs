use ca_formats::{macrocell::Error as MacrocellError, rle::Error as RleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Format detection failed, or the text violates the grammar of its format.
    #[error("Malformed pattern: {0}")]
    MalformedPattern(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Some count no longer fits in the integer type that holds it.
    #[error("Precision boundary exceeded: {0}")]
    PrecisionBoundaryExceeded(String),
}

impl From<RleError> for Error {
    fn from(e: RleError) -> Self {
        Error::MalformedPattern(format!("RLE: {}", e))
    }
}

impl From<MacrocellError> for Error {
    fn from(e: MacrocellError) -> Self {
        Error::MalformedPattern(format!("Macrocell: {}", e))
    }
}
