//! Text processing errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextProcessingError {
    /// A configured pattern failed to compile
    #[error("Invalid pattern in {table}: '{pattern}': {message}")]
    InvalidPattern {
        table: String,
        pattern: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;
