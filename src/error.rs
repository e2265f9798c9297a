//! Errors surfaced by parsing and option loading

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// A panic escaped the parsing pipeline; no partial tree is returned
    #[error("internal parser failure")]
    Internal,

    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;
