use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog {path} could not be loaded: {message}")]
    Catalog { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PulseError>;
