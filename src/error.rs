//! Error types for the fallible edges of the engine
//!
//! Every error here is recoverable: callers log it and continue with a
//! default or stale value.

use std::path::PathBuf;

use thiserror::Error;

/// Rating persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("rating store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rating record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Forecasting model load and inference failures
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("model IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model weights have the wrong shape: {0}")]
    Shape(String),

    #[error("input window rejected: {0}")]
    Input(String),

    #[error("model produced a non-finite output")]
    NonFinite,
}

/// Settings file failures
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
