use std::path::PathBuf;
use thiserror::Error;

/// Startup-time model failures. Any of these aborts the service before it
/// accepts traffic.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to load model: {0}")]
    Load(#[from] ort::Error),
}

/// Request-scoped failures. The HTTP boundary maps `Validation` to a client
/// error and `Internal` to an opaque server error, without inspecting the
/// message text.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("error processing image: {0}")]
    Validation(String),
    #[error("inference failed: {0}")]
    Internal(String),
}
