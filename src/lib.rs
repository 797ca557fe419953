mod model_loader;
mod ort_service;

pub mod app;
pub mod config;
pub mod error;
pub mod model_service;
pub mod routes;
pub mod server;

pub use app::start_app;
pub use ort_service::{preprocess_image, OrtModelService};
