use crate::error::PredictError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Class labels, indexed positionally by the model's output vector.
pub const CLASS_LABELS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class_label: String,
    pub probabilities: Vec<f32>,
}

#[async_trait]
pub trait ModelService: Send + Sync + Clone + 'static {
    async fn classify(&self, image_data: &[u8]) -> Result<Prediction, PredictError>;
}
