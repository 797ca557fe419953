use crate::{
    error::PredictError,
    model_service::{ModelService, Prediction},
    server::SharedState,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictImageError {
    #[error("Only image files are allowed, got `{0}`")]
    UnsupportedMediaType(String),
    #[error("Multipart upload is missing a `file` field")]
    MissingFile,
    #[error("Failed to read upload: {0}")]
    Upload(#[from] MultipartError),
    #[error(transparent)]
    Prediction(#[from] PredictError),
}

impl IntoResponse for PredictImageError {
    fn into_response(self) -> Response {
        match self {
            PredictImageError::UnsupportedMediaType(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            PredictImageError::MissingFile
            | PredictImageError::Upload(_)
            | PredictImageError::Prediction(PredictError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()).into_response()
            }
            PredictImageError::Prediction(PredictError::Internal(_)) => {
                // Detail stays in the server log; the client gets an opaque 500.
                tracing::error!("Prediction error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>, PredictImageError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(PredictImageError::UnsupportedMediaType(content_type));
        }

        let image_data = field.bytes().await?;
        let prediction = state.model_service.classify(&image_data).await?;

        tracing::debug!(class_label = %prediction.class_label, "Returning prediction");
        return Ok(Json(prediction));
    }

    Err(PredictImageError::MissingFile)
}
