use crate::models::AnalysisResponse;
use crate::services::UploadedImage;
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

/// Multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "image";

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::info!(error = %rejection, "Analyze request is not multipart");
        no_image()
    })?;

    let upload = read_image_field(&mut multipart)
        .await?
        .ok_or_else(no_image)?;

    tracing::info!(
        file_name = upload.file_name.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        "Received image for analysis"
    );

    let response = state.analyzer.analyze(upload).await?;
    Ok(Json(response))
}

fn no_image() -> AppError {
    AppError::BadRequest(anyhow::anyhow!("No image"))
}

/// First non-empty `image` field; other fields are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<UploadedImage>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            continue;
        }

        return Ok(Some(UploadedImage {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
        }));
    }

    Ok(None)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::info!("Upload exceeds body limit");
        return AppError::PayloadTooLarge("Image too large".to_string());
    }

    tracing::info!(error = %err.body_text(), "Malformed multipart body");
    AppError::BadRequest(anyhow::anyhow!("Malformed multipart body"))
}
