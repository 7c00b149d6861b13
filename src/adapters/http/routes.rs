use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{HealthResponse, SegmentationResponse, Upload};
use crate::domain::errors::{DomainError, DomainResult};

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

pub async fn segment(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SegmentationResponse>, ApiError> {
    // Un cuerpo que no es multipart se trata igual que uno sin campo `file`.
    let multipart = multipart.map_err(|_| DomainError::MissingFile)?;
    let upload = read_upload(multipart).await?;
    let response = st.segmentation.segment(upload).await?;
    Ok(Json(response))
}

/// Busca el primer campo `file` que traiga filename; los campos de texto se ignoran.
async fn read_upload(mut multipart: Multipart) -> DomainResult<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok(Upload { filename, bytes: bytes.to_vec() });
    }
    Err(DomainError::MissingFile)
}

fn upload_error(e: MultipartError) -> DomainError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DomainError::UploadTooLarge(e.body_text())
    } else {
        DomainError::InvalidUpload(e.body_text())
    }
}
