use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

/// Envoltorio HTTP de `DomainError`: status + `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            DomainError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let cases = [
            (DomainError::MissingFile, StatusCode::BAD_REQUEST),
            (DomainError::EmptyFilename, StatusCode::BAD_REQUEST),
            (DomainError::InvalidUpload("eof".into()), StatusCode::BAD_REQUEST),
            (DomainError::UploadTooLarge("limit".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (DomainError::ImageDecode("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::Inference("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::NoResults, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }
}
