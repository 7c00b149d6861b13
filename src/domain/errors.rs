use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Model file not found at {0}. Place trash_classifier.onnx in this location.")]
    ModelNotFound(String),
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No file part in request.")]
    MissingFile,
    #[error("Empty filename.")]
    EmptyFilename,
    #[error("Invalid multipart body: {0}")]
    InvalidUpload(String),
    #[error("Upload too large: {0}")]
    UploadTooLarge(String),
    #[error("Inference failed: cannot decode image: {0}")]
    ImageDecode(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("No inference results returned.")]
    NoResults,
}

impl DomainError {
    /// Errores causados por la petición del cliente (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::MissingFile
                | DomainError::EmptyFilename
                | DomainError::InvalidUpload(_)
                | DomainError::UploadTooLarge(_)
                | DomainError::InvalidInput(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
