use async_trait::async_trait;
use std::path::Path;

use crate::adapters::onnx::yolo_engine::OnnxYoloSegEngine;
use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }

    /// Valida el artefacto y construye el motor. Se llama una sola vez, antes de servir.
    pub async fn load(&self, model: &ModelId) -> DomainResult<OnnxYoloSegEngine> {
        self.validate_model(model).await?;
        OnnxYoloSegEngine::load(model).map_err(|e| DomainError::ModelLoad(e.to_string()))
    }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        if !Path::new(&model.onnx_path).is_file() {
            return Err(DomainError::ModelNotFound(model.onnx_path.clone()));
        }
        Ok(())
    }
}
