use async_trait::async_trait;
use image::DynamicImage;

use crate::domain::{
    errors::DomainResult,
    model::{ModelId, SegmentParams},
    segmentation::InferenceResult,
};

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}

/// Capacidad de segmentación: imagen -> detecciones con clase, confianza, caja y máscara.
/// La implementación debe ser reentrante o sincronizarse internamente.
#[async_trait]
pub trait SegmenterPort: Send + Sync {
    async fn predict(
        &self,
        image: DynamicImage,
        params: &SegmentParams,
    ) -> DomainResult<Vec<InferenceResult>>;
}
