use std::sync::Arc;
use crate::application::services::SegmentationService;

/// Estado compartido para los manejadores HTTP de Axum.
/// El modelo se carga una vez en `main` y llega aquí ya construido.
#[derive(Clone)]
pub struct HttpState {
    pub segmentation: Arc<SegmentationService>,
}
