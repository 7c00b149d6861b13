mod domain;
mod application;
mod adapters;
mod config;

use std::sync::Arc;
use crate::application::services::SegmentationService;
use crate::adapters::{
    onnx::model_catalog::OnnxModelCatalog,
    http::{state::HttpState, router},
};
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cfg = ServerConfig::default();

    // 2. Cargar el modelo una sola vez. Sin modelo el servicio no arranca.
    tracing::info!("🔧 Cargando modelo de segmentación desde {}...", cfg.model.onnx_path);
    let engine = OnnxModelCatalog::new().load(&cfg.model).await?;

    // 3. Caso de uso con el modelo inyectado
    let segmentation = Arc::new(SegmentationService::new(Arc::new(engine)));
    let state = HttpState { segmentation };

    // 4. Router de Axum
    let app = router(state, cfg.max_upload_bytes);

    // 5. Lanzar el servidor
    tracing::info!("🚀 API de segmentación escuchando en http://{}", cfg.bind_addr);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
