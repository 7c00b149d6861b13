use crate::domain::model::ModelId;

/// Configuración del proceso. Valores fijos; sólo `RUST_LOG` se lee del entorno.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub model: ModelId,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            model: ModelId::default(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}
