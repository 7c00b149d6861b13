use std::collections::BTreeMap;

/// Cajas de un resultado de inferencia, en vectores paralelos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boxes {
    pub cls: Vec<usize>,
    pub conf: Vec<f32>,
    /// xmin, ymin, xmax, ymax en píxeles de la imagen original.
    pub xyxy: Vec<[f32; 4]>,
}

/// Un polígono por detección, en píxeles de la imagen original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Masks {
    pub xy: Vec<Vec<[f32; 2]>>,
}

/// Salida cruda del segmentador para una imagen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceResult {
    /// (alto, ancho) de la imagen de entrada.
    pub orig_shape: Option<(u32, u32)>,
    pub names: BTreeMap<usize, String>,
    pub boxes: Option<Boxes>,
    pub masks: Option<Masks>,
}

impl InferenceResult {
    pub fn label_for(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }
}
