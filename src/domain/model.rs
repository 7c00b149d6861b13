use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_PATH: &str = "models/trash_classifier.onnx";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "trash_classifier"
    pub onnx_path: String,  // filesystem path
}

impl Default for ModelId {
    fn default() -> Self {
        Self {
            name: "trash_classifier".to_string(),
            onnx_path: DEFAULT_MODEL_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // 0..1
    pub agnostic_nms: bool,     // suppress across classes
    pub max_detections: usize,  // e.g. 300
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.5,
            agnostic_nms: true,
            max_detections: 300,
        }
    }
}
