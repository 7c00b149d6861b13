use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use ndarray::{Array4, ArrayView2, ArrayView3, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::adapters::onnx::postprocess::{
    decode_candidates, decode_mask, letterbox, mask_to_polygon, non_max_suppression,
    parse_class_names,
};
use crate::application::ports::SegmenterPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelId, SegmentParams};
use crate::domain::segmentation::{Boxes, InferenceResult, Masks};

/// Motor YOLOv8-seg sobre ONNX Runtime.
/// `Session::run` necesita `&mut`, así que la sesión va detrás de un Mutex.
pub struct OnnxYoloSegEngine {
    session: Arc<Mutex<Session>>,
    names: Arc<BTreeMap<usize, String>>,
}

impl OnnxYoloSegEngine {
    pub fn load(model: &ModelId) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        } else {
            warn!("CUDA no disponible; inferencia en CPU");
        }

        let session = builder.commit_from_file(&model.onnx_path)?;

        let names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .map(|raw| parse_class_names(&raw))
            .unwrap_or_default();
        if names.is_empty() {
            warn!("El modelo {} no trae metadato 'names'; se usarán ids numéricos", model.name);
        }

        info!(
            "Modelo '{}' cargado desde {} ({} clases)",
            model.name,
            model.onnx_path,
            names.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            names: Arc::new(names),
        })
    }
}

#[async_trait]
impl SegmenterPort for OnnxYoloSegEngine {
    async fn predict(
        &self,
        image: DynamicImage,
        params: &SegmentParams,
    ) -> DomainResult<Vec<InferenceResult>> {
        let session = self.session.clone();
        let names = self.names.clone();
        let params = params.clone();

        let result = tokio::task::spawn_blocking(move || {
            let rgb = image.to_rgb8();
            let mut session = session
                .lock()
                .map_err(|_| anyhow!("inference session lock poisoned"))?;
            infer(&mut session, &rgb, &params, &names)
        })
        .await
        .map_err(|e| DomainError::Inference(format!("inference task failed: {e}")))?
        .map_err(|e| DomainError::Inference(e.to_string()))?;

        Ok(vec![result])
    }
}

fn infer(
    session: &mut Session,
    rgb: &RgbImage,
    params: &SegmentParams,
    names: &BTreeMap<usize, String>,
) -> Result<InferenceResult> {
    let imgsz = params.input_size as usize;
    let (canvas, geometry) = letterbox(rgb, params.input_size);

    let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }

    let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
    let input_tensor = Tensor::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    if outputs.len() < 2 {
        return Err(anyhow!(
            "expected detection and prototype outputs, model returned {}",
            outputs.len()
        ));
    }

    let (det_shape, det_data) = outputs[0].try_extract_tensor::<f32>()?;
    let det_dims: Vec<usize> = det_shape.iter().map(|&d| d as usize).collect();
    let det_view = ArrayViewD::from_shape(IxDyn(&det_dims), det_data)?;
    let det_view: ArrayView2<f32> = det_view
        .index_axis_move(Axis(0), 0)
        .into_dimensionality()?;

    let (proto_shape, proto_data) = outputs[1].try_extract_tensor::<f32>()?;
    let proto_dims: Vec<usize> = proto_shape.iter().map(|&d| d as usize).collect();
    let proto_view = ArrayViewD::from_shape(IxDyn(&proto_dims), proto_data)?;
    let protos: ArrayView3<f32> = proto_view
        .index_axis_move(Axis(0), 0)
        .into_dimensionality()?;
    let num_masks = protos.shape()[0];

    let candidates = decode_candidates(det_view, num_masks, params.conf_threshold);
    let kept = non_max_suppression(
        candidates,
        params.iou_threshold,
        params.agnostic_nms,
        params.max_detections,
    );
    debug!("{} detecciones tras NMS", kept.len());

    let mut boxes = Boxes::default();
    let mut polygons = Vec::with_capacity(kept.len());
    for det in &kept {
        let mask = decode_mask(&det.coeffs, protos, &det.bbox, params.input_size);
        polygons.push(mask_to_polygon(&mask, &geometry));

        boxes.cls.push(det.class_id);
        boxes.conf.push(det.score);
        boxes.xyxy.push(geometry.box_to_original(&det.bbox));
    }

    // Sin detecciones no hay máscaras, igual que en Ultralytics.
    let masks = (!kept.is_empty()).then(|| Masks { xy: polygons });

    Ok(InferenceResult {
        orig_shape: Some((rgb.height(), rgb.width())),
        names: names.clone(),
        boxes: Some(boxes),
        masks,
    })
}
