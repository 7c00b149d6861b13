use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    application::{
        dto::{ImageSize, SegmentationResponse, Upload},
        ports::SegmenterPort,
    },
    domain::{
        detection::{round_to, summarize_counts, Detection},
        errors::{DomainError, DomainResult},
        model::SegmentParams,
        segmentation::InferenceResult,
    },
};

/// Caso de uso principal: imagen subida -> respuesta de segmentación.
/// Los umbrales de inferencia son fijos y no los elige el cliente.
#[derive(Clone)]
pub struct SegmentationService {
    segmenter: Arc<dyn SegmenterPort>,
    params: SegmentParams,
}

impl SegmentationService {
    pub fn new(segmenter: Arc<dyn SegmenterPort>) -> Self {
        Self {
            segmenter,
            params: SegmentParams::default(),
        }
    }

    #[cfg(test)]
    pub fn params(&self) -> &SegmentParams {
        &self.params
    }

    pub async fn segment(&self, upload: Upload) -> DomainResult<SegmentationResponse> {
        if upload.filename.is_empty() {
            return Err(DomainError::EmptyFilename);
        }

        let results = match self.run_inference(&upload.bytes).await {
            Ok(results) => results,
            Err(e) => {
                error!(filename = %upload.filename, error = ?e, "Model inference failed");
                return Err(e);
            }
        };

        // Colección vacía = error; resultado sin máscaras = "nada detectado" (200).
        let Some(result) = results.into_iter().next() else {
            return Err(DomainError::NoResults);
        };

        let response = build_response(upload.filename, &result);
        info!(
            "Segmentado '{}': {}",
            response.filename,
            summarize_counts(&response.counts)
        );
        Ok(response)
    }

    async fn run_inference(&self, bytes: &[u8]) -> DomainResult<Vec<InferenceResult>> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DomainError::ImageDecode(e.to_string()))?;
        self.segmenter.predict(image, &self.params).await
    }
}

/// Convierte la salida cruda del segmentador en el documento de respuesta.
pub fn build_response(filename: String, result: &InferenceResult) -> SegmentationResponse {
    let (height, width) = match result.orig_shape {
        Some((h, w)) => (Some(h), Some(w)),
        None => (None, None),
    };

    let mut segments = Vec::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    if let (Some(boxes), Some(masks)) = (&result.boxes, &result.masks) {
        for (idx, (&class_id, &conf)) in boxes.cls.iter().zip(boxes.conf.iter()).enumerate() {
            let label = result.label_for(class_id);
            *counts.entry(label.clone()).or_insert(0) += 1;

            let polygon = masks
                .xy
                .get(idx)
                .map(|points| {
                    points
                        .iter()
                        .map(|[x, y]| [round_to(*x as f64, 2), round_to(*y as f64, 2)])
                        .collect()
                })
                .unwrap_or_default();

            let bounding_box = boxes
                .xyxy
                .get(idx)
                .map(|b| [b[0] as f64, b[1] as f64, b[2] as f64, b[3] as f64]);

            segments.push(Detection {
                id: idx,
                label,
                confidence: round_to(conf as f64, 4),
                polygon,
                bounding_box,
            });
        }
    }

    SegmentationResponse {
        filename,
        image_size: ImageSize { width, height },
        segments,
        counts,
    }
}
