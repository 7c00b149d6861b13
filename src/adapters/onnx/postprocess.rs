use image::{imageops::FilterType, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use ndarray::{Array1, ArrayView2, ArrayView3, Axis};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Valor de relleno del letterbox (gris de Ultralytics).
const PAD_VALUE: u8 = 114;

/// Geometría del letterbox: escala uniforme + padding centrado.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// De coordenadas del tensor de entrada a píxeles de la imagen original.
    pub fn to_original(&self, x: f32, y: f32) -> [f32; 2] {
        let ox = (x - self.pad_x) / self.scale;
        let oy = (y - self.pad_y) / self.scale;
        [
            ox.clamp(0.0, self.orig_width as f32),
            oy.clamp(0.0, self.orig_height as f32),
        ]
    }

    pub fn box_to_original(&self, b: &[f32; 4]) -> [f32; 4] {
        let [x1, y1] = self.to_original(b[0], b[1]);
        let [x2, y2] = self.to_original(b[2], b[3]);
        [x1, y1, x2, y2]
    }
}

/// Redimensiona conservando la proporción y rellena hasta `size x size`.
pub fn letterbox(rgb: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (w, h) = rgb.dimensions();
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = image::imageops::resize(rgb, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let geometry = Letterbox {
        size,
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_width: w,
        orig_height: h,
    };
    (canvas, geometry)
}

/// Detección candidata en coordenadas del tensor de entrada.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: usize,
    pub coeffs: Vec<f32>,
}

/// Decodifica la salida `[4 + nc + nm, anchors]`: cx, cy, w, h, scores, coeficientes de máscara.
pub fn decode_candidates(
    view: ArrayView2<f32>,
    num_masks: usize,
    conf_threshold: f32,
) -> Vec<Candidate> {
    let channels = view.shape()[0];
    if channels <= 4 + num_masks {
        return Vec::new();
    }
    let num_classes = channels - 4 - num_masks;

    let mut out = Vec::new();
    for anchor in view.axis_iter(Axis(1)) {
        let scores = anchor.slice(ndarray::s![4..4 + num_classes]);
        let Some((class_id, &score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        else {
            continue;
        };
        if !score.is_finite() || score <= conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        out.push(Candidate {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            score,
            class_id,
            coeffs: anchor.slice(ndarray::s![4 + num_classes..]).to_vec(),
        });
    }
    out
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// NMS greedy por score. Con `agnostic` las clases distintas también se suprimen entre sí.
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    agnostic: bool,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len().min(max_detections));
    for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            (agnostic || k.class_id == cand.class_id) && iou(&k.bbox, &cand.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

/// Máscara binaria en el espacio de prototipos `[mh, mw]`, recortada a la caja.
pub fn decode_mask(coeffs: &[f32], protos: ArrayView3<f32>, bbox: &[f32; 4], input_size: u32) -> GrayImage {
    let (nm, mh, mw) = protos.dim();
    let mut mask = GrayImage::new(mw as u32, mh as u32);
    if coeffs.len() != nm || nm == 0 {
        return mask;
    }

    let flat = match protos.to_shape((nm, mh * mw)) {
        Ok(view) => view,
        Err(_) => return mask,
    };
    let logits = Array1::from(coeffs.to_vec()).dot(&flat);

    let sx = mw as f32 / input_size as f32;
    let sy = mh as f32 / input_size as f32;
    let (x1, y1) = (bbox[0] * sx, bbox[1] * sy);
    let (x2, y2) = (bbox[2] * sx, bbox[3] * sy);

    for y in 0..mh {
        let fy = y as f32;
        if fy < y1 || fy >= y2 {
            continue;
        }
        for x in 0..mw {
            let fx = x as f32;
            // sigmoid(logit) > 0.5  <=>  logit > 0
            if fx >= x1 && fx < x2 && logits[y * mw + x] > 0.0 {
                mask.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }
    mask
}

/// Contorno exterior más largo de la máscara, en píxeles de la imagen original.
pub fn mask_to_polygon(mask: &GrayImage, geometry: &Letterbox) -> Vec<[f32; 2]> {
    let contours = find_contours::<u32>(mask);
    let Some(largest) = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .max_by_key(|c| c.points.len())
    else {
        return Vec::new();
    };

    let sx = geometry.size as f32 / mask.width().max(1) as f32;
    let sy = geometry.size as f32 / mask.height().max(1) as f32;
    largest
        .points
        .iter()
        .map(|p| geometry.to_original(p.x as f32 * sx, p.y as f32 * sy))
        .collect()
}

/// Parsea el metadato `names` que exporta Ultralytics: `{0: 'cardboard', 1: 'glass'}`.
/// Las etiquetas se leen entre comillas, así que pueden contener `,` o `:`.
pub fn parse_class_names(raw: &str) -> BTreeMap<usize, String> {
    let mut names = BTreeMap::new();
    let mut chars = raw.chars().peekable();

    loop {
        // id numérico
        while chars.peek().is_some_and(|c| !c.is_ascii_digit()) {
            chars.next();
        }
        let mut key = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            key.push(c);
            chars.next();
        }
        let Ok(id) = key.parse::<usize>() else {
            break;
        };

        while chars.peek().is_some_and(|&c| c == ':' || c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next().filter(|&c| c == '\'' || c == '"') else {
            continue;
        };

        let mut label = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        label.push(escaped);
                    }
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => label.push(c),
            }
        }
        if closed && !label.is_empty() {
            names.insert(id, label);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn cand(bbox: [f32; 4], score: f32, class_id: usize) -> Candidate {
        Candidate { bbox, score, class_id, coeffs: vec![] }
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let img = RgbImage::from_pixel(200, 100, Rgb([10, 20, 30]));
        let (canvas, lb) = letterbox(&img, 64);

        assert_eq!(canvas.dimensions(), (64, 64));
        assert!((lb.scale - 0.32).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 16.0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([PAD_VALUE; 3]));
        assert_eq!(canvas.get_pixel(32, 32), &Rgb([10, 20, 30]));

        let [x, y] = lb.to_original(32.0, 32.0);
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 50.0).abs() < 1e-3);
        assert_eq!(lb.to_original(-5.0, 100.0), [0.0, 100.0]);
    }

    #[test]
    fn decodes_candidates_above_threshold() {
        // 2 clases, 1 coeficiente de máscara, 3 anchors.
        let data = Array2::from_shape_vec(
            (7, 3),
            vec![
                50.0, 10.0, 80.0, // cx
                50.0, 10.0, 80.0, // cy
                20.0, 4.0, 10.0, // w
                10.0, 4.0, 10.0, // h
                0.9, 0.1, 0.25, // clase 0
                0.2, 0.2, 0.1, // clase 1
                1.5, -1.0, 0.0, // coeficiente
            ],
        )
        .unwrap();

        let cands = decode_candidates(data.view(), 1, 0.25);
        assert_eq!(cands.len(), 1, "0.25 is not strictly above the threshold");
        assert_eq!(cands[0].class_id, 0);
        assert_eq!(cands[0].bbox, [40.0, 45.0, 60.0, 55.0]);
        assert_eq!(cands[0].coeffs, vec![1.5]);
    }

    #[test]
    fn agnostic_nms_suppresses_across_classes() {
        let cands = vec![
            cand([0.0, 0.0, 10.0, 10.0], 0.8, 0),
            cand([1.0, 1.0, 10.0, 10.0], 0.9, 1),
            cand([50.0, 50.0, 60.0, 60.0], 0.7, 0),
        ];

        let agnostic = non_max_suppression(cands.clone(), 0.5, true, 300);
        assert_eq!(agnostic.len(), 2);
        assert_eq!(agnostic[0].class_id, 1);
        assert_eq!(agnostic[1].bbox, [50.0, 50.0, 60.0, 60.0]);

        let per_class = non_max_suppression(cands, 0.5, false, 300);
        assert_eq!(per_class.len(), 3);
    }

    #[test]
    fn nms_respects_max_detections() {
        let cands = (0..10)
            .map(|i| cand([i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0], 0.5, 0))
            .collect();
        assert_eq!(non_max_suppression(cands, 0.5, true, 4).len(), 4);
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mask_is_cropped_to_box_and_traced() {
        // Un prototipo positivo en todo el mapa 8x8; la caja limita el área.
        let protos = Array3::from_elem((1, 8, 8), 1.0f32);
        let mask = decode_mask(&[2.0], protos.view(), &[16.0, 16.0, 48.0, 48.0], 64);

        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(2, 2)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 255);
        assert_eq!(mask.get_pixel(6, 6)[0], 0);

        let lb = Letterbox {
            size: 64,
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_width: 64,
            orig_height: 64,
        };
        let polygon = mask_to_polygon(&mask, &lb);
        assert!(!polygon.is_empty());
        for [x, y] in &polygon {
            assert!((16.0..=40.0).contains(x), "x = {x}");
            assert!((16.0..=40.0).contains(y), "y = {y}");
        }
    }

    #[test]
    fn negative_coefficients_yield_empty_polygon() {
        let protos = Array3::from_elem((1, 8, 8), 1.0f32);
        let mask = decode_mask(&[-2.0], protos.view(), &[0.0, 0.0, 64.0, 64.0], 64);
        let lb = Letterbox {
            size: 64,
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_width: 64,
            orig_height: 64,
        };
        assert!(mask_to_polygon(&mask, &lb).is_empty());
    }

    #[test]
    fn parses_ultralytics_names_metadata() {
        let names = parse_class_names("{0: 'cardboard', 1: 'glass', 2: \"metal\"}");
        assert_eq!(names.len(), 3);
        assert_eq!(names[&0], "cardboard");
        assert_eq!(names[&2], "metal");
        assert!(parse_class_names("garbage").is_empty());
    }

    #[test]
    fn names_may_contain_separators() {
        let names = parse_class_names("{0: 'paper, cardboard', 1: \"bottle: glass\", 2: 'it\\'s'}");
        assert_eq!(names.len(), 3);
        assert_eq!(names[&0], "paper, cardboard");
        assert_eq!(names[&1], "bottle: glass");
        assert_eq!(names[&2], "it's");
    }
}
