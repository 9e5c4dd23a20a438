//! Instance segmentation for detected issues
//!
//! Expects a YOLO-seg ONNX export: one NCHW image input and two outputs,
//! `[1, 4 + classes + coeffs, anchors]` predictions and
//! `[1, coeffs, mask_h, mask_w]` mask prototypes.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::modules::inference::classifier::load_session;
use crate::modules::inference::preprocess::{segmenter_input, SEGMENTER_INPUT_SIZE};
use crate::modules::inference::InferenceError;

const NMS_IOU_THRESHOLD: f32 = 0.45;
const MASK_THRESHOLD: f32 = 0.5;

/// Binary mask at prototype resolution covering the whole image
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl SegmentMask {
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }
}

/// One segmented instance. `bbox` is `[x_min, y_min, x_max, y_max]` normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: usize,
    pub mask: SegmentMask,
}

pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError>;
}

pub struct OnnxSegmenter {
    name: String,
    session: Mutex<Session>,
    score_threshold: f32,
}

impl OnnxSegmenter {
    pub fn load(path: &Path, score_threshold: f32) -> Result<Self, InferenceError> {
        let session = load_session(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Loaded segmenter {}", name);
        Ok(Self {
            name,
            session: Mutex::new(session),
            score_threshold,
        })
    }
}

impl Segmenter for OnnxSegmenter {
    fn segment(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        let input = segmenter_input(image, SEGMENTER_INPUT_SIZE);
        let tensor = Tensor::from_array((input.shape, input.data))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![tensor])?;

        let (pred_shape, preds) = outputs[0].try_extract_tensor::<f32>()?;
        let (proto_shape, protos) = outputs[1].try_extract_tensor::<f32>()?;

        let detections = decode_detections(
            &RawOutput {
                shape: pred_shape.to_vec(),
                data: preds,
            },
            &RawOutput {
                shape: proto_shape.to_vec(),
                data: protos,
            },
            SEGMENTER_INPUT_SIZE as f32,
            self.score_threshold,
        )?;
        debug!("{} found {} instances", self.name, detections.len());
        Ok(detections)
    }
}

/// Borrowed view of one runtime output
pub(crate) struct RawOutput<'a> {
    pub shape: Vec<i64>,
    pub data: &'a [f32],
}

fn dims<const N: usize>(output: &RawOutput, what: &str) -> Result<[usize; N], InferenceError> {
    if output.shape.len() != N || output.shape.iter().any(|d| *d <= 0) {
        return Err(InferenceError::InvalidOutput(format!(
            "{} has shape {:?}, expected {} positive dimensions",
            what, output.shape, N
        )));
    }
    let mut out = [0usize; N];
    for (slot, dim) in out.iter_mut().zip(&output.shape) {
        *slot = *dim as usize;
    }
    if out.iter().product::<usize>() != output.data.len() {
        return Err(InferenceError::InvalidOutput(format!(
            "{} has {} values for shape {:?}",
            what,
            output.data.len(),
            output.shape
        )));
    }
    Ok(out)
}

struct Candidate {
    bbox: [f32; 4],
    score: f32,
    class_id: usize,
    coeffs: Vec<f32>,
}

/// Turn raw YOLO-seg outputs into thresholded, de-duplicated instances
pub(crate) fn decode_detections(
    preds: &RawOutput,
    protos: &RawOutput,
    input_size: f32,
    score_threshold: f32,
) -> Result<Vec<Detection>, InferenceError> {
    let [_, channels, anchors] = dims::<3>(preds, "prediction output")?;
    let [_, mask_dim, mask_h, mask_w] = dims::<4>(protos, "prototype output")?;

    if channels <= 4 + mask_dim {
        return Err(InferenceError::InvalidOutput(format!(
            "{} prediction channels leave no room for classes with {} mask coefficients",
            channels, mask_dim
        )));
    }
    let num_classes = channels - 4 - mask_dim;
    let at = |c: usize, a: usize| preds.data[c * anchors + a];

    let mut candidates = Vec::new();
    for a in 0..anchors {
        let (class_id, score) = (0..num_classes)
            .map(|k| (k, at(4 + k, a)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
        let bbox = [
            ((cx - w / 2.0) / input_size).clamp(0.0, 1.0),
            ((cy - h / 2.0) / input_size).clamp(0.0, 1.0),
            ((cx + w / 2.0) / input_size).clamp(0.0, 1.0),
            ((cy + h / 2.0) / input_size).clamp(0.0, 1.0),
        ];
        let coeffs = (0..mask_dim).map(|j| at(4 + num_classes + j, a)).collect();

        candidates.push(Candidate {
            bbox,
            score,
            class_id,
            coeffs,
        });
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| iou(&k.bbox, &candidate.bbox) <= NMS_IOU_THRESHOLD)
        {
            kept.push(candidate);
        }
    }

    Ok(kept
        .into_iter()
        .map(|c| {
            let mask = build_mask(&c.coeffs, &c.bbox, protos.data, mask_h, mask_w);
            Detection {
                bbox: c.bbox,
                score: c.score,
                class_id: c.class_id,
                mask,
            }
        })
        .collect())
}

fn build_mask(
    coeffs: &[f32],
    bbox: &[f32; 4],
    protos: &[f32],
    mask_h: usize,
    mask_w: usize,
) -> SegmentMask {
    let plane = mask_h * mask_w;
    let x_min = (bbox[0] * mask_w as f32).floor() as usize;
    let y_min = (bbox[1] * mask_h as f32).floor() as usize;
    let x_max = ((bbox[2] * mask_w as f32).ceil() as usize).min(mask_w);
    let y_max = ((bbox[3] * mask_h as f32).ceil() as usize).min(mask_h);

    let mut data = vec![false; plane];
    for y in y_min..y_max {
        for x in x_min..x_max {
            let idx = y * mask_w + x;
            let logit: f32 = coeffs
                .iter()
                .enumerate()
                .map(|(j, c)| c * protos[j * plane + idx])
                .sum();
            data[idx] = sigmoid(logit) > MASK_THRESHOLD;
        }
    }

    SegmentMask {
        width: mask_w,
        height: mask_h,
        data,
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
