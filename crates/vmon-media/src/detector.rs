//! Object detection.
//!
//! Pipelines only see the [`Detector`] trait. [`YoloDetector`] is the
//! production implementation: YOLOv8 exported to ONNX, run through ONNX
//! Runtime with automatic execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};
use vmon_models::{BBox, Detection};

use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Per-frame object detector.
pub trait Detector: Send + Sync {
    /// Detect objects in `frame`. Boxes are in the frame's pixel coordinates.
    fn detect(&self, frame: &Frame) -> MediaResult<Vec<Detection>>;
}

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

const NUM_CLASSES: usize = 80;
const NUM_CANDIDATES: usize = 8400;

/// Configuration for [`YoloDetector`].
#[derive(Debug, Clone)]
pub struct YoloDetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for YoloDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/object_detection/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 detector on ONNX Runtime.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: YoloDetectorConfig,
}

impl YoloDetector {
    /// Load the model. Fails if the model file is missing or invalid.
    pub fn new(config: YoloDetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Vehicle detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &YoloDetectorConfig {
        &self.config
    }

    /// Resize to the square model input, scale to [0, 1], lay out as NCHW.
    fn preprocess(&self, frame: &Frame) -> MediaResult<Value> {
        let size = self.config.input_size;
        let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
        let (w, h) = (size as usize, size as usize);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for pixel in resized.pixels() {
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, 8400]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Decode `[84, 8400]` candidates into pixel-space detections.
    fn postprocess(&self, outputs: &[f32], width: u32, height: u32) -> MediaResult<Vec<Detection>> {
        let num_features = 4 + NUM_CLASSES;
        if outputs.len() != num_features * NUM_CANDIDATES {
            return Err(MediaError::detection_failed(format!(
                "Unexpected output size: expected {}, got {}",
                num_features * NUM_CANDIDATES,
                outputs.len()
            )));
        }

        let output_array = Array::from_shape_vec((num_features, NUM_CANDIDATES), outputs.to_vec())
            .map_err(|e| MediaError::internal(format!("Failed to reshape output: {}", e)))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = width as f32 / input_size;
        let scale_h = height as f32 / input_size;

        let mut candidates = Vec::new();
        for i in 0..NUM_CANDIDATES {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..NUM_CLASSES {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.config.confidence_threshold {
                continue;
            }

            let (cx, cy) = (transposed[[i, 0]], transposed[[i, 1]]);
            let (w, h) = (transposed[[i, 2]], transposed[[i, 3]]);
            let x1 = ((cx - w / 2.0) * scale_w).clamp(0.0, width as f32);
            let y1 = ((cy - h / 2.0) * scale_h).clamp(0.0, height as f32);
            let x2 = ((cx + w / 2.0) * scale_w).clamp(0.0, width as f32);
            let y2 = ((cy + h / 2.0) * scale_h).clamp(0.0, height as f32);

            candidates.push(Detection {
                class_id: best_class as u32,
                bbox: BBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
                confidence: best_score,
            });
        }

        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, frame: &Frame) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let detections = self.postprocess(&outputs, frame.width(), frame.height())?;
        debug!(count = detections.len(), "Object detection completed");
        Ok(detections)
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

fn iou(a: &BBox, b: &BBox) -> f32 {
    let intersection = a.overlap_area(b) as f32;
    let union = (a.width() as i64 * a.height() as i64 + b.width() as i64 * b.height() as i64)
        as f32
        - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for vehicle detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for vehicle detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for vehicle detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}
