//! Issue inference pipeline
//!
//! Models are ONNX exports loaded once at startup through ONNX Runtime.
//! The flow per image is: issue detection, then (only for issues) a
//! garbage/pothole classification ensemble, then the segmentation model of
//! the predicted class whose masks are drawn onto the image.

mod annotate;
mod classifier;
mod ensemble;
mod error;
mod labels;
mod pipeline;
mod preprocess;
mod segmenter;
mod service;

pub use classifier::{ImageClassifier, OnnxClassifier};
pub use ensemble::WeightedEnsemble;
pub use error::InferenceError;
pub use labels::{InferenceOutcome, IssueLabel};
pub use pipeline::IssuePipeline;
pub use preprocess::ImageTensor;
pub use segmenter::{Detection, OnnxSegmenter, SegmentMask, Segmenter};
pub use service::InferenceService;
