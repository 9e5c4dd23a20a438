use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model file not found: {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Ensemble error: {0}")]
    Ensemble(String),
}

impl From<ort::Error> for InferenceError {
    fn from(err: ort::Error) -> Self {
        InferenceError::Runtime(err.to_string())
    }
}
