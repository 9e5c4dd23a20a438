use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::modules::inference::{ImageTensor, InferenceError};

/// A model mapping a preprocessed image to a probability vector
pub trait ImageClassifier: Send + Sync {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;

    fn name(&self) -> &str;
}

/// Classifier backed by an ONNX Runtime session.
///
/// The session needs exclusive access while running, so it sits behind a
/// mutex; callers run it from the blocking pool.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let session = load_session(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Loaded classifier {}", name);
        Ok(Self {
            name,
            session: Mutex::new(session),
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let tensor = Tensor::from_array((input.shape.clone(), input.data.clone()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![tensor])?;

        // Batch of one: the whole buffer is the probability vector
        let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        if data.is_empty() {
            return Err(InferenceError::InvalidOutput(format!(
                "{} produced an empty output",
                self.name
            )));
        }
        Ok(data.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open an ONNX model, failing early with a clear error when the file is missing
pub(crate) fn load_session(path: &Path) -> Result<Session, InferenceError> {
    if !path.exists() {
        return Err(InferenceError::ModelNotFound {
            path: path.display().to_string(),
        });
    }

    Session::builder()
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| InferenceError::ModelLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
