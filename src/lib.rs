//! Plant leaf disease classification: a session-scoped ONNX model host, a
//! preprocess/score/decode pipeline that never fails outward, and a single
//! background worker to run it off the caller's thread.

pub mod config;
pub mod error;
pub mod model_host;
pub mod model_store;
pub mod pipeline;
pub mod session;
pub mod types;

pub use config::{LeafCareConfig, ModelConfig, PipelineConfig, WorkerConfig};
pub use error::{InferenceError, ModelLoadError, WorkerError};
pub use model_host::{Classifier, ModelHost, ModelInfo, OrtClassifier};
pub use pipeline::{ClassifyWorker, InferencePipeline, PendingClassification};
pub use session::LeafCareSession;
pub use types::{
    ClassLabel, ClassificationResult, ImageError, Language, ModelOutput, NormalizedTensor,
    RawImage, ScoreVector,
};
