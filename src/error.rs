use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures while materializing or loading the model artifact. The host logs
/// these and stays unloaded.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("bundled model artifact not found at {0}")]
    ArtifactMissing(PathBuf),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load model session: {0:#}")]
    Session(anyhow::Error),
}

/// Failures inside one inference call. The pipeline turns every one of these
/// into the fallback result.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model is not loaded")]
    NotLoaded,
    #[error("model host lock poisoned")]
    Poisoned,
    #[error("failed to preprocess image: {0:#}")]
    Preprocess(anyhow::Error),
    #[error("model returned an empty score vector")]
    EmptyScores,
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),
    #[error("forward pass failed: {0:#}")]
    Runtime(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("classify worker has shut down")]
    Closed,
}
