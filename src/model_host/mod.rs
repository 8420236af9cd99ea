mod ort;

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

pub use self::ort::OrtClassifier;

use crate::{
    config::ModelConfig,
    error::{InferenceError, ModelLoadError},
    model_store::{ModelStoreEvent, ensure_model_ready},
    types::{ModelOutput, NormalizedTensor},
};

/// Seam between the host and whatever runtime executes the forward pass.
pub trait Classifier: Send + 'static {
    fn score(&mut self, input: NormalizedTensor) -> anyhow::Result<ModelOutput>;

    fn describe(&self) -> Option<ModelInfo> {
        None
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelInfo {
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

#[derive(Clone, Debug)]
pub struct TensorInfo {
    pub name: String,
    pub detail: String,
}

/// Owns the loaded classifier for the lifetime of a session.
///
/// Loading never fails outward: a host whose model could not be loaded is
/// simply unloaded, and every `score` call on it reports
/// [`InferenceError::NotLoaded`].
pub struct ModelHost {
    classifier: Mutex<Option<Box<dyn Classifier>>>,
}

impl ModelHost {
    pub fn initialize(config: &ModelConfig) -> Self {
        Self::initialize_with(config, |_evt| {})
    }

    pub fn initialize_with<F>(config: &ModelConfig, on_event: F) -> Self
    where
        F: FnMut(ModelStoreEvent),
    {
        match Self::try_initialize(config, on_event) {
            Ok(host) => host,
            Err(err) => {
                log::error!(
                    "failed to load leaf classifier from {}: {err}",
                    config.model_path.display()
                );
                Self::unloaded()
            }
        }
    }

    pub fn try_initialize<F>(config: &ModelConfig, on_event: F) -> Result<Self, ModelLoadError>
    where
        F: FnMut(ModelStoreEvent),
    {
        ensure_model_ready(&config.bundled_path, &config.model_path, on_event)?;
        let classifier = OrtClassifier::new(&config.model_path, config.intra_threads)
            .map_err(ModelLoadError::Session)?;
        log::info!(
            "leaf classifier ready using {}",
            config.model_path.display()
        );
        Ok(Self::with_classifier(classifier))
    }

    pub fn with_classifier(classifier: impl Classifier) -> Self {
        Self {
            classifier: Mutex::new(Some(Box::new(classifier))),
        }
    }

    pub fn unloaded() -> Self {
        Self {
            classifier: Mutex::new(None),
        }
    }

    /// False once a forward pass has panicked: a poisoned classifier is not
    /// trusted again, matching what `score` reports.
    pub fn is_loaded(&self) -> bool {
        self.classifier
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn score(&self, input: NormalizedTensor) -> Result<ModelOutput, InferenceError> {
        let mut guard = self
            .classifier
            .lock()
            .map_err(|_| InferenceError::Poisoned)?;
        let classifier = guard.as_mut().ok_or(InferenceError::NotLoaded)?;
        classifier.score(input).map_err(InferenceError::Runtime)
    }

    pub fn describe(&self) -> Option<ModelInfo> {
        self.classifier
            .lock()
            .ok()?
            .as_ref()
            .and_then(|classifier| classifier.describe())
    }

    /// Frees the classifier. Later calls are no-ops.
    pub fn release(&self) {
        if let Some(classifier) = self.lock_ignoring_poison().take() {
            drop(classifier);
            log::info!("leaf classifier released");
        }
    }

    fn lock_ignoring_poison(&self) -> MutexGuard<'_, Option<Box<dyn Classifier>>> {
        self.classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ModelHost {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ModelHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHost")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
