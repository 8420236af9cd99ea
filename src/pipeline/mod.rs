pub mod decode;
pub mod preprocess;
pub mod worker;

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

pub use worker::{ClassifyWorker, PendingClassification};

use crate::{
    config::PipelineConfig,
    error::InferenceError,
    model_host::ModelHost,
    types::{ClassificationResult, RawImage},
};

/// Preprocess, score and decode one image against a shared model host.
#[derive(Clone, Debug)]
pub struct InferencePipeline {
    host: Arc<ModelHost>,
    config: PipelineConfig,
}

impl InferencePipeline {
    pub fn new(host: Arc<ModelHost>, config: PipelineConfig) -> Self {
        Self { host, config }
    }

    pub fn host(&self) -> &Arc<ModelHost> {
        &self.host
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Never fails: any error along the way yields the healthy fallback.
    /// A classifier that panics poisons the host; later calls see it unloaded.
    pub fn classify(&self, image: &RawImage) -> ClassificationResult {
        match catch_unwind(AssertUnwindSafe(|| self.try_classify(image))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                log::warn!("leaf classification failed, reporting fallback: {err}");
                ClassificationResult::fallback(self.config.language)
            }
            Err(_) => {
                log::error!("leaf classifier panicked, reporting fallback");
                ClassificationResult::fallback(self.config.language)
            }
        }
    }

    pub fn try_classify(&self, image: &RawImage) -> Result<ClassificationResult, InferenceError> {
        if !self.host.is_loaded() {
            return Err(InferenceError::NotLoaded);
        }

        let input =
            preprocess::prepare_image(image, &self.config).map_err(InferenceError::Preprocess)?;
        let scores = self.host.score(input)?.into_scores()?;
        log::debug!(
            "raw scores ({} classes): {:?}",
            scores.values().len(),
            scores.values()
        );

        let result = decode::decode(&scores, self.config.language);
        log::debug!(
            "predicted class {} with score {}: {}",
            result.index(),
            result.confidence,
            result.display
        );
        Ok(result)
    }
}
