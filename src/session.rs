use std::sync::Arc;

use crate::{
    config::LeafCareConfig,
    error::WorkerError,
    model_host::ModelHost,
    model_store::ModelStoreEvent,
    pipeline::{ClassifyWorker, InferencePipeline, PendingClassification},
    types::{ClassificationResult, RawImage},
};

/// Top-level container: owns the model host for the whole session and hands
/// it to the pipeline and worker explicitly.
#[derive(Debug)]
pub struct LeafCareSession {
    host: Arc<ModelHost>,
    pipeline: InferencePipeline,
    worker: Option<ClassifyWorker>,
}

impl LeafCareSession {
    pub fn open(config: LeafCareConfig) -> Self {
        Self::open_with(config, |_evt| {})
    }

    pub fn open_with<F>(config: LeafCareConfig, on_event: F) -> Self
    where
        F: FnMut(ModelStoreEvent),
    {
        let host = Arc::new(ModelHost::initialize_with(&config.model, on_event));
        Self::with_host(host, config)
    }

    pub fn with_host(host: Arc<ModelHost>, config: LeafCareConfig) -> Self {
        let pipeline = InferencePipeline::new(host.clone(), config.pipeline);
        let worker = ClassifyWorker::start(pipeline.clone(), &config.worker);

        Self {
            host,
            pipeline,
            worker: Some(worker),
        }
    }

    pub fn host(&self) -> &Arc<ModelHost> {
        &self.host
    }

    pub fn pipeline(&self) -> &InferencePipeline {
        &self.pipeline
    }

    /// Runs the pipeline on the calling thread.
    pub fn classify(&self, image: &RawImage) -> ClassificationResult {
        self.pipeline.classify(image)
    }

    pub fn submit(&self, image: RawImage) -> Result<PendingClassification, WorkerError> {
        self.worker()?.submit(image)
    }

    pub fn submit_with<F>(&self, image: RawImage, callback: F) -> Result<(), WorkerError>
    where
        F: FnOnce(ClassificationResult) + Send + 'static,
    {
        self.worker()?.submit_with(image, callback)
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn worker(&self) -> Result<&ClassifyWorker, WorkerError> {
        self.worker.as_ref().ok_or(WorkerError::Closed)
    }

    fn teardown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
            self.host.release();
        }
    }
}

impl Drop for LeafCareSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
