use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    thread,
};

use crossbeam_channel::{Receiver, Sender, bounded};

use super::InferencePipeline;
use crate::{
    config::WorkerConfig,
    error::WorkerError,
    types::{ClassificationResult, RawImage},
};

type Callback = Box<dyn FnOnce(ClassificationResult) + Send + 'static>;

enum Reply {
    Channel(Sender<ClassificationResult>),
    Callback(Callback),
}

struct Job {
    image: RawImage,
    reply: Reply,
}

/// Single background thread running classification jobs one at a time, in
/// submission order.
#[derive(Debug)]
pub struct ClassifyWorker {
    job_tx: Option<Sender<Job>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ClassifyWorker {
    pub fn start(pipeline: InferencePipeline, config: &WorkerConfig) -> Self {
        let (job_tx, job_rx) = bounded(config.queue_capacity.max(1));
        let handle = thread::spawn(move || run_worker_loop(pipeline, job_rx));

        Self {
            job_tx: Some(job_tx),
            handle: Some(handle),
        }
    }

    pub fn submit(&self, image: RawImage) -> Result<PendingClassification, WorkerError> {
        let (result_tx, result_rx) = bounded(1);
        self.send(Job {
            image,
            reply: Reply::Channel(result_tx),
        })?;
        Ok(PendingClassification { result_rx })
    }

    /// Runs `callback` on the worker thread once the result is ready.
    pub fn submit_with<F>(&self, image: RawImage, callback: F) -> Result<(), WorkerError>
    where
        F: FnOnce(ClassificationResult) + Send + 'static,
    {
        self.send(Job {
            image,
            reply: Reply::Callback(Box::new(callback)),
        })
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn send(&self, job: Job) -> Result<(), WorkerError> {
        let job_tx = self.job_tx.as_ref().ok_or(WorkerError::Closed)?;
        job_tx.send(job).map_err(|_| WorkerError::Closed)
    }

    fn stop(&mut self) {
        // Closing the queue lets the loop drain what is left and exit.
        self.job_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("classify worker panicked");
            }
        }
    }
}

impl Drop for ClassifyWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker_loop(pipeline: InferencePipeline, job_rx: Receiver<Job>) {
    while let Ok(job) = job_rx.recv() {
        let result = pipeline.classify(&job.image);
        match job.reply {
            Reply::Channel(result_tx) => {
                // The caller may have dropped its pending handle.
                let _ = result_tx.send(result);
            }
            Reply::Callback(callback) => {
                if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
                    log::error!("classification callback panicked");
                }
            }
        }
    }
    log::debug!("classify worker stopped");
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct PendingClassification {
    result_rx: Receiver<ClassificationResult>,
}

impl PendingClassification {
    pub fn wait(self) -> Result<ClassificationResult, WorkerError> {
        self.result_rx.recv().map_err(|_| WorkerError::Closed)
    }

    pub fn try_result(&self) -> Option<ClassificationResult> {
        self.result_rx.try_recv().ok()
    }
}
