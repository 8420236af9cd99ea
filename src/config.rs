use std::path::PathBuf;

use crate::{
    model_store::{default_bundled_model_path, default_model_path},
    types::Language,
};

pub const INPUT_SIZE: u32 = 224;
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Clone, Debug, Default)]
pub struct LeafCareConfig {
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub worker: WorkerConfig,
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    /// Read-only artifact shipped with the application.
    pub bundled_path: PathBuf,
    /// Writable location the artifact is copied to before loading.
    pub model_path: PathBuf,
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bundled_path: default_bundled_model_path(),
            model_path: default_model_path(),
            intra_threads: 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub language: Language,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_size: INPUT_SIZE,
            mean: MEAN,
            std: STD,
            language: Language::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { queue_capacity: 4 }
    }
}
