use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{Tensor, ValueType};

use super::{Classifier, ModelInfo, TensorInfo};
use crate::types::{ModelOutput, NormalizedTensor};

/// ONNX Runtime session holding the leaf classifier.
pub struct OrtClassifier {
    session: Session,
}

impl OrtClassifier {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads.max(1))?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        Ok(Self { session })
    }
}

impl Classifier for OrtClassifier {
    fn score(&mut self, input: NormalizedTensor) -> Result<ModelOutput> {
        let tensor = Tensor::from_array(input.into_array())?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let mut extracted = (0..outputs.len())
            .map(|idx| -> Result<ModelOutput> {
                let array = outputs[idx]
                    .try_extract_array::<f32>()
                    .with_context(|| format!("output {idx} is not an f32 tensor"))?;
                Ok(ModelOutput::Scores(array.iter().copied().collect()))
            })
            .collect::<Result<Vec<_>>>()?;

        if extracted.len() == 1 {
            Ok(extracted.remove(0))
        } else {
            log::debug!("model returned {} outputs, using the first", extracted.len());
            Ok(ModelOutput::Group(extracted))
        }
    }

    fn describe(&self) -> Option<ModelInfo> {
        let inputs = self
            .session
            .inputs
            .iter()
            .map(|input| TensorInfo {
                name: input.name.clone(),
                detail: describe_value_type(&input.input_type),
            })
            .collect();
        let outputs = self
            .session
            .outputs
            .iter()
            .map(|output| TensorInfo {
                name: output.name.clone(),
                detail: describe_value_type(&output.output_type),
            })
            .collect();

        Some(ModelInfo { inputs, outputs })
    }
}

fn describe_value_type(value_type: &ValueType) -> String {
    match value_type {
        ValueType::Tensor { shape, .. } => format!("tensor shape={shape:?}"),
        other => format!("{other:?}"),
    }
}
