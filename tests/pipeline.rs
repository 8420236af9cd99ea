use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use leafcare::{
    ClassLabel, Classifier, ClassificationResult, InferenceError, InferencePipeline, Language,
    ModelHost, ModelOutput, NormalizedTensor, PipelineConfig, RawImage,
};

enum Script {
    Output(ModelOutput),
    Fail,
}

type SeenShapes = Arc<Mutex<Vec<Vec<usize>>>>;

struct ScriptedClassifier {
    script: Script,
    seen_shapes: SeenShapes,
}

impl Classifier for ScriptedClassifier {
    fn score(&mut self, input: NormalizedTensor) -> anyhow::Result<ModelOutput> {
        self.seen_shapes.lock().unwrap().push(input.shape().to_vec());
        match &self.script {
            Script::Output(output) => Ok(output.clone()),
            Script::Fail => Err(anyhow!("runtime exploded")),
        }
    }
}

fn pipeline_with(script: Script, language: Language) -> (InferencePipeline, SeenShapes) {
    let seen_shapes = Arc::new(Mutex::new(Vec::new()));
    let host = ModelHost::with_classifier(ScriptedClassifier {
        script,
        seen_shapes: seen_shapes.clone(),
    });
    let config = PipelineConfig {
        language,
        ..PipelineConfig::default()
    };
    (InferencePipeline::new(Arc::new(host), config), seen_shapes)
}

fn leaf() -> RawImage {
    let (width, height) = (64, 48);
    let rgb = (0..width * height)
        .flat_map(|i| [(i % 256) as u8, 160, 40])
        .collect();
    RawImage::new(width, height, rgb).unwrap()
}

#[test]
fn healthy_scores_classify_as_healthy() {
    let (pipeline, seen) = pipeline_with(
        Script::Output(ModelOutput::Scores(vec![0.91, 0.05, 0.04])),
        Language::English,
    );

    let result = pipeline.classify(&leaf());
    assert_eq!(result.label, ClassLabel::Healthy);
    assert_eq!(result.display, "🌱 Normal/Healthy - Healthy leaf! (91.0%)");
    assert!(!result.fallback);
    assert_eq!(*seen.lock().unwrap(), vec![vec![1usize, 3, 224, 224]]);
}

#[test]
fn brown_spot_scores_classify_as_disease() {
    let (pipeline, _) = pipeline_with(
        Script::Output(ModelOutput::Scores(vec![0.02, 0.88, 0.10])),
        Language::Vietnamese,
    );

    let result = pipeline.classify(&leaf());
    assert_eq!(result.label, ClassLabel::BrownSpot);
    assert_eq!(result.display, "🔴 Bệnh đốm nâu - Cần xử lý ngay (88.0%)");
}

#[test]
fn grouped_output_is_unwrapped() {
    let (pipeline, _) = pipeline_with(
        Script::Output(ModelOutput::Group(vec![
            ModelOutput::Scores(vec![1.5, 2.5, 14.0]),
            ModelOutput::Scores(vec![0.0]),
        ])),
        Language::Vietnamese,
    );

    let result = pipeline.try_classify(&leaf()).unwrap();
    assert_eq!(result.label, ClassLabel::PowderyMildew);
    assert_eq!(result.display, "🔴 Bệnh phấn trắng - Cần xử lý ngay (99.9%)");
}

#[test]
fn extra_classes_render_generic_label() {
    let (pipeline, _) = pipeline_with(
        Script::Output(ModelOutput::Scores(vec![0.1, 0.1, 0.1, 0.7])),
        Language::English,
    );

    let result = pipeline.classify(&leaf());
    assert_eq!(result.label, ClassLabel::Other(3));
    assert_eq!(result.display, "🔴 Class 3 - Treat immediately (70.0%)");
}

#[test]
fn unloaded_host_falls_back_to_healthy() {
    let pipeline =
        InferencePipeline::new(Arc::new(ModelHost::unloaded()), PipelineConfig::default());

    assert!(matches!(
        pipeline.try_classify(&leaf()),
        Err(InferenceError::NotLoaded)
    ));
    let result = pipeline.classify(&leaf());
    assert_eq!(result, ClassificationResult::fallback(Language::Vietnamese));
    assert_eq!(result.display, "🌱 Bình thường - Lá cây khỏe mạnh!");
    assert!(result.fallback);
}

#[test]
fn released_host_falls_back() {
    let (pipeline, _) = pipeline_with(
        Script::Output(ModelOutput::Scores(vec![0.0, 1.0])),
        Language::Vietnamese,
    );
    pipeline.host().release();

    assert!(pipeline.classify(&leaf()).fallback);
}

#[test]
fn runtime_failure_falls_back() {
    let (pipeline, _) = pipeline_with(Script::Fail, Language::English);

    assert!(matches!(
        pipeline.try_classify(&leaf()),
        Err(InferenceError::Runtime(_))
    ));
    let result = pipeline.classify(&leaf());
    assert_eq!(result.display, "🌱 Normal/Healthy - Healthy leaf!");
}

#[test]
fn empty_scores_fall_back() {
    let (pipeline, _) = pipeline_with(
        Script::Output(ModelOutput::Scores(Vec::new())),
        Language::Vietnamese,
    );

    assert!(matches!(
        pipeline.try_classify(&leaf()),
        Err(InferenceError::EmptyScores)
    ));
    assert_eq!(pipeline.classify(&leaf()).label, ClassLabel::Healthy);
}
