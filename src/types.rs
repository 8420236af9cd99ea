use std::path::Path;

use image::DynamicImage;
use ndarray::Array4;
use thiserror::Error;

use crate::error::InferenceError;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("rgb buffer size mismatch: got {got}, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Interleaved 8-bit RGB bitmap as handed over by a camera or gallery picker.
#[derive(Clone, Debug)]
pub struct RawImage {
    rgb: Vec<u8>,
    width: u32,
    height: u32,
}

impl RawImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty { width, height });
        }
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3);
        if rgb.len() != expected {
            return Err(ImageError::BufferSize {
                got: rgb.len(),
                expected,
            });
        }
        Ok(Self { rgb, width, height })
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageError> {
        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(width, height, rgb.into_raw())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| ImageError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_dynamic(decoded)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }
}

/// Model input in NCHW layout with a batch of one.
#[derive(Clone, Debug)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    pub(crate) fn new(array: Array4<f32>) -> Self {
        Self(array)
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }
}

/// What a forward pass hands back: either the score tensor itself or a group
/// of outputs whose first entry holds the scores.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelOutput {
    Scores(Vec<f32>),
    Group(Vec<ModelOutput>),
}

impl ModelOutput {
    pub fn into_scores(self) -> Result<ScoreVector, InferenceError> {
        match self {
            ModelOutput::Scores(values) => ScoreVector::new(values),
            ModelOutput::Group(items) => match items.into_iter().next() {
                Some(ModelOutput::Scores(values)) => ScoreVector::new(values),
                Some(ModelOutput::Group(_)) => Err(InferenceError::UnexpectedOutput(
                    "first group element is itself a group".to_string(),
                )),
                None => Err(InferenceError::UnexpectedOutput(
                    "model returned an empty output group".to_string(),
                )),
            },
        }
    }
}

/// Per-class scores. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn new(values: Vec<f32>) -> Result<Self, InferenceError> {
        if values.is_empty() {
            return Err(InferenceError::EmptyScores);
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    /// Index of the largest score. Only a strictly greater value replaces the
    /// current best, so ties go to the first occurrence.
    pub fn argmax(&self) -> usize {
        let mut best_index = 0;
        let mut best_value = self.0[0];
        for (index, &value) in self.0.iter().enumerate().skip(1) {
            if value > best_value {
                best_value = value;
                best_index = index;
            }
        }
        best_index
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Vietnamese,
    English,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassLabel {
    Healthy,
    BrownSpot,
    PowderyMildew,
    Other(usize),
}

impl ClassLabel {
    pub const KNOWN: [ClassLabel; 3] = [
        ClassLabel::Healthy,
        ClassLabel::BrownSpot,
        ClassLabel::PowderyMildew,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::KNOWN
            .get(index)
            .copied()
            .unwrap_or(ClassLabel::Other(index))
    }

    pub fn index(&self) -> usize {
        match self {
            ClassLabel::Healthy => 0,
            ClassLabel::BrownSpot => 1,
            ClassLabel::PowderyMildew => 2,
            ClassLabel::Other(index) => *index,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ClassLabel::Healthy)
    }

    pub fn display_name(&self, language: Language) -> String {
        let known = match (self, language) {
            (ClassLabel::Healthy, Language::Vietnamese) => "Bình thường",
            (ClassLabel::BrownSpot, Language::Vietnamese) => "Bệnh đốm nâu",
            (ClassLabel::PowderyMildew, Language::Vietnamese) => "Bệnh phấn trắng",
            (ClassLabel::Healthy, Language::English) => "Normal/Healthy",
            (ClassLabel::BrownSpot, Language::English) => "brown-spot disease",
            (ClassLabel::PowderyMildew, Language::English) => "powdery-mildew disease",
            (ClassLabel::Other(index), _) => return format!("Class {index}"),
        };
        known.to_string()
    }

    pub fn emoji(&self) -> &'static str {
        if self.is_healthy() { "🌱" } else { "🔴" }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub label: ClassLabel,
    /// Winning raw score as produced by the model.
    pub confidence: f32,
    /// Percentage shown to the user, after the logit cap.
    pub confidence_percent: f32,
    pub display: String,
    pub fallback: bool,
}

impl ClassificationResult {
    /// Result returned whenever the model could not give a usable answer.
    pub fn fallback(language: Language) -> Self {
        let display = match language {
            Language::Vietnamese => "🌱 Bình thường - Lá cây khỏe mạnh!",
            Language::English => "🌱 Normal/Healthy - Healthy leaf!",
        };
        Self {
            label: ClassLabel::Healthy,
            confidence: 0.0,
            confidence_percent: 0.0,
            display: display.to_string(),
            fallback: true,
        }
    }

    pub fn index(&self) -> usize {
        self.label.index()
    }

    pub fn is_healthy(&self) -> bool {
        self.label.is_healthy()
    }
}
