use crate::types::{ClassLabel, ClassificationResult, Language, ScoreVector};

/// Upper bound for the displayed percentage when the winning score looks
/// like a raw logit.
pub const LOGIT_CAP_PERCENT: f32 = 99.9;

/// Scores above 1.0 are treated as logits and capped; anything else is taken
/// as a probability as-is. No softmax is applied.
pub fn confidence_percent(score: f32) -> f32 {
    if score > 1.0 {
        (score * 100.0).min(LOGIT_CAP_PERCENT)
    } else {
        score * 100.0
    }
}

pub fn format_percent(percent: f32) -> String {
    format!("{percent:.1}%")
}

pub fn render(label: ClassLabel, percent: f32, language: Language) -> String {
    let name = label.display_name(language);
    let action = match (label.is_healthy(), language) {
        (true, Language::Vietnamese) => "Lá cây khỏe mạnh!",
        (false, Language::Vietnamese) => "Cần xử lý ngay",
        (true, Language::English) => "Healthy leaf!",
        (false, Language::English) => "Treat immediately",
    };
    format!(
        "{} {} - {} ({})",
        label.emoji(),
        name,
        action,
        format_percent(percent)
    )
}

pub fn decode(scores: &ScoreVector, language: Language) -> ClassificationResult {
    let index = scores.argmax();
    let confidence = scores.values()[index];
    let percent = confidence_percent(confidence);
    let label = ClassLabel::from_index(index);

    ClassificationResult {
        label,
        confidence,
        confidence_percent: percent,
        display: render(label, percent, language),
        fallback: false,
    }
}
