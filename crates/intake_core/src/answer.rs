use serde::{Deserialize, Serialize};

/// Longest question forwarded to the service, in characters.
pub const MAX_QUESTION_CHARS: usize = 500;

/// Answer to a question asked against a processed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerReport {
    pub answer: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub metadata: AnswerMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerMetadata {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub chunks_used: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
    #[serde(default)]
    pub context_window: Option<u32>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Trim a question and cap it at [`MAX_QUESTION_CHARS`].
///
/// Returns `None` for blank input, which is never sent.
pub fn prepare_question(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_QUESTION_CHARS).collect())
}
