use serde::{Deserialize, Serialize};

use crate::failure::classify_message;
use crate::{extract_progress, Failure, FailureKind, Progress};

/// Server-side document metadata, passed through untouched.
pub type DocumentMetadata = serde_json::Map<String, serde_json::Value>;

/// Opaque identifier the service hands back for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub document_id: String,
}

impl JobHandle {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
        }
    }
}

/// One answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}

/// What a status report means for the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Completed(DocumentMetadata),
    Failed(Failure),
    /// Still working; progress when the text carried a percentage.
    Pending(Option<Progress>),
}

const COMPLETED: &str = "completed";
const ERROR_PREFIX: &str = "error";

pub fn interpret_status(report: &StatusReport) -> StatusOutcome {
    let status = report.status.trim();
    if status == COMPLETED {
        return StatusOutcome::Completed(report.metadata.clone().unwrap_or_default());
    }
    if status.starts_with(ERROR_PREFIX) {
        // Only a literal `error:` prefix is stripped; `errored ...` stays whole.
        let message = match status
            .strip_prefix(ERROR_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
        {
            Some(rest) => rest.trim(),
            None if status == ERROR_PREFIX => "",
            None => status,
        };
        return StatusOutcome::Failed(processing_failure(message, report.error.as_deref()));
    }
    StatusOutcome::Pending(extract_progress(status))
}

fn processing_failure(message: &str, fallback: Option<&str>) -> Failure {
    let message = if message.is_empty() {
        fallback.map(str::trim).unwrap_or_default()
    } else {
        message
    };
    if message.is_empty() {
        return Failure::of(FailureKind::ProcessingFailed);
    }
    let kind = match classify_message(message) {
        Some(kind @ (FailureKind::CorruptedSource | FailureKind::EmptySource)) => kind,
        _ => FailureKind::ProcessingFailed,
    };
    Failure::new(kind, message)
}
