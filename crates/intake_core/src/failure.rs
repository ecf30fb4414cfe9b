use std::fmt;

use serde::{Deserialize, Serialize};

/// Every way an intake session can go wrong, as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Candidate is not a PDF (client-side, pre-flight).
    InvalidType,
    /// Candidate exceeds the upload limit (client-side or HTTP 413).
    FileTooLarge,
    UploadFailed,
    NetworkError,
    ServerError,
    DocumentNotFound,
    CorruptedSource,
    EmptySource,
    /// The server reported an `error:` status for the job.
    ProcessingFailed,
    /// The poll budget ran out before the job finished.
    TimedOut,
    /// HTTP 401: an API key must be supplied by the credential owner.
    CredentialRequired,
}

impl FailureKind {
    /// Message used when no more specific text is available.
    pub fn default_message(self) -> &'static str {
        match self {
            FailureKind::InvalidType => "Only PDF files are supported",
            FailureKind::FileTooLarge => "File is too large (maximum 10 MB)",
            FailureKind::UploadFailed => "Upload failed",
            FailureKind::NetworkError => "Network error: unable to reach the server",
            FailureKind::ServerError => "The server encountered an error",
            FailureKind::DocumentNotFound => "Document not found",
            FailureKind::CorruptedSource => "Invalid or corrupted PDF file",
            FailureKind::EmptySource => "PDF document contains no extractable text",
            FailureKind::ProcessingFailed => "Document processing failed",
            FailureKind::TimedOut => "Processing timed out",
            FailureKind::CredentialRequired => "An API key is required",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidType => "invalid type",
            FailureKind::FileTooLarge => "file too large",
            FailureKind::UploadFailed => "upload failed",
            FailureKind::NetworkError => "network error",
            FailureKind::ServerError => "server error",
            FailureKind::DocumentNotFound => "document not found",
            FailureKind::CorruptedSource => "corrupted source",
            FailureKind::EmptySource => "empty source",
            FailureKind::ProcessingFailed => "processing failed",
            FailureKind::TimedOut => "timed out",
            FailureKind::CredentialRequired => "credential required",
        };
        f.write_str(name)
    }
}

/// A classified failure carrying exactly one human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure with the kind's default message.
    pub fn of(kind: FailureKind) -> Self {
        Self::new(kind, kind.default_message())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

/// Which request was in flight when a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Upload,
    StatusCheck,
    Delete,
    Ask,
    Health,
}

/// Raw facts about a failed request, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub status: Option<u16>,
    pub message: String,
    pub phase: RequestPhase,
}

impl FailureDescriptor {
    pub fn new(status: Option<u16>, message: impl Into<String>, phase: RequestPhase) -> Self {
        Self {
            status,
            message: message.into(),
            phase,
        }
    }
}

/// Map a failed request onto the failure taxonomy.
///
/// Rules are checked in priority order; only the status code and the
/// message text are consulted.
pub fn classify(descriptor: &FailureDescriptor) -> Failure {
    match descriptor.status {
        Some(401) => return Failure::of(FailureKind::CredentialRequired),
        Some(413) => return Failure::of(FailureKind::FileTooLarge),
        Some(404) if descriptor.phase == RequestPhase::StatusCheck => {
            return Failure::of(FailureKind::DocumentNotFound);
        }
        Some(400) => {
            let detail = descriptor.message.trim();
            return if detail.is_empty() {
                Failure::of(FailureKind::ServerError)
            } else {
                Failure::new(FailureKind::ServerError, detail)
            };
        }
        _ => {}
    }

    if let Some(kind) = classify_message(&descriptor.message) {
        return Failure::of(kind);
    }

    if descriptor.phase == RequestPhase::Upload {
        let detail = descriptor.message.trim();
        return if detail.is_empty() {
            Failure::of(FailureKind::UploadFailed)
        } else {
            Failure::new(FailureKind::UploadFailed, format!("Upload failed: {detail}"))
        };
    }
    Failure::of(FailureKind::ServerError)
}

/// Substring rules shared by request failures and server-reported job errors.
pub(crate) fn classify_message(message: &str) -> Option<FailureKind> {
    let lowered = message.to_lowercase();
    if lowered.contains("corrupted") {
        Some(FailureKind::CorruptedSource)
    } else if lowered.contains("no text content") {
        Some(FailureKind::EmptySource)
    } else if lowered.contains("network") {
        Some(FailureKind::NetworkError)
    } else {
        None
    }
}
