use std::fmt;

use intake_core::{classify, Failure, FailureDescriptor, RequestPhase};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            TransportFailure::HttpStatus(code) => Some(code),
            _ => None,
        }
    }

    /// Failures a later status check may not repeat.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            TransportFailure::Network | TransportFailure::Timeout | TransportFailure::Decode => true,
            TransportFailure::HttpStatus(code) => code == 408 || code == 429 || code >= 500,
            TransportFailure::InvalidUrl | TransportFailure::Request => false,
        }
    }

    pub fn describe(&self, phase: RequestPhase) -> FailureDescriptor {
        let message = match self.kind {
            TransportFailure::Network | TransportFailure::Timeout => {
                format!("network error: {}", self.message)
            }
            _ => self.message.clone(),
        };
        FailureDescriptor::new(self.status(), message, phase)
    }

    /// User-facing failure for this error in the given phase.
    pub fn classify(&self, phase: RequestPhase) -> Failure {
        classify(&self.describe(phase))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    InvalidUrl,
    /// The request could not be assembled.
    Request,
    HttpStatus(u16),
    Timeout,
    Network,
    /// A success response carried a body we could not read.
    Decode,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::InvalidUrl => write!(f, "invalid url"),
            TransportFailure::Request => write!(f, "invalid request"),
            TransportFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::Network => write!(f, "network error"),
            TransportFailure::Decode => write!(f, "undecodable response"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadResponse {
    pub document_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AskRequest<'a> {
    pub question: &'a str,
    pub document_id: &'a str,
    pub context_window: u32,
}

/// Error payload shape used by the service: `{"error": ...}` or `{"detail": ...}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        [self.error, self.detail]
            .into_iter()
            .flatten()
            .map(|value| match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .find(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::FailureKind;

    #[test]
    fn error_field_wins_over_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"Invalid or corrupted PDF file","detail":"x"}"#)
                .unwrap();
        assert_eq!(body.message().as_deref(), Some("Invalid or corrupted PDF file"));
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#)
                .unwrap();
        let message = body.message().unwrap();
        assert!(message.contains("field required"));
    }

    #[test]
    fn blank_fields_are_skipped() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"","detail":"File too large"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("File too large"));
        assert_eq!(ErrorBody::default().message(), None);
    }

    #[test]
    fn network_failures_classify_as_network_errors() {
        let err = TransportError::new(TransportFailure::Timeout, "operation timed out");
        assert!(err.is_transient());
        assert_eq!(
            err.classify(RequestPhase::Upload).kind,
            FailureKind::NetworkError
        );
    }

    #[test]
    fn client_errors_are_not_transient() {
        let not_found = TransportError::new(TransportFailure::HttpStatus(404), "Document not found");
        assert!(!not_found.is_transient());
        assert_eq!(
            not_found.classify(RequestPhase::StatusCheck).kind,
            FailureKind::DocumentNotFound
        );

        let unavailable = TransportError::new(TransportFailure::HttpStatus(503), "busy");
        assert!(unavailable.is_transient());
    }
}
