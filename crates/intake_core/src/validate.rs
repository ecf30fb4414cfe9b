use std::fmt;

use bytes::Bytes;

use crate::{Failure, FailureKind};

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const PDF_EXTENSION: &str = ".pdf";

/// A file the user picked for upload. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    content: Bytes,
    name: String,
    size: u64,
}

impl UploadCandidate {
    /// Candidate whose declared size is the content length.
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self {
            content,
            name: name.into(),
            size,
        }
    }

    /// Candidate with a size reported by the file picker rather than measured.
    pub fn with_declared_size(name: impl Into<String>, content: impl Into<Bytes>, size: u64) -> Self {
        Self {
            content: content.into(),
            name: name.into(),
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Debug for UploadCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCandidate")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("content_len", &self.content.len())
            .finish()
    }
}

/// Pre-flight check run before anything touches the network.
///
/// The extension is checked first, so an oversized non-PDF reports
/// `InvalidType`.
pub fn validate_candidate(candidate: &UploadCandidate) -> Result<(), Failure> {
    if !candidate.name.to_lowercase().ends_with(PDF_EXTENSION) {
        return Err(Failure::of(FailureKind::InvalidType));
    }
    if candidate.size > MAX_UPLOAD_BYTES {
        return Err(Failure::of(FailureKind::FileTooLarge));
    }
    Ok(())
}
