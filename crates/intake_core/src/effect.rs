use crate::{JobHandle, SessionId, UploadCandidate};

/// Side effects requested by [`crate::update`]; executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload {
        session: SessionId,
        candidate: UploadCandidate,
    },
    StartPolling {
        session: SessionId,
        handle: JobHandle,
    },
    CancelPolling {
        session: SessionId,
    },
    Delete {
        session: SessionId,
        handle: JobHandle,
    },
    Ask {
        session: SessionId,
        handle: JobHandle,
        question: String,
    },
    /// Hand off to whoever owns credential entry.
    CredentialRequired,
}
