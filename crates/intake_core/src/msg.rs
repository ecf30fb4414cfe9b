use crate::{
    AnswerReport, DocumentMetadata, Failure, JobHandle, Progress, SessionId, StatusReport,
    UploadCandidate,
};

/// What the status poller observed on one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Job still running. `report` is `None` when the check itself failed.
    Progress {
        attempt: u32,
        progress: Option<Progress>,
        report: Option<StatusReport>,
    },
    Completed(DocumentMetadata),
    Failed(Failure),
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a file; starts a new session.
    FileSelected(UploadCandidate),
    /// Upload request returned.
    UploadFinished {
        session: SessionId,
        result: Result<JobHandle, Failure>,
    },
    /// Status poller output.
    Poll { session: SessionId, event: PollEvent },
    /// User asked to delete the uploaded document.
    DeleteRequested,
    DeleteFinished {
        session: SessionId,
        result: Result<(), Failure>,
    },
    /// User submitted a question about the processed document.
    QuestionSubmitted(String),
    AnswerReceived {
        session: SessionId,
        result: Result<AnswerReport, Failure>,
    },
    /// User closed a finished session to start over.
    Dismissed,
    /// Fallback for placeholder wiring.
    NoOp,
}
