use crate::{AnswerReport, LifecycleState, SessionId};

/// Snapshot handed to whatever renders the upload widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntakeViewModel {
    pub session: SessionId,
    pub lifecycle: LifecycleState,
    pub document_name: Option<String>,
    pub document_id: Option<String>,
    /// Raw text of the most recent status report.
    pub status_text: Option<String>,
    pub progress_percent: Option<u8>,
    pub poll_attempts: u32,
    pub can_ask: bool,
    pub can_delete: bool,
    pub answer: Option<AnswerReport>,
    /// Non-terminal problem worth showing, e.g. a failed delete.
    pub notice: Option<String>,
    pub dirty: bool,
}
