use serde::{Deserialize, Serialize};

use crate::view_model::IntakeViewModel;
use crate::{AnswerReport, DocumentMetadata, Failure, JobHandle, Progress, StatusReport};

/// Identifies one file selection and everything that follows from it.
pub type SessionId = u64;

/// Where the current upload is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Idle,
    Validating,
    Uploading,
    Polling {
        progress: Progress,
    },
    Completed {
        metadata: DocumentMetadata,
    },
    Failed {
        failure: Failure,
    },
    TimedOut,
}

/// Inputs to the lifecycle transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    FileSelected,
    ValidationRejected(Failure),
    ValidationAccepted,
    UploadFailed(Failure),
    UploadSucceeded,
    /// A poll found the job still running.
    Progressed(Option<Progress>),
    Completed(DocumentMetadata),
    Failed(Failure),
    TimedOut,
    /// User started over or deleted the document.
    Reset,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Completed { .. } | LifecycleState::Failed { .. } | LifecycleState::TimedOut
        )
    }

    /// Work is outstanding and a result is still expected.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            LifecycleState::Validating | LifecycleState::Uploading | LifecycleState::Polling { .. }
        )
    }

    pub fn progress(&self) -> Option<Progress> {
        match self {
            LifecycleState::Polling { progress } => Some(*progress),
            LifecycleState::Completed { .. } => Some(Progress::COMPLETE),
            _ => None,
        }
    }

    /// Apply one event. `None` means the event is not valid in this state.
    pub fn on(&self, event: LifecycleEvent) -> Option<LifecycleState> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let next = match (self, event) {
            (S::Idle, E::FileSelected) => S::Validating,
            (S::Validating, E::ValidationRejected(failure)) => S::Failed { failure },
            (S::Validating, E::ValidationAccepted) => S::Uploading,
            (S::Uploading, E::UploadFailed(failure)) => S::Failed { failure },
            (S::Uploading, E::UploadSucceeded) => S::Polling {
                progress: Progress::ZERO,
            },
            // Unknown progress keeps the last known value rather than reading as 0%.
            (S::Polling { progress }, E::Progressed(reported)) => S::Polling {
                progress: reported.unwrap_or(*progress),
            },
            (S::Polling { .. }, E::Completed(metadata)) => S::Completed { metadata },
            (S::Polling { .. }, E::Failed(failure)) => S::Failed { failure },
            (S::Polling { .. }, E::TimedOut) => S::TimedOut,
            (state, E::Reset) if state.is_terminal() => S::Idle,
            _ => return None,
        };
        Some(next)
    }
}

/// Full controller state: the lifecycle plus the session facts around it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntakeState {
    session: SessionId,
    lifecycle: LifecycleState,
    document_name: Option<String>,
    handle: Option<JobHandle>,
    last_report: Option<StatusReport>,
    poll_attempts: u32,
    answer: Option<AnswerReport>,
    notice: Option<Failure>,
    awaiting_answer: bool,
    awaiting_delete: bool,
    transitions: Vec<LifecycleState>,
    dirty: bool,
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.handle.as_ref()
    }

    pub fn last_report(&self) -> Option<&StatusReport> {
        self.last_report.as_ref()
    }

    pub fn answer(&self) -> Option<&AnswerReport> {
        self.answer.as_ref()
    }

    pub fn notice(&self) -> Option<&Failure> {
        self.notice.as_ref()
    }

    /// Nothing is running and no reply is outstanding.
    pub fn is_settled(&self) -> bool {
        !self.lifecycle.is_busy() && !self.awaiting_answer && !self.awaiting_delete
    }

    pub fn view(&self) -> IntakeViewModel {
        IntakeViewModel {
            session: self.session,
            lifecycle: self.lifecycle.clone(),
            document_name: self.document_name.clone(),
            document_id: self.handle.as_ref().map(|h| h.document_id.clone()),
            status_text: self.last_report.as_ref().map(|r| r.status.clone()),
            progress_percent: self.lifecycle.progress().map(Progress::percent),
            poll_attempts: self.poll_attempts,
            can_ask: self.can_ask(),
            can_delete: self.can_delete(),
            answer: self.answer.clone(),
            notice: self.notice.as_ref().map(|f| f.message.clone()),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Lifecycle values entered since the last call, oldest first.
    pub fn drain_transitions(&mut self) -> Vec<LifecycleState> {
        std::mem::take(&mut self.transitions)
    }

    pub(crate) fn is_awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    pub(crate) fn is_awaiting_delete(&self) -> bool {
        self.awaiting_delete
    }

    pub(crate) fn can_ask(&self) -> bool {
        matches!(self.lifecycle, LifecycleState::Completed { .. })
            && self.handle.is_some()
            && !self.awaiting_answer
    }

    pub(crate) fn can_delete(&self) -> bool {
        self.lifecycle.is_terminal()
            && self.handle.is_some()
            && !self.awaiting_delete
            && !self.awaiting_answer
    }

    /// Drop the previous session and start a fresh one in `Idle`.
    pub(crate) fn begin_session(&mut self, document_name: &str) -> SessionId {
        let session = self.session + 1;
        let transitions = std::mem::take(&mut self.transitions);
        *self = Self {
            session,
            document_name: Some(document_name.to_string()),
            transitions,
            dirty: true,
            ..Self::default()
        };
        session
    }

    /// Run the transition table; returns false when the event was not applicable.
    pub(crate) fn apply(&mut self, event: LifecycleEvent) -> bool {
        let Some(next) = self.lifecycle.on(event) else {
            return false;
        };
        if next != self.lifecycle {
            self.transitions.push(next.clone());
            self.lifecycle = next;
            self.dirty = true;
        }
        true
    }

    pub(crate) fn set_handle(&mut self, handle: JobHandle) {
        self.handle = Some(handle);
        self.dirty = true;
    }

    pub(crate) fn record_poll(&mut self, attempt: u32, report: Option<StatusReport>) {
        self.poll_attempts = self.poll_attempts.max(attempt);
        if report.is_some() {
            self.last_report = report;
        }
        self.dirty = true;
    }

    pub(crate) fn clear_document(&mut self) {
        self.handle = None;
        self.last_report = None;
        self.answer = None;
        self.awaiting_answer = false;
        self.poll_attempts = 0;
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: Option<Failure>) {
        self.notice = notice;
        self.dirty = true;
    }

    pub(crate) fn set_awaiting_answer(&mut self, awaiting: bool) {
        self.awaiting_answer = awaiting;
        self.dirty = true;
    }

    pub(crate) fn set_awaiting_delete(&mut self, awaiting: bool) {
        self.awaiting_delete = awaiting;
        self.dirty = true;
    }

    pub(crate) fn set_answer(&mut self, answer: AnswerReport) {
        self.answer = Some(answer);
        self.dirty = true;
    }
}
