//! Intake core: pure lifecycle state machine, validation and classification.
mod answer;
mod budget;
mod effect;
mod failure;
mod msg;
mod progress;
mod state;
mod status;
mod update;
mod validate;
mod view_model;

pub use answer::{prepare_question, AnswerMetadata, AnswerReport, MAX_QUESTION_CHARS};
pub use budget::{RetryBudget, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
pub use effect::Effect;
pub use failure::{classify, Failure, FailureDescriptor, FailureKind, RequestPhase};
pub use msg::{Msg, PollEvent};
pub use progress::{extract_progress, Progress};
pub use state::{IntakeState, LifecycleEvent, LifecycleState, SessionId};
pub use status::{interpret_status, DocumentMetadata, JobHandle, StatusOutcome, StatusReport};
pub use update::update;
pub use validate::{validate_candidate, UploadCandidate, MAX_UPLOAD_BYTES};
pub use view_model::IntakeViewModel;
