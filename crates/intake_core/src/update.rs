use intake_logging::{intake_debug, intake_info, intake_warn};

use crate::{
    prepare_question, validate_candidate, Effect, Failure, FailureKind, IntakeState,
    LifecycleEvent, LifecycleState, Msg, PollEvent, SessionId,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: IntakeState, msg: Msg) -> (IntakeState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(candidate) => {
            let mut effects = Vec::with_capacity(2);
            // Two poll loops must never feed the same widget.
            if matches!(state.lifecycle(), LifecycleState::Polling { .. }) {
                effects.push(Effect::CancelPolling {
                    session: state.session(),
                });
            }

            let session = state.begin_session(candidate.name());
            state.apply(LifecycleEvent::FileSelected);
            match validate_candidate(&candidate) {
                Ok(()) => {
                    intake_info!(
                        "session {} accepted {} ({} bytes)",
                        session,
                        candidate.name(),
                        candidate.size()
                    );
                    state.apply(LifecycleEvent::ValidationAccepted);
                    effects.push(Effect::Upload { session, candidate });
                }
                Err(failure) => {
                    intake_warn!(
                        "session {} rejected {}: {}",
                        session,
                        candidate.name(),
                        failure.kind
                    );
                    state.apply(LifecycleEvent::ValidationRejected(failure));
                }
            }
            effects
        }
        Msg::UploadFinished { session, result } => {
            if is_stale(&state, session) {
                return (state, Vec::new());
            }
            match result {
                Ok(handle) => {
                    if state.apply(LifecycleEvent::UploadSucceeded) {
                        state.set_handle(handle.clone());
                        vec![Effect::StartPolling { session, handle }]
                    } else {
                        Vec::new()
                    }
                }
                Err(failure) => {
                    let effects = credential_effects(&failure);
                    state.apply(LifecycleEvent::UploadFailed(failure));
                    effects
                }
            }
        }
        Msg::Poll { session, event } => {
            if is_stale(&state, session) {
                return (state, Vec::new());
            }
            match event {
                PollEvent::Progress {
                    attempt,
                    progress,
                    report,
                } => {
                    if matches!(state.lifecycle(), LifecycleState::Polling { .. }) {
                        state.record_poll(attempt, report);
                        state.apply(LifecycleEvent::Progressed(progress));
                    }
                    Vec::new()
                }
                PollEvent::Completed(metadata) => {
                    state.apply(LifecycleEvent::Completed(metadata));
                    Vec::new()
                }
                PollEvent::Failed(failure) => {
                    let effects = credential_effects(&failure);
                    state.apply(LifecycleEvent::Failed(failure));
                    effects
                }
                PollEvent::TimedOut { attempts } => {
                    if state.apply(LifecycleEvent::TimedOut) {
                        state.record_poll(attempts, None);
                    }
                    Vec::new()
                }
            }
        }
        Msg::DeleteRequested => match state.handle().cloned() {
            Some(handle) if state.can_delete() => {
                state.set_awaiting_delete(true);
                vec![Effect::Delete {
                    session: state.session(),
                    handle,
                }]
            }
            _ => Vec::new(),
        },
        Msg::DeleteFinished { session, result } => {
            if is_stale(&state, session) || !state.is_awaiting_delete() {
                return (state, Vec::new());
            }
            state.set_awaiting_delete(false);
            match result {
                Ok(()) => {
                    state.apply(LifecycleEvent::Reset);
                    state.clear_document();
                    state.set_notice(None);
                    Vec::new()
                }
                // The document's last known lifecycle stands.
                Err(failure) => {
                    let effects = credential_effects(&failure);
                    state.set_notice(Some(failure));
                    effects
                }
            }
        }
        Msg::QuestionSubmitted(raw) => {
            let Some(handle) = state.handle().cloned().filter(|_| state.can_ask()) else {
                return (state, Vec::new());
            };
            match prepare_question(&raw) {
                Some(question) => {
                    state.set_awaiting_answer(true);
                    state.set_notice(None);
                    vec![Effect::Ask {
                        session: state.session(),
                        handle,
                        question,
                    }]
                }
                None => Vec::new(),
            }
        }
        Msg::AnswerReceived { session, result } => {
            if is_stale(&state, session) || !state.is_awaiting_answer() {
                return (state, Vec::new());
            }
            state.set_awaiting_answer(false);
            match result {
                Ok(answer) => {
                    state.set_answer(answer);
                    Vec::new()
                }
                Err(failure) => {
                    let effects = credential_effects(&failure);
                    state.set_notice(Some(failure));
                    effects
                }
            }
        }
        Msg::Dismissed => {
            if state.apply(LifecycleEvent::Reset) {
                state.clear_document();
                state.set_notice(None);
                state.set_awaiting_answer(false);
                state.set_awaiting_delete(false);
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn is_stale(state: &IntakeState, session: SessionId) -> bool {
    let stale = session != state.session();
    if stale {
        intake_debug!(
            "dropping result for session {} (current {})",
            session,
            state.session()
        );
    }
    stale
}

fn credential_effects(failure: &Failure) -> Vec<Effect> {
    if failure.kind == FailureKind::CredentialRequired {
        vec![Effect::CredentialRequired]
    } else {
        Vec::new()
    }
}
