use std::sync::Arc;

use intake_core::{
    interpret_status, JobHandle, Msg, PollEvent, RequestPhase, RetryBudget, SessionId,
    StatusOutcome,
};
use intake_logging::{intake_debug, intake_info, intake_warn, short_id};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Transport;

/// Receives every event a poller produces, in order.
pub trait PollSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

/// Forwards poll events into the controller inbox tagged with their session.
pub struct ChannelPollSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<Msg>,
}

impl ChannelPollSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self { session, tx }
    }
}

impl PollSink for ChannelPollSink {
    fn emit(&self, event: PollEvent) {
        let _ = self.tx.send(Msg::Poll {
            session: self.session,
            event,
        });
    }
}

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

/// Repeats status checks for one job until it settles or the budget runs out.
pub struct StatusPoller {
    transport: Arc<dyn Transport>,
    handle: JobHandle,
    budget: RetryBudget,
}

impl StatusPoller {
    pub fn new(transport: Arc<dyn Transport>, handle: JobHandle) -> Self {
        Self {
            transport,
            handle,
            budget: RetryBudget::default(),
        }
    }

    /// Replace the budget; the attempt count of `budget` is kept as is.
    pub fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn spawn<S>(self, sink: S) -> PollerHandle
    where
        S: PollSink + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move { self.run(&sink, child).await });
        PollerHandle { token, task }
    }

    /// Drive the loop on the current task.
    ///
    /// Each cycle waits one interval, then checks. Cancellation is honoured
    /// while waiting and after a check returns; a check is never interrupted.
    pub async fn run(mut self, sink: &dyn PollSink, token: CancellationToken) -> PollExit {
        let id = short_id(&self.handle.document_id).to_string();
        intake_debug!(
            "poller {} started ({} attempts every {:?})",
            id,
            self.budget.max_attempts(),
            self.budget.interval()
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    intake_debug!("poller {} cancelled while scheduled", id);
                    return PollExit::Cancelled;
                }
                _ = tokio::time::sleep(self.budget.interval()) => {}
            }

            let result = self.transport.check_status(&self.handle).await;
            if token.is_cancelled() {
                intake_debug!("poller {} cancelled during a check; result dropped", id);
                return PollExit::Cancelled;
            }

            let attempt = self.budget.record_attempt();
            match result {
                Ok(report) => match interpret_status(&report) {
                    StatusOutcome::Completed(metadata) => {
                        intake_info!("document {} completed after {} checks", id, attempt);
                        sink.emit(PollEvent::Completed(metadata));
                        return PollExit::Completed;
                    }
                    StatusOutcome::Failed(failure) => {
                        intake_warn!("document {} failed: {}", id, failure);
                        sink.emit(PollEvent::Failed(failure));
                        return PollExit::Failed;
                    }
                    StatusOutcome::Pending(progress) => {
                        if self.budget.is_exhausted() {
                            break;
                        }
                        sink.emit(PollEvent::Progress {
                            attempt,
                            progress,
                            report: Some(report),
                        });
                    }
                },
                Err(err) if err.is_transient() => {
                    intake_warn!(
                        "status check {}/{} for {} failed: {}",
                        attempt,
                        self.budget.max_attempts(),
                        id,
                        err
                    );
                    if self.budget.is_exhausted() {
                        break;
                    }
                    sink.emit(PollEvent::Progress {
                        attempt,
                        progress: None,
                        report: None,
                    });
                }
                Err(err) => {
                    let failure = err.classify(RequestPhase::StatusCheck);
                    intake_warn!("status check for {} rejected: {}", id, err);
                    sink.emit(PollEvent::Failed(failure));
                    return PollExit::Failed;
                }
            }
        }

        intake_warn!(
            "document {} still processing after {} checks; giving up",
            id,
            self.budget.attempts()
        );
        sink.emit(PollEvent::TimedOut {
            attempts: self.budget.attempts(),
        });
        PollExit::TimedOut
    }
}

/// Revocable handle to a spawned poller.
#[derive(Debug)]
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<PollExit>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> PollExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(err) => {
                intake_warn!("poller task ended abnormally: {}", err);
                PollExit::Cancelled
            }
        }
    }
}
