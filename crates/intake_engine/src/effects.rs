use std::collections::HashMap;
use std::sync::Arc;

use intake_core::{Effect, Msg, RequestPhase, RetryBudget, SessionId};
use intake_logging::{intake_debug, intake_info, intake_warn, short_id};
use tokio::sync::mpsc;

use crate::poller::{ChannelPollSink, PollerHandle, StatusPoller};
use crate::Transport;

/// Collaborator told when the service asks for an API key.
pub trait CredentialPrompt: Send + Sync {
    fn credential_required(&self);
}

/// Default prompt: leave a note in the log and let the caller decide.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCredentialPrompt;

impl CredentialPrompt for LogCredentialPrompt {
    fn credential_required(&self) {
        intake_warn!("the service requires an API key; configure one and retry");
    }
}

/// Executes reducer effects on the tokio runtime and reports back as `Msg`s.
pub struct EffectRunner {
    transport: Arc<dyn Transport>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    budget: RetryBudget,
    prompt: Arc<dyn CredentialPrompt>,
    pollers: HashMap<SessionId, PollerHandle>,
}

impl EffectRunner {
    pub fn new(transport: Arc<dyn Transport>, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self {
            transport,
            msg_tx,
            budget: RetryBudget::default(),
            prompt: Arc::new(LogCredentialPrompt),
            pollers: HashMap::new(),
        }
    }

    pub fn set_budget(&mut self, budget: RetryBudget) {
        self.budget = budget;
    }

    pub fn set_credential_prompt(&mut self, prompt: Arc<dyn CredentialPrompt>) {
        self.prompt = prompt;
    }

    /// Number of pollers that have not finished yet.
    pub fn active_pollers(&self) -> usize {
        self.pollers.values().filter(|p| !p.is_finished()).count()
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        self.pollers.retain(|_, poller| !poller.is_finished());
        for effect in effects {
            self.run_one(effect);
        }
    }

    fn run_one(&mut self, effect: Effect) {
        match effect {
            Effect::Upload { session, candidate } => {
                intake_info!("session {} uploading {}", session, candidate.name());
                let transport = self.transport.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let result = transport
                        .upload(&candidate)
                        .await
                        .map_err(|err| err.classify(RequestPhase::Upload));
                    let _ = tx.send(Msg::UploadFinished { session, result });
                });
            }
            Effect::StartPolling { session, handle } => {
                intake_info!(
                    "session {} polling {}",
                    session,
                    short_id(&handle.document_id)
                );
                self.stop_poller(session);
                let poller = StatusPoller::new(self.transport.clone(), handle)
                    .with_budget(self.budget)
                    .spawn(ChannelPollSink::new(session, self.msg_tx.clone()));
                self.pollers.insert(session, poller);
            }
            Effect::CancelPolling { session } => self.stop_poller(session),
            Effect::Delete { session, handle } => {
                let transport = self.transport.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let result = transport
                        .delete(&handle)
                        .await
                        .map_err(|err| err.classify(RequestPhase::Delete));
                    let _ = tx.send(Msg::DeleteFinished { session, result });
                });
            }
            Effect::Ask {
                session,
                handle,
                question,
            } => {
                let transport = self.transport.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let result = transport
                        .ask(&handle, &question)
                        .await
                        .map_err(|err| err.classify(RequestPhase::Ask));
                    let _ = tx.send(Msg::AnswerReceived { session, result });
                });
            }
            Effect::CredentialRequired => self.prompt.credential_required(),
        }
    }

    fn stop_poller(&mut self, session: SessionId) {
        if let Some(poller) = self.pollers.remove(&session) {
            intake_debug!("cancelling poller for session {}", session);
            poller.cancel();
        }
    }

    /// Cancel every poller still running.
    pub fn shutdown(&mut self) {
        for (_, poller) in self.pollers.drain() {
            poller.cancel();
        }
    }
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
