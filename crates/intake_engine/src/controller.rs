use std::sync::Arc;

use intake_core::{
    update, IntakeState, IntakeViewModel, LifecycleState, Msg, RetryBudget, UploadCandidate,
};
use intake_logging::intake_debug;
use tokio::sync::{broadcast, mpsc};

use crate::effects::{CredentialPrompt, EffectRunner};
use crate::Transport;

const TRANSITION_CAPACITY: usize = 64;

/// Owns the intake state for one upload widget and runs its effects.
///
/// All state changes happen on the caller's task through [`dispatch`];
/// spawned requests and the poller only post messages back to the inbox.
///
/// [`dispatch`]: LifecycleController::dispatch
pub struct LifecycleController {
    state: IntakeState,
    runner: EffectRunner,
    inbox: mpsc::UnboundedReceiver<Msg>,
    transitions: broadcast::Sender<LifecycleState>,
}

impl LifecycleController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (msg_tx, inbox) = mpsc::unbounded_channel();
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            state: IntakeState::new(),
            runner: EffectRunner::new(transport, msg_tx),
            inbox,
            transitions,
        }
    }

    pub fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.runner.set_budget(budget);
        self
    }

    pub fn with_credential_prompt(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.runner.set_credential_prompt(prompt);
        self
    }

    /// Every lifecycle value entered from now on, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleState> {
        self.transitions.subscribe()
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        self.state.lifecycle()
    }

    pub fn view(&self) -> IntakeViewModel {
        self.state.view()
    }

    pub fn select_file(&mut self, candidate: UploadCandidate) {
        self.dispatch(Msg::FileSelected(candidate));
    }

    pub fn submit_question(&mut self, question: impl Into<String>) {
        self.dispatch(Msg::QuestionSubmitted(question.into()));
    }

    pub fn delete(&mut self) {
        self.dispatch(Msg::DeleteRequested);
    }

    pub fn dismiss(&mut self) {
        self.dispatch(Msg::Dismissed);
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let (mut next, effects) = update(std::mem::take(&mut self.state), msg);
        for lifecycle in next.drain_transitions() {
            intake_debug!("lifecycle -> {:?}", lifecycle);
            let _ = self.transitions.send(lifecycle);
        }
        self.state = next;
        self.runner.run(effects);
    }

    /// Wait for the next message from a running task and apply it.
    ///
    /// Returns the lifecycle afterwards, or `None` if nothing can arrive.
    pub async fn next_transition(&mut self) -> Option<&LifecycleState> {
        let msg = self.inbox.recv().await?;
        self.dispatch(msg);
        Some(self.state.lifecycle())
    }

    /// Process messages until nothing is running or awaiting a reply.
    pub async fn run_until_settled(&mut self) -> &IntakeState {
        while !self.state.is_settled() {
            match self.inbox.recv().await {
                Some(msg) => self.dispatch(msg),
                None => break,
            }
        }
        &self.state
    }
}
