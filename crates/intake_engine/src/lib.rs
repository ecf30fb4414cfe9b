//! Intake engine: HTTP transport, status polling and effect execution.
mod controller;
mod effects;
mod poller;
mod transport;
mod types;

pub use controller::LifecycleController;
pub use effects::{CredentialPrompt, EffectRunner, LogCredentialPrompt};
pub use poller::{ChannelPollSink, PollExit, PollSink, PollerHandle, StatusPoller};
pub use transport::{
    Credential, ReqwestTransport, Transport, TransportSettings, API_KEY_HEADER, DEFAULT_BASE_URL,
    DEFAULT_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW, MIN_CONTEXT_WINDOW,
};
pub use types::{TransportError, TransportFailure};
