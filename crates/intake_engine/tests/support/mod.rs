#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use intake_core::{AnswerReport, JobHandle, PollEvent, StatusReport, UploadCandidate};
use intake_engine::{PollSink, Transport, TransportError, TransportFailure};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(intake_logging::initialize_for_tests);
}

/// In-memory service that replays canned replies and records every call.
pub struct ScriptedTransport {
    uploads: Mutex<VecDeque<Result<JobHandle, TransportError>>>,
    statuses: Mutex<VecDeque<Result<StatusReport, TransportError>>>,
    fallback_status: Result<StatusReport, TransportError>,
    delete_result: Result<(), TransportError>,
    ask_result: Result<AnswerReport, TransportError>,
    check_latency: Duration,
    calls: Mutex<Calls>,
}

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub uploads: Vec<String>,
    pub status_checks: Vec<String>,
    pub deletes: Vec<String>,
    pub questions: Vec<String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: Ok(StatusReport::new("processing")),
            delete_result: Ok(()),
            ask_result: Ok(AnswerReport::default()),
            check_latency: Duration::ZERO,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_uploads<I>(self, handles: I) -> Self
    where
        I: IntoIterator<Item = Result<JobHandle, TransportError>>,
    {
        self.uploads.lock().unwrap().extend(handles);
        self
    }

    pub fn with_statuses<'a, I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.statuses
            .lock()
            .unwrap()
            .extend(statuses.into_iter().map(|s| Ok(StatusReport::new(s))));
        self
    }

    pub fn with_status_result(self, result: Result<StatusReport, TransportError>) -> Self {
        self.statuses.lock().unwrap().push_back(result);
        self
    }

    /// Reply used once the scripted statuses run out.
    pub fn with_fallback_status(mut self, result: Result<StatusReport, TransportError>) -> Self {
        self.fallback_status = result;
        self
    }

    pub fn with_check_latency(mut self, latency: Duration) -> Self {
        self.check_latency = latency;
        self
    }

    pub fn with_delete_result(mut self, result: Result<(), TransportError>) -> Self {
        self.delete_result = result;
        self
    }

    pub fn with_ask_result(mut self, result: Result<AnswerReport, TransportError>) -> Self {
        self.ask_result = result;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn upload(&self, candidate: &UploadCandidate) -> Result<JobHandle, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .uploads
            .push(candidate.name().to_string());
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobHandle::new("abc")))
    }

    async fn check_status(&self, handle: &JobHandle) -> Result<StatusReport, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .status_checks
            .push(handle.document_id.clone());
        if !self.check_latency.is_zero() {
            tokio::time::sleep(self.check_latency).await;
        }
        let scripted = self.statuses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback_status.clone())
    }

    async fn delete(&self, handle: &JobHandle) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .deletes
            .push(handle.document_id.clone());
        self.delete_result.clone()
    }

    async fn ask(&self, _handle: &JobHandle, question: &str) -> Result<AnswerReport, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .questions
            .push(question.to_string());
        self.ask_result.clone()
    }

    async fn health(&self) -> Result<serde_json::Value, TransportError> {
        Ok(serde_json::json!({"status": "healthy"}))
    }
}

pub fn network_error() -> TransportError {
    TransportError::new(TransportFailure::Network, "connection refused")
}

pub fn http_error(code: u16, message: &str) -> TransportError {
    TransportError::new(TransportFailure::HttpStatus(code), message)
}

/// Collects poll events for inspection.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<PollEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PollEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PollSink for RecordingSink {
    fn emit(&self, event: PollEvent) {
        self.events.lock().unwrap().push(event);
    }
}
