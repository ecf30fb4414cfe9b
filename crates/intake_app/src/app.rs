use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use bytes::Bytes;
use chrono::Utc;
use intake_core::{
    interpret_status, prepare_question, validate_candidate, AnswerReport, IntakeViewModel,
    JobHandle, LifecycleState, RequestPhase, StatusOutcome, StatusReport, UploadCandidate,
};
use intake_engine::{
    Credential, CredentialPrompt, LifecycleController, ReqwestTransport, Transport,
};
use intake_logging::{intake_debug, intake_info, intake_warn};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cli::{Cli, Command, UploadArgs};
use crate::config::IntakeConfig;
use crate::logging;

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let loaded = IntakeConfig::load(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_overrides(cli.base_url, cli.api_key);
    logging::initialize(config.log_destination, config.log_level);
    if from_file {
        intake_info!("Loaded config from {:?}", cli.config);
    } else {
        intake_debug!("No config at {:?}; using defaults", cli.config);
    }
    intake_info!("intake starting with {:?}", config);

    let credential = Credential::new(config.api_key.clone());
    let transport = Arc::new(
        ReqwestTransport::new(config.transport_settings(), credential)
            .context("invalid service settings")?,
    );

    match cli.command {
        Command::Upload(args) => upload(transport, args).await,
        Command::Status { document_id } => status(transport.as_ref(), document_id).await,
        Command::Delete { document_id } => {
            transport
                .delete(&JobHandle::new(document_id.as_str()))
                .await
                .map_err(|err| err.classify(RequestPhase::Delete))?;
            println!("Deleted {document_id}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask {
            document_id,
            question,
        } => {
            let Some(question) = prepare_question(&question) else {
                bail!("question is empty");
            };
            let handle = JobHandle::new(document_id);
            let report = transport
                .check_status(&handle)
                .await
                .map_err(|err| err.classify(RequestPhase::StatusCheck))?;
            ensure_answerable(&report)?;
            let answer = transport
                .ask(&handle, &question)
                .await
                .map_err(|err| err.classify(RequestPhase::Ask))?;
            print_answer(&answer);
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let snapshot = transport
                .health()
                .await
                .map_err(|err| err.classify(RequestPhase::Health))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

struct TerminalCredentialPrompt;

impl CredentialPrompt for TerminalCredentialPrompt {
    fn credential_required(&self) {
        eprintln!("The service requires an API key: pass --api-key, set INTAKE_API_KEY, or add api_key to intake.ron.");
    }
}

/// Final report printed with `--json`.
#[derive(Serialize)]
struct UploadSummary<'a> {
    file: &'a str,
    document_id: Option<&'a str>,
    outcome: &'a LifecycleState,
    poll_attempts: u32,
    answer: Option<&'a AnswerReport>,
    deleted: bool,
    notice: Option<&'a str>,
    finished_at: String,
}

async fn upload(transport: Arc<ReqwestTransport>, args: UploadArgs) -> anyhow::Result<ExitCode> {
    let candidate = read_candidate(&args.path).await?;
    let name = candidate.name().to_string();

    let transport: Arc<dyn Transport> = transport;
    let mut controller = LifecycleController::new(transport)
        .with_credential_prompt(Arc::new(TerminalCredentialPrompt));
    let mut transitions = controller.subscribe();

    controller.select_file(candidate);
    report_transitions(&mut transitions, args.json);
    while !controller.state().is_settled() {
        if controller.next_transition().await.is_none() {
            break;
        }
        report_transitions(&mut transitions, args.json);
    }

    let processed = controller.view();
    let succeeded = matches!(processed.lifecycle, LifecycleState::Completed { .. });

    let mut answered = None;
    if let Some(question) = args.ask.as_deref().filter(|_| succeeded) {
        controller.submit_question(question);
        controller.run_until_settled().await;
        answered = controller.state().answer().cloned();
        if let (Some(answer), false) = (&answered, args.json) {
            print_answer(answer);
        }
    }

    let mut deleted = false;
    if args.delete_after && controller.view().can_delete {
        controller.delete();
        controller.run_until_settled().await;
        deleted = controller.lifecycle() == &LifecycleState::Idle;
        if deleted && !args.json {
            println!("Deleted {}", processed.document_id.as_deref().unwrap_or_default());
        }
    }
    report_transitions(&mut transitions, args.json);

    let notice = controller.view().notice;
    if let Some(notice) = notice.as_deref().filter(|_| !args.json) {
        eprintln!("Note: {notice}");
    }

    if args.json {
        let summary = UploadSummary {
            file: &name,
            document_id: processed.document_id.as_deref(),
            outcome: &processed.lifecycle,
            poll_attempts: processed.poll_attempts,
            answer: answered.as_ref(),
            deleted,
            notice: notice.as_deref(),
            finished_at: Utc::now().to_rfc3339(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_outcome(&processed);
    }

    Ok(exit_code(&processed.lifecycle))
}

/// Rejected files are returned without their content so the controller
/// reports the failure; only accepted files are read.
async fn read_candidate(path: &Path) -> anyhow::Result<UploadCandidate> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    let length = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?
        .len();

    let header = UploadCandidate::with_declared_size(name.as_str(), Bytes::new(), length);
    if validate_candidate(&header).is_err() {
        return Ok(header);
    }

    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(UploadCandidate::new(name, Bytes::from(content)))
}

fn report_transitions(transitions: &mut broadcast::Receiver<LifecycleState>, quiet: bool) {
    loop {
        match transitions.try_recv() {
            Ok(state) if !quiet => println!("{}", describe(&state)),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                intake_warn!("skipped {} lifecycle updates", skipped);
            }
            Err(_) => break,
        }
    }
}

fn describe(state: &LifecycleState) -> String {
    match state {
        LifecycleState::Idle => "Idle".to_string(),
        LifecycleState::Validating => "Validating...".to_string(),
        LifecycleState::Uploading => "Uploading...".to_string(),
        LifecycleState::Polling { progress } => format!("Processing... {progress}"),
        LifecycleState::Completed { .. } => "Processing complete".to_string(),
        LifecycleState::Failed { failure } => format!("Failed: {failure}"),
        LifecycleState::TimedOut => "Processing timed out".to_string(),
    }
}

fn print_outcome(view: &IntakeViewModel) {
    if let (Some(id), LifecycleState::Completed { metadata }) =
        (view.document_id.as_deref(), &view.lifecycle)
    {
        println!("Document id: {id}");
        for (key, value) in metadata {
            println!("  {key}: {value}");
        }
    }
}

fn print_answer(answer: &AnswerReport) {
    println!("{}", answer.answer);
    println!("(confidence {:.0}%)", answer.confidence * 100.0);
    if let Some(model) = answer.metadata.model.as_deref() {
        println!("(model {model})");
    }
}

async fn status(transport: &dyn Transport, document_id: String) -> anyhow::Result<ExitCode> {
    let report = transport
        .check_status(&JobHandle::new(document_id))
        .await
        .map_err(|err| err.classify(RequestPhase::StatusCheck))?;
    match interpret_status(&report) {
        StatusOutcome::Completed(_) => {
            println!("completed");
            Ok(ExitCode::SUCCESS)
        }
        StatusOutcome::Pending(Some(progress)) => {
            println!("{} ({progress})", report.status);
            Ok(ExitCode::SUCCESS)
        }
        StatusOutcome::Pending(None) => {
            println!("{}", report.status);
            Ok(ExitCode::SUCCESS)
        }
        StatusOutcome::Failed(failure) => {
            println!("Failed: {failure}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Questions are only sent about documents whose processing completed.
fn ensure_answerable(report: &StatusReport) -> anyhow::Result<()> {
    match interpret_status(report) {
        StatusOutcome::Completed(_) => Ok(()),
        StatusOutcome::Failed(failure) => bail!("document cannot be queried: {failure}"),
        StatusOutcome::Pending(_) => bail!("document is not ready yet ({})", report.status),
    }
}

fn exit_code(lifecycle: &LifecycleState) -> ExitCode {
    match lifecycle {
        LifecycleState::Failed { .. } | LifecycleState::TimedOut => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
