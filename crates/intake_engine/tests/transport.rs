use std::time::Duration;

use bytes::Bytes;
use intake_core::{Failure, FailureKind, JobHandle, RequestPhase, UploadCandidate};
use intake_engine::{
    Credential, ReqwestTransport, Transport, TransportFailure, TransportSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer, key: Option<&str>) -> ReqwestTransport {
    let settings = TransportSettings {
        base_url: format!("{}/api", server.uri()),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..TransportSettings::default()
    };
    ReqwestTransport::new(settings, Credential::new(key.map(str::to_string))).expect("transport")
}

fn report_pdf() -> UploadCandidate {
    UploadCandidate::new("report.pdf", Bytes::from_static(b"%PDF-1.7 test body"))
}

#[tokio::test]
async fn upload_posts_multipart_pdf_and_returns_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"report.pdf\""))
        .and(body_string_contains("application/pdf"))
        .and(body_string_contains("%PDF-1.7 test body"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_id": "abc",
            "filename": "report.pdf",
            "status": "uploaded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = transport(&server, None)
        .upload(&report_pdf())
        .await
        .expect("upload ok");
    assert_eq!(handle, JobHandle::new("abc"));
}

#[tokio::test]
async fn api_key_header_is_sent_only_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let anonymous = transport(&server, None);
    anonymous.health().await.expect("health ok");

    anonymous.credential().set(Some("k-123".into()));
    let health = anonymous.health().await.expect("health ok");
    assert_eq!(health["status"], "healthy");

    let requests = server.received_requests().await.expect("recording on");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("x-api-key").is_none());
    assert_eq!(
        requests[1]
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok()),
        Some("k-123")
    );
}

#[tokio::test]
async fn status_report_is_decoded_with_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/status/abc"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_id": "abc",
            "status": "processing: extracting text (10%)"
        })))
        .mount(&server)
        .await;

    let report = transport(&server, Some("secret"))
        .check_status(&JobHandle::new("abc"))
        .await
        .expect("status ok");
    assert_eq!(report.status, "processing: extracting text (10%)");
    assert_eq!(report.metadata, None);
    assert_eq!(report.error, None);
}

#[tokio::test]
async fn error_detail_is_carried_into_classification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Only PDF files are allowed"})),
        )
        .mount(&server)
        .await;

    let err = transport(&server, None)
        .upload(&report_pdf())
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::HttpStatus(400));
    assert_eq!(err.message, "Only PDF files are allowed");

    let failure = err.classify(RequestPhase::Upload);
    assert_eq!(failure.kind, FailureKind::ServerError);
    assert_eq!(failure.message, "Only PDF files are allowed");
}

#[tokio::test]
async fn bare_bad_request_falls_back_to_generic_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/status/abc"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = transport(&server, None)
        .check_status(&JobHandle::new("abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::HttpStatus(400));
    assert_eq!(
        err.classify(RequestPhase::StatusCheck),
        Failure::of(FailureKind::ServerError)
    );
}

#[tokio::test]
async fn unexplained_upload_rejection_uses_default_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(ResponseTemplate::new(422).set_body_string("not json"))
        .mount(&server)
        .await;

    let failure = transport(&server, None)
        .upload(&report_pdf())
        .await
        .unwrap_err()
        .classify(RequestPhase::Upload);
    assert_eq!(failure, Failure::of(FailureKind::UploadFailed));
}

#[tokio::test]
async fn corrupted_source_is_recognised_from_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Invalid or corrupted PDF file"})),
        )
        .mount(&server)
        .await;

    let failure = transport(&server, None)
        .upload(&report_pdf())
        .await
        .unwrap_err()
        .classify(RequestPhase::Upload);
    assert_eq!(failure.kind, FailureKind::CorruptedSource);
}

#[tokio::test]
async fn payload_too_large_maps_to_file_too_large() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/upload"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let err = transport(&server, None)
        .upload(&report_pdf())
        .await
        .unwrap_err();
    assert_eq!(err.message, "");
    assert_eq!(
        err.classify(RequestPhase::Upload).kind,
        FailureKind::FileTooLarge
    );
}

#[tokio::test]
async fn unauthorized_requests_ask_for_a_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/status/abc"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid API key"})))
        .mount(&server)
        .await;

    let err = transport(&server, Some("wrong"))
        .check_status(&JobHandle::new("abc"))
        .await
        .unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(
        err.classify(RequestPhase::StatusCheck).kind,
        FailureKind::CredentialRequired
    );
}

#[tokio::test]
async fn delete_accepts_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server, None)
        .delete(&JobHandle::new("abc"))
        .await
        .expect("delete ok");
}

#[tokio::test]
async fn ask_sends_question_with_context_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/queries/ask"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "question": "What is the total?",
            "document_id": "abc",
            "context_window": 4096
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "42",
            "context": ["The total is 42."],
            "confidence": 0.87,
            "metadata": {"model": "llama", "chunks_used": 1, "total_tokens": 128}
        })))
        .mount(&server)
        .await;

    let answer = transport(&server, None)
        .ask(&JobHandle::new("abc"), "What is the total?")
        .await
        .expect("ask ok");
    assert_eq!(answer.answer, "42");
    assert_eq!(answer.context, vec!["The total is 42.".to_string()]);
    assert_eq!(answer.metadata.chunks_used, Some(1));
    assert_eq!(answer.metadata.device, None);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = transport(&server, None)
        .check_status(&JobHandle::new("abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::Decode);
    assert!(err.is_transient());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let server = MockServer::start().await;
    let unreachable = transport(&server, None);
    drop(server);

    let err = unreachable
        .check_status(&JobHandle::new("abc"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        TransportFailure::Network | TransportFailure::Timeout
    ));
    assert_eq!(
        err.classify(RequestPhase::Upload).kind,
        FailureKind::NetworkError
    );
}
