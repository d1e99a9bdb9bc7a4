//! Sign-and-record iterations against the mock stack.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tas_perf::sign::checks;
use tas_perf::{
    EntrySink, ErrorReporter, IterationOutcome, IterationTrace, LoadRunner, RunCredential,
    SignContext, SignEndpoints, TasClient, TestConfig, Workflow,
};
use tas_protocol::{Component, FailureClass};
use test_utils::{
    crypto_bundle_json, crypto_bundle_without_signature, MockResponse, MockStack, Route,
    ENTRY_UUID, LEAF_CERT_PEM, TIMESTAMP_TOKEN,
};
use tokio::sync::mpsc::UnboundedReceiver;

fn sign_context(stack: &MockStack, entry_sink: Option<EntrySink>) -> SignContext {
    let client = TasClient::new(Duration::from_secs(5), 4).unwrap();
    let base = stack.base_url();
    SignContext {
        reporter: ErrorReporter::new(client.inner().clone(), &base),
        client,
        credential: RunCredential::new("tok1"),
        endpoints: SignEndpoints {
            fulcio_url: base.clone(),
            rekor_url: base.clone(),
            helper_url: base,
        },
        entry_sink,
    }
}

fn data_gen_context(stack: &MockStack) -> (SignContext, UnboundedReceiver<String>) {
    let (sink, rx) = EntrySink::channel();
    (sign_context(stack, Some(sink)), rx)
}

#[tokio::test]
async fn test_iteration_runs_every_step_in_order() {
    let stack = MockStack::start().await;
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let outcome = ctx.run_iteration(&mut trace).await.unwrap();
    assert_eq!(outcome.entry_uuid, None);
    assert!(trace.all_checks_passed());

    assert_eq!(
        stack.route_sequence(),
        vec![
            Some(Route::GeneratePayloads),
            Some(Route::SigningCert),
            Some(Route::CreateEntry),
            Some(Route::GetTimestamp),
            Some(Route::CreateEntry),
        ]
    );
    assert_eq!(
        trace.request_names(),
        vec![
            "Helper_GetCrypto",
            "Fulcio_RequestCert",
            "Rekor_CreateHashedRekord",
            "Helper_GetTimestamp",
            "Rekor_CreateRfc3161",
        ]
    );
    assert_eq!(stack.count(Route::ReportError), 0);
}

#[tokio::test]
async fn test_certificate_request_carries_bearer_and_bundle() {
    let stack = MockStack::start().await;
    let ctx = sign_context(&stack, None);
    ctx.run_iteration(&mut IterationTrace::new()).await.unwrap();

    let bundle = crypto_bundle_json();
    let request = &stack.requests_to(Route::SigningCert)[0];
    assert_eq!(request.header("authorization"), Some("Bearer tok1"));

    let body = request.json();
    assert_eq!(body["publicKey"]["content"], bundle["publicKeyBase64"]);
    assert_eq!(body["signedEmailAddress"], bundle["signedEmailAddress"]);
}

#[tokio::test]
async fn test_hash_record_embeds_extracted_certificate() {
    let stack = MockStack::start().await;
    let ctx = sign_context(&stack, None);
    ctx.run_iteration(&mut IterationTrace::new()).await.unwrap();

    let bundle = crypto_bundle_json();
    let entries = stack.requests_to(Route::CreateEntry);
    let hashed = entries[0].json();
    assert_eq!(hashed["kind"], "hashedrekord");
    assert_eq!(hashed["apiVersion"], "0.0.1");
    assert_eq!(hashed["spec"]["signature"]["content"], bundle["artifactSignature"]);
    assert_eq!(hashed["spec"]["data"]["hash"]["algorithm"], "sha256");
    assert_eq!(hashed["spec"]["data"]["hash"]["value"], bundle["artifactHash"]);

    let encoded = hashed["spec"]["signature"]["publicKey"]["content"]
        .as_str()
        .unwrap();
    let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
    assert_eq!(decoded, LEAF_CERT_PEM);
}

#[tokio::test]
async fn test_timestamp_flow_uses_raw_signature() {
    let stack = MockStack::start().await;
    let ctx = sign_context(&stack, None);
    ctx.run_iteration(&mut IterationTrace::new()).await.unwrap();

    let timestamp = &stack.requests_to(Route::GetTimestamp)[0];
    assert_eq!(
        timestamp.header("content-type"),
        Some("application/octet-stream")
    );
    assert_eq!(timestamp.body.as_ref(), &[0xde_u8, 0xad, 0xbe, 0xef][..]);

    let rfc3161 = stack.requests_to(Route::CreateEntry)[1].json();
    assert_eq!(rfc3161["kind"], "rfc3161");
    assert_eq!(rfc3161["apiVersion"], "0.0.1");
    assert_eq!(
        rfc3161["spec"]["tsr"]["content"],
        STANDARD.encode(TIMESTAMP_TOKEN)
    );
}

#[tokio::test]
async fn test_data_generation_emits_location_identifier() {
    let stack = MockStack::start().await;
    let (ctx, mut rx) = data_gen_context(&stack);

    let outcome = ctx.run_iteration(&mut IterationTrace::new()).await.unwrap();
    assert_eq!(outcome.entry_uuid.as_deref(), Some(ENTRY_UUID));
    assert_eq!(rx.try_recv().unwrap(), "abc-123");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_location_emits_nothing() {
    let stack = MockStack::start().await;
    stack.respond(Route::CreateEntry, MockResponse::status(201));
    let (ctx, mut rx) = data_gen_context(&stack);

    let outcome = ctx.run_iteration(&mut IterationTrace::new()).await.unwrap();
    assert_eq!(outcome.entry_uuid, None);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_signature_stops_before_timestamp() {
    let stack = MockStack::start().await;
    stack.respond(
        Route::GeneratePayloads,
        MockResponse::json(200, &crypto_bundle_without_signature()),
    );
    let ctx = sign_context(&stack, None);

    let err = ctx.run_iteration(&mut IterationTrace::new()).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::PrerequisiteMissing);

    assert_eq!(stack.count(Route::GetTimestamp), 0);
    assert_eq!(stack.count(Route::CreateEntry), 1);
    assert_eq!(stack.count(Route::ReportError), 0);
}

#[tokio::test]
async fn test_fulcio_failure_is_reported_without_delay() {
    let stack = MockStack::start().await;
    stack.respond(Route::SigningCert, MockResponse::text(500, "boom"));
    stack.respond(
        Route::ReportError,
        MockResponse::status(200).with_delay(Duration::from_secs(3)),
    );
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let started = Instant::now();
    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(err.class(), FailureClass::ServiceAssertion);
    assert_eq!(err.component(), Some(Component::Fulcio));
    assert_eq!(trace.check_outcome(checks::FULCIO_CREATED), Some(false));
    assert_eq!(stack.count(Route::CreateEntry), 0);

    assert!(
        stack
            .wait_for(Route::ReportError, 1, Duration::from_secs(2))
            .await
    );
    let report = &stack.requests_to(Route::ReportError)[0];
    assert_eq!(report.query_param("component").as_deref(), Some("fulcio"));
}

#[tokio::test]
async fn test_missing_pem_is_a_fulcio_failure() {
    let stack = MockStack::start().await;
    stack.respond(
        Route::SigningCert,
        MockResponse::text(201, "issued, but no certificate here"),
    );
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert_eq!(err.component(), Some(Component::Fulcio));
    assert_eq!(trace.check_outcome(checks::FULCIO_CREATED), Some(true));
    assert_eq!(trace.check_outcome(checks::FULCIO_CERTIFICATE), Some(false));
    assert_eq!(stack.count(Route::CreateEntry), 0);

    assert!(
        stack
            .wait_for(Route::ReportError, 1, Duration::from_secs(2))
            .await
    );
    let report = &stack.requests_to(Route::ReportError)[0];
    assert_eq!(report.query_param("component").as_deref(), Some("fulcio"));
}

#[tokio::test]
async fn test_rekor_failure_is_reported() {
    let stack = MockStack::start().await;
    stack.respond(Route::CreateEntry, MockResponse::text(400, "bad entry"));
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::ServiceAssertion);
    assert_eq!(err.component(), Some(Component::Rekor));
    assert!(err.to_string().contains("Rekor (hashedrekord) request failed"));
    assert_eq!(
        trace.check_outcome(checks::REKOR_HASHEDREKORD_CREATED),
        Some(false)
    );
    assert_eq!(stack.count(Route::GetTimestamp), 0);

    assert!(
        stack
            .wait_for(Route::ReportError, 1, Duration::from_secs(2))
            .await
    );
    let report = &stack.requests_to(Route::ReportError)[0];
    assert_eq!(report.query_param("component").as_deref(), Some("rekor"));
}

#[tokio::test]
async fn test_timestamp_record_failure_is_reported() {
    let stack = MockStack::start().await;
    stack.respond_once(
        Route::CreateEntry,
        MockResponse::status(201).with_header("location", "/api/v1/log/entries/abc-123"),
    );
    stack.respond(Route::CreateEntry, MockResponse::text(500, "log full"));
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::ServiceAssertion);
    assert_eq!(err.component(), Some(Component::Rekor));
    assert!(err.to_string().contains("Rekor (rfc3161) request failed"));
    assert_eq!(
        trace.check_outcome(checks::REKOR_HASHEDREKORD_CREATED),
        Some(true)
    );
    assert_eq!(trace.check_outcome(checks::TSA_HELPER_OK), Some(true));
    assert_eq!(
        trace.check_outcome(checks::REKOR_RFC3161_CREATED),
        Some(false)
    );
    assert_eq!(stack.count(Route::CreateEntry), 2);

    assert!(
        stack
            .wait_for(Route::ReportError, 1, Duration::from_secs(2))
            .await
    );
    let reports = stack.requests_to(Route::ReportError);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].query_param("component").as_deref(), Some("rekor"));
}

#[tokio::test]
async fn test_unreachable_fulcio_is_reported() {
    let stack = MockStack::start().await;
    let mut ctx = sign_context(&stack, None);
    // Nothing listens on port 9 of the loopback interface.
    ctx.endpoints.fulcio_url = "http://127.0.0.1:9".to_string();
    let mut trace = IterationTrace::new();

    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::ServiceAssertion);
    assert_eq!(err.component(), Some(Component::Fulcio));
    assert_eq!(trace.check_outcome(checks::FULCIO_CREATED), Some(false));
    assert_eq!(trace.check_outcome(checks::FULCIO_CERTIFICATE), None);
    assert_eq!(stack.count(Route::CreateEntry), 0);

    assert!(
        stack
            .wait_for(Route::ReportError, 1, Duration::from_secs(2))
            .await
    );
    let report = &stack.requests_to(Route::ReportError)[0];
    assert_eq!(report.query_param("component").as_deref(), Some("fulcio"));
}

#[tokio::test]
async fn test_helper_failures_are_not_reported() {
    let stack = MockStack::start().await;
    stack.respond(Route::GeneratePayloads, MockResponse::text(503, "warming up"));
    let ctx = sign_context(&stack, None);

    let err = ctx.run_iteration(&mut IterationTrace::new()).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::PrerequisiteMissing);
    assert_eq!(stack.route_sequence(), vec![Some(Route::GeneratePayloads)]);

    let stack = MockStack::start().await;
    stack.respond(Route::GetTimestamp, MockResponse::text(500, "tsa down"));
    let ctx = sign_context(&stack, None);
    let mut trace = IterationTrace::new();

    let err = ctx.run_iteration(&mut trace).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::PrerequisiteMissing);
    assert_eq!(trace.check_outcome(checks::TSA_HELPER_OK), Some(false));
    assert_eq!(stack.count(Route::CreateEntry), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stack.count(Route::ReportError), 0);
}

#[tokio::test]
async fn test_workflow_outcome_classifies_failures() {
    let stack = MockStack::start().await;
    let ctx = sign_context(&stack, None);
    let outcome = ctx.iterate(0, &mut IterationTrace::new()).await;
    assert_eq!(outcome, IterationOutcome::Passed);

    stack.respond(Route::GeneratePayloads, MockResponse::status(500));
    let outcome = ctx.iterate(1, &mut IterationTrace::new()).await;
    assert_eq!(
        outcome,
        IterationOutcome::Failed(FailureClass::PrerequisiteMissing)
    );
}

#[tokio::test]
async fn test_runner_shares_one_credential_across_iterations() {
    let stack = MockStack::start().await;
    let (sink, rx) = EntrySink::channel();
    let ctx = sign_context(&stack, Some(sink));
    let collector = tokio::spawn(tas_perf::collect_entries(rx, None));

    let runner = LoadRunner::new(TestConfig {
        name: "sign-smoke".to_string(),
        vus: 3,
        iterations: Some(6),
        ..TestConfig::default()
    });
    let results = runner.run(Arc::new(ctx)).await.unwrap();

    assert_eq!(results.total_iterations, 6);
    assert_eq!(results.passed_iterations, 6);
    assert_eq!(results.workflow, "sign");
    assert_eq!(collector.await.unwrap().unwrap(), 6);

    let certs = stack.requests_to(Route::SigningCert);
    assert_eq!(certs.len(), 6);
    assert!(certs
        .iter()
        .all(|r| r.header("authorization") == Some("Bearer tok1")));
    assert_eq!(stack.count(Route::Token), 0);
}
