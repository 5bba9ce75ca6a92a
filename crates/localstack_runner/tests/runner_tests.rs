//! Integration tests for the LocalStack runner.
//!
//! These tests drive the full lifecycle against the in-memory fake engine
//! so they run without Docker.

use std::sync::Arc;
use std::time::Duration;

use localstack_runner::{
    CancellationToken, EngineClient, EngineOp, FakeEngine, Runner, RunnerConfig, RunnerError,
};

async fn runner_for(engine: &FakeEngine) -> Runner {
    let client: Arc<dyn EngineClient> = Arc::new(engine.clone());
    Runner::new(Some(client)).await.unwrap()
}

/// Test the happy path: pull, create, start, in that order.
#[tokio::test]
async fn test_start_returns_container_id() {
    let engine = FakeEngine::new().pull_output(vec![
        b"{\"status\":\"Pulling from localstack/localstack\"}\n".to_vec(),
        b"{\"status\":\"Status: Image is up to date\"}\n".to_vec(),
    ]);
    let runner = runner_for(&engine).await;

    let mut progress = Vec::new();
    let id = runner
        .start_with_sink(&CancellationToken::new(), &mut progress)
        .await
        .unwrap();

    assert!(id.len() >= 12);
    assert_eq!(
        engine.ops(),
        vec![
            EngineOp::PullImage,
            EngineOp::CreateContainer,
            EngineOp::StartContainer
        ]
    );

    let calls = engine.get_calls();
    assert_eq!(calls[0].target, "docker.io/localstack/localstack:latest");
    assert_eq!(calls[1].target, "localstack/localstack");
    assert_eq!(calls[2].target, id);

    let output = String::from_utf8(progress).unwrap();
    assert!(output.contains("Pulling from localstack/localstack"));
    assert!(output.ends_with("Image is up to date\"}\n"));
    assert_eq!(engine.open_streams(), 0);
}

/// Test the create request carries the fixed port mapping and policies.
#[tokio::test]
async fn test_create_request_shape() {
    let engine = FakeEngine::new();
    let runner = runner_for(&engine).await;

    runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap();

    let specs = engine.created_specs();
    assert_eq!(specs.len(), 1);
    let spec = &specs[0];
    assert!(spec.tty);
    assert!(spec.open_stdin);
    assert!(spec.auto_remove);
    assert_eq!(spec.port_bindings.len(), 1);

    let bindings = &spec.port_bindings["4566/tcp"];
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].host_ip, "127.0.0.1");
    assert_eq!(bindings[0].host_port, "4566");
}

/// Test overridden settings flow into pull and create.
#[tokio::test]
async fn test_custom_config() {
    let engine = FakeEngine::new();
    let client: Arc<dyn EngineClient> = Arc::new(engine.clone());
    let config = RunnerConfig::new()
        .image_url("registry.internal/localstack/localstack:3.8")
        .image("localstack/localstack:3.8")
        .host_port(14566);
    let runner = Runner::with_config(Some(client), config).await.unwrap();

    runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(runner.endpoint_url(), "http://127.0.0.1:14566");
    let calls = engine.get_calls();
    assert_eq!(calls[0].target, "registry.internal/localstack/localstack:3.8");
    assert_eq!(calls[1].target, "localstack/localstack:3.8");
    assert_eq!(
        engine.created_specs()[0].port_bindings["4566/tcp"][0].host_port,
        "14566"
    );
}

/// Test the port-already-bound scenario: create fails, start never runs.
#[tokio::test]
async fn test_port_conflict_stops_before_start() {
    let engine = FakeEngine::new().fail_on(
        EngineOp::CreateContainer,
        "Bind for 127.0.0.1:4566 failed: port is already allocated",
    );
    let runner = runner_for(&engine).await;

    let err = runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::ContainerCreate { .. }));
    assert!(err.to_string().contains("port is already allocated"));
    assert!(!engine.was_called(EngineOp::StartContainer));
}

/// Test a failed start leaves the created container behind.
#[tokio::test]
async fn test_start_failure_is_not_rolled_back() {
    let engine = FakeEngine::new().fail_on(EngineOp::StartContainer, "driver failed");
    let runner = runner_for(&engine).await;

    let err = runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap_err();

    let RunnerError::ContainerStart { container_id, .. } = err else {
        panic!("expected ContainerStart error");
    };
    assert_eq!(engine.containers(), vec![container_id.clone()]);
    assert!(!engine.was_called(EngineOp::RemoveContainer));

    // Cleanup is the caller's job.
    runner.remove_container(&container_id).await.unwrap();
    assert!(engine.containers().is_empty());
}

/// Test a broken pull stream is reported and the stream released.
#[tokio::test]
async fn test_pull_stream_error_releases_stream() {
    let engine = FakeEngine::new()
        .pull_output(vec![b"{\"status\":\"Downloading\"}\n".to_vec()])
        .pull_read_error("unexpected EOF");
    let runner = runner_for(&engine).await;

    let mut progress = Vec::new();
    let err = runner
        .start_with_sink(&CancellationToken::new(), &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::IoStream { what: "pull", .. }));
    assert_eq!(progress, b"{\"status\":\"Downloading\"}\n".to_vec());
    assert_eq!(engine.open_streams(), 0);
    assert!(!engine.was_called(EngineOp::CreateContainer));
}

/// Test a rejected pull request.
#[tokio::test]
async fn test_pull_request_error() {
    let engine = FakeEngine::new().fail_on(EngineOp::PullImage, "pull access denied");
    let runner = runner_for(&engine).await;

    let err = runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ImagePull { .. }));
    assert_eq!(engine.ops(), vec![EngineOp::PullImage]);
}

/// Test an already-cancelled token short-circuits before the engine.
#[tokio::test]
async fn test_cancelled_before_start() {
    let engine = FakeEngine::new();
    let runner = runner_for(&engine).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = runner.start_with_sink(&cancel, &mut Vec::new()).await.unwrap_err();

    assert!(err.is_interrupted());
    assert!(engine.get_calls().is_empty());
}

/// Test the two-minute ceiling applies even when the caller would wait longer.
#[tokio::test(start_paused = true)]
async fn test_deadline_independent_of_caller() {
    let engine = FakeEngine::new()
        .pull_output(vec![b"layer\n".to_vec()])
        .pull_delay(Duration::from_secs(300));
    let runner = runner_for(&engine).await;

    let cancel = CancellationToken::new();
    let caller_deadline = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(600)).await;
        caller_deadline.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = runner.start_with_sink(&cancel, &mut Vec::new()).await.unwrap_err();

    assert!(matches!(err, RunnerError::DeadlineExceeded { operation: "start", .. }));
    assert_eq!(started.elapsed().as_secs(), 120);
    assert!(!cancel.is_cancelled());
    assert_eq!(engine.open_streams(), 0);
    assert!(!engine.was_called(EngineOp::CreateContainer));
}

/// Test caller cancellation mid-pull aborts the start.
#[tokio::test(start_paused = true)]
async fn test_cancel_during_pull() {
    let engine = FakeEngine::new()
        .pull_output(vec![b"layer\n".to_vec()])
        .pull_delay(Duration::from_secs(60));
    let runner = runner_for(&engine).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = runner.start_with_sink(&cancel, &mut Vec::new()).await.unwrap_err();

    assert!(matches!(err, RunnerError::Cancelled { operation: "start" }));
    assert_eq!(started.elapsed().as_secs(), 5);
    assert_eq!(engine.open_streams(), 0);
}

/// Test log streaming copies output until the engine closes the stream.
#[tokio::test]
async fn test_stream_logs_until_closed() {
    let engine = FakeEngine::new().log_output(vec![
        b"LocalStack version: 3.8.0\n".to_vec(),
        b"Ready.\n".to_vec(),
    ]);
    let runner = runner_for(&engine).await;

    let mut sink = Vec::new();
    runner
        .stream_logs_to(&CancellationToken::new(), "abc123def456", &mut sink)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(sink).unwrap(), "LocalStack version: 3.8.0\nReady.\n");
    assert_eq!(engine.get_calls()[0].target, "abc123def456");
    assert_eq!(engine.open_streams(), 0);
}

/// Test log streaming returns promptly once cancelled, even on an idle stream.
#[tokio::test]
async fn test_stream_logs_stops_on_cancel() {
    let engine = FakeEngine::new()
        .log_output(vec![b"Ready.\n".to_vec()])
        .logs_stay_open();
    let runner = runner_for(&engine).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut sink = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        runner.stream_logs_to(&cancel, "abc123def456", &mut sink),
    )
    .await
    .expect("stream_logs did not return after cancellation");

    assert!(matches!(result, Err(RunnerError::Cancelled { .. })));
    assert_eq!(sink, b"Ready.\n".to_vec());
    assert_eq!(engine.open_streams(), 0);
}

/// Test log read failures propagate as stream errors.
#[tokio::test]
async fn test_stream_logs_read_error() {
    let engine = FakeEngine::new()
        .log_output(vec![b"partial".to_vec()])
        .log_read_error("connection reset by peer");
    let runner = runner_for(&engine).await;

    let err = runner
        .stream_logs_to(&CancellationToken::new(), "abc123def456", &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::IoStream { what: "log", .. }));
    assert_eq!(engine.open_streams(), 0);
}

/// Test a rejected log request.
#[tokio::test]
async fn test_stream_logs_rejected() {
    let engine = FakeEngine::new().fail_on(EngineOp::ContainerLogs, "No such container");
    let runner = runner_for(&engine).await;

    let err = runner
        .stream_logs_to(&CancellationToken::new(), "missing", &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::LogStream { .. }));
}

/// Test full fixture cycle: start, then remove container and image.
#[tokio::test]
async fn test_fixture_teardown() {
    let engine = FakeEngine::new();
    let runner = runner_for(&engine).await;

    let id = runner
        .start_with_sink(&CancellationToken::new(), &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(engine.images().len(), 1);

    runner.remove_container(&id).await.unwrap();
    runner.remove_image().await.unwrap();

    assert!(engine.containers().is_empty());
    assert!(engine.images().is_empty());

    let err = runner.remove_container(&id).await.unwrap_err();
    assert!(matches!(err, RunnerError::ContainerRemove { .. }));
}

/// Test several runners can share one client.
#[tokio::test]
async fn test_runners_share_client() {
    let engine = FakeEngine::new();
    let client: Arc<dyn EngineClient> = Arc::new(engine.clone());

    let first = Runner::new(Some(client.clone())).await.unwrap();
    let second = Runner::with_config(Some(client), RunnerConfig::new().host_port(4567))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut first_sink = Vec::new();
    let mut second_sink = Vec::new();
    let (a, b) = tokio::join!(
        first.start_with_sink(&cancel, &mut first_sink),
        second.start_with_sink(&cancel, &mut second_sink),
    );

    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(engine.containers().len(), 2);
}
