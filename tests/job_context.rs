// tests/job_context.rs
#![cfg(unix)]

use std::error::Error;

use jobdag::errors::JobdagError;
use jobdag::job::{LogLine, MasterLog};
use jobdag::types::Backend;
use jobdag_test_utils::builders::{run_context, RunConfigBuilder};
use jobdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn helpers_run_through_the_run_backend() -> TestResult {
    init_tracing();

    let ctx = run_context(RunConfigBuilder::new().message("m").total(2).build());
    let job = ctx.for_job("worker");

    assert_eq!(job.job_name(), "worker");
    assert_eq!(job.backend(), Backend::DirectProcess);
    assert_eq!(job.config().message, "mm");

    let result = with_timeout(job.call(["sh", "-c", "echo out; echo err >&2"])).await?;
    assert_eq!(result.stdout, b"out\n");
    assert_eq!(result.stderr, b"err\n");
    assert_eq!(result.stdout_str(), Some("out\n"));
    assert_eq!(result.backend, Backend::DirectProcess);

    with_timeout(job.check_call(["true"])).await?;
    assert_eq!(with_timeout(job.check_output(["echo", "x"])).await?, "x\n");
    Ok(())
}

#[tokio::test]
async fn check_call_surfaces_non_zero_exit() {
    init_tracing();

    let ctx = run_context(RunConfigBuilder::new().build());
    let job = ctx.for_job("worker");

    match with_timeout(job.check_call(["false"])).await {
        Err(JobdagError::ExecutionFailure(failure)) => assert_eq!(failure.status, Some(1)),
        other => panic!("expected ExecutionFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn per_call_backend_override_is_not_pre_checked() {
    init_tracing();

    // No image configured: the override is attempted and fails as an
    // execution failure, not as an unavailable backend.
    let ctx = run_context(RunConfigBuilder::new().build());
    let job = ctx.for_job("worker");

    let err = with_timeout(job.check_output_with(["echo", "x"], Backend::ImageRuntime))
        .await
        .unwrap_err();
    assert!(matches!(err, JobdagError::ExecutionFailure(_)));
    assert_eq!(err.captured_stderr(), Some(""));

    let err = with_timeout(job.call_with(["echo", "x"], Backend::SandboxRuntime))
        .await
        .unwrap_err();
    assert!(matches!(err, JobdagError::ExecutionFailure(ref f) if f.backend == Backend::SandboxRuntime));
}

#[tokio::test]
async fn empty_command_is_a_config_error() {
    let ctx = run_context(RunConfigBuilder::new().build());
    let empty: Vec<String> = Vec::new();

    let err = ctx.for_job("worker").check_call(empty).await.unwrap_err();
    assert!(matches!(err, JobdagError::ConfigError(_)));
}

#[test]
fn master_log_keeps_lines_from_every_clone() {
    let log = MasterLog::new();
    let other = log.clone();

    log.append("a", "first");
    other.append("b", "second");
    log.append("a", "third");

    assert_eq!(log.messages_from("a"), vec!["first", "third"]);
    assert_eq!(
        other.lines(),
        vec![
            LogLine { job: "a".into(), message: "first".into() },
            LogLine { job: "b".into(), message: "second".into() },
            LogLine { job: "a".into(), message: "third".into() },
        ]
    );
}

#[test]
fn master_log_accepts_concurrent_writers() {
    let log = MasterLog::new();

    std::thread::scope(|s| {
        for t in 0..4 {
            let log = log.clone();
            s.spawn(move || {
                for i in 0..50 {
                    log.append(&format!("t{t}"), format!("line {i}"));
                }
            });
        }
    });

    assert_eq!(log.lines().len(), 200);
    for t in 0..4 {
        let msgs = log.messages_from(&format!("t{t}"));
        let expected: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
        assert_eq!(msgs, expected);
    }
}
