// tests/command_runner.rs
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jobdag::engine::Shutdown;
use jobdag::exec::{invocation, CommandRunner, CommandSpec};
use jobdag::types::Backend;
use jobdag_test_utils::builders::RunConfigBuilder;
use jobdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn runner() -> CommandRunner {
    CommandRunner::new(Arc::new(RunConfigBuilder::new().build()), Shutdown::never())
}

#[tokio::test]
async fn echo_output_is_captured_verbatim() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["echo", "hihihi"])?;
    let result = with_timeout(runner().execute(&cmd, Backend::DirectProcess)).await?;

    assert_eq!(result.stdout, b"hihihi\n");
    assert!(result.stderr.is_empty());
    assert_eq!(result.status, 0);
    assert_eq!(result.backend, Backend::DirectProcess);
    Ok(())
}

#[tokio::test]
async fn output_without_trailing_newline_is_not_altered() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["printf", "a\tb\n\nc"])?;
    let stdout = with_timeout(runner().execute_capture(&cmd, Backend::DirectProcess)).await?;

    assert_eq!(stdout, "a\tb\n\nc");
    Ok(())
}

#[tokio::test]
async fn non_utf8_output_is_kept_byte_for_byte() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["printf", "\\377\\376ok"])?;
    let result = with_timeout(runner().execute(&cmd, Backend::DirectProcess)).await?;

    assert_eq!(result.stdout, vec![0xff, 0xfe, b'o', b'k']);
    assert_eq!(result.stdout_str(), None);
    Ok(())
}

#[tokio::test]
async fn text_capture_rejects_non_utf8_output() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["printf", "\\377\\376ok"])?;
    let failure = with_timeout(runner().execute_capture(&cmd, Backend::DirectProcess))
        .await
        .unwrap_err();

    assert_eq!(failure.status, Some(0));
    assert!(failure.reason.contains("not valid UTF-8"), "{}", failure.reason);
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_carries_status_and_stderr() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["sh", "-c", "echo partial; echo boom >&2; exit 3"])?;
    let failure = with_timeout(runner().execute(&cmd, Backend::DirectProcess))
        .await
        .unwrap_err();

    assert_eq!(failure.status, Some(3));
    assert_eq!(failure.stderr, "boom\n");
    assert_eq!(failure.backend, Backend::DirectProcess);
    assert!(failure.to_string().contains("exited with status 3"));
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_launch_failure() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["definitely-not-a-real-program-jobdag"])?;
    let failure = with_timeout(runner().execute(&cmd, Backend::DirectProcess))
        .await
        .unwrap_err();

    assert_eq!(failure.status, None);
    assert!(failure.reason.contains("failed to launch"), "{}", failure.reason);
    Ok(())
}

#[tokio::test]
async fn shutdown_terminates_a_running_command_after_grace() -> TestResult {
    init_tracing();

    let (trigger, shutdown) = Shutdown::channel();
    let runner = CommandRunner::new(Arc::new(RunConfigBuilder::new().build()), shutdown);
    let cmd = CommandSpec::new(["sleep", "30"])?;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
    });

    let started = Instant::now();
    let failure = with_timeout(runner.execute(&cmd, Backend::DirectProcess))
        .await
        .unwrap_err();

    assert_eq!(failure.reason, "terminated by shutdown");
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[test]
fn empty_command_is_rejected() {
    let empty: [&str; 0] = [];
    assert!(CommandSpec::new(empty).is_err());
}

#[test]
fn docker_invocation_mounts_volumes_and_work_dir() -> TestResult {
    let cfg = RunConfigBuilder::new()
        .image("ubuntu:24.04")
        .volume("/data:/data")
        .work_dir("/srv/work")
        .build();
    let cmd = CommandSpec::new(["echo", "hi"])?;

    let argv = invocation(&cmd, Backend::ImageRuntime, &cfg)?;
    assert_eq!(
        argv,
        vec![
            "docker", "run", "--rm", "-v", "/data:/data", "-v", "/srv/work:/srv/work", "-w",
            "/srv/work", "ubuntu:24.04", "echo", "hi",
        ]
    );
    Ok(())
}

#[test]
fn singularity_invocation_binds_volumes_and_work_dir() -> TestResult {
    let cfg = RunConfigBuilder::new()
        .sandbox_image("/images/tools.sif")
        .volume("/data:/mnt/data")
        .work_dir("/srv/work")
        .build();
    let cmd = CommandSpec::new(["echo", "hi"])?;

    let argv = invocation(&cmd, Backend::SandboxRuntime, &cfg)?;
    assert_eq!(
        argv,
        vec![
            "singularity", "exec", "--bind", "/data:/mnt/data", "--bind",
            "/srv/work:/srv/work", "--pwd", "/srv/work", "/images/tools.sif", "echo", "hi",
        ]
    );
    Ok(())
}

#[test]
fn direct_invocation_is_the_command_itself() -> TestResult {
    let cfg = RunConfigBuilder::new().volume("/ignored:/ignored").build();
    let cmd = CommandSpec::new(["ls", "-la"])?;

    assert_eq!(invocation(&cmd, Backend::DirectProcess, &cfg)?, vec!["ls", "-la"]);
    Ok(())
}

#[test]
fn container_invocation_without_image_is_an_error() -> TestResult {
    let cfg = RunConfigBuilder::new().build();
    let cmd = CommandSpec::new(["echo", "hi"])?;

    assert!(invocation(&cmd, Backend::ImageRuntime, &cfg).is_err());
    assert!(invocation(&cmd, Backend::SandboxRuntime, &cfg).is_err());
    Ok(())
}

#[tokio::test]
async fn container_run_without_image_fails_without_launching() -> TestResult {
    init_tracing();

    let cmd = CommandSpec::new(["echo", "hi"])?;
    let failure = runner().execute(&cmd, Backend::ImageRuntime).await.unwrap_err();

    assert_eq!(failure.backend, Backend::ImageRuntime);
    assert_eq!(failure.status, None);
    assert!(failure.reason.contains("no image"));
    Ok(())
}
