// tests/scheduler_budget.rs

use std::error::Error;
use std::time::Duration;

use jobdag::dag::{JobOutcome, ResourceBudget, Scheduler};
use jobdag::errors::JobdagError;
use jobdag::types::{MemorySize, Resources};
use jobdag_test_utils::builders::{resources, run_context, JobGraphBuilder, RunConfigBuilder};
use jobdag_test_utils::fake_jobs::{Recorder, RecordingJob};
use jobdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const GIB: u64 = 1024 * 1024 * 1024;

fn slow(rec: &Recorder) -> RecordingJob {
    RecordingJob::ok(rec).with_delay(Duration::from_millis(100))
}

#[tokio::test]
async fn jobs_requesting_all_cores_never_overlap() -> TestResult {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job_with("big_one", resources(4, 1), slow(&rec))
        .job_with("big_two", resources(4, 1), slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(4, 8 * GIB, 8));
    let ctx = run_context(RunConfigBuilder::new().build());
    let report = with_timeout(scheduler.run(&graph, &ctx)).await?;

    assert!(report.success);
    assert_eq!(rec.max_concurrent(), 1);
    assert_eq!(rec.started(), vec!["big_one", "big_two"]);
    Ok(())
}

#[tokio::test]
async fn small_independent_jobs_run_concurrently() -> TestResult {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job_with("a", resources(1, 1), slow(&rec))
        .job_with("b", resources(1, 1), slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(4, 8 * GIB, 8));
    let ctx = run_context(RunConfigBuilder::new().build());
    let report = with_timeout(scheduler.run(&graph, &ctx)).await?;

    assert!(report.success);
    assert_eq!(rec.max_concurrent(), 2);
    Ok(())
}

#[tokio::test]
async fn memory_budget_serialises_jobs() -> TestResult {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job_with("a", resources(1, 3), slow(&rec))
        .job_with("b", resources(1, 3), slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(8, 4 * GIB, 8));
    let ctx = run_context(RunConfigBuilder::new().build());
    let report = with_timeout(scheduler.run(&graph, &ctx)).await?;

    assert!(report.success);
    assert_eq!(rec.max_concurrent(), 1);
    Ok(())
}

#[tokio::test]
async fn worker_bound_limits_concurrency() -> TestResult {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job("a", slow(&rec))
        .job("b", slow(&rec))
        .job("c", slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(16, 16 * GIB, 2));
    let ctx = run_context(RunConfigBuilder::new().build());
    let report = with_timeout(scheduler.run(&graph, &ctx)).await?;

    assert!(report.success);
    assert_eq!(rec.max_concurrent(), 2);
    Ok(())
}

#[tokio::test]
async fn later_job_that_fits_starts_while_earlier_one_waits() -> TestResult {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job_with("wide", resources(3, 1), slow(&rec))
        .job_with("also_wide", resources(3, 1), slow(&rec))
        .job_with("narrow", resources(1, 1), slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(4, 8 * GIB, 8));
    let ctx = run_context(RunConfigBuilder::new().build());
    let report = with_timeout(scheduler.run(&graph, &ctx)).await?;

    assert!(report.success);
    assert_eq!(rec.started(), vec!["wide", "narrow", "also_wide"]);
    Ok(())
}

#[tokio::test]
async fn request_larger_than_budget_is_rejected_before_running() {
    init_tracing();

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job("fine", RecordingJob::ok(&rec))
        .job_with("huge", resources(64, 1), RecordingJob::ok(&rec))
        .build();

    let mut scheduler = Scheduler::new(ResourceBudget::new(4, 8 * GIB, 8));
    let ctx = run_context(RunConfigBuilder::new().build());
    let result = scheduler.run(&graph, &ctx).await;

    match result {
        Err(JobdagError::InvalidResources(msg)) => assert!(msg.contains("huge")),
        other => panic!("expected InvalidResources, got {other:?}"),
    }
    assert!(rec.started().is_empty());
}

#[tokio::test]
async fn budget_comes_from_run_config() -> TestResult {
    init_tracing();

    let cfg = RunConfigBuilder::new()
        .max_cores(2)
        .max_memory(MemorySize::gib(2))
        .build();
    let budget = ResourceBudget::from_config(&cfg);
    assert_eq!(budget.max_cores(), 2);
    assert_eq!(budget.max_memory(), 2 * GIB);

    let rec = Recorder::new();
    let graph = JobGraphBuilder::new()
        .job_with("a", resources(2, 1), slow(&rec))
        .job_with("b", resources(2, 1), slow(&rec))
        .build();

    let mut scheduler = Scheduler::new(budget);
    let report = with_timeout(scheduler.run(&graph, &run_context(cfg))).await?;

    assert_eq!(report.outcome("a"), Some(JobOutcome::Succeeded));
    assert_eq!(report.outcome("b"), Some(JobOutcome::Succeeded));
    assert_eq!(rec.max_concurrent(), 1);
    assert_eq!(scheduler.budget().active(), 0);
    Ok(())
}

fn request(cores: u32, bytes: u64) -> Resources {
    Resources::new(cores, MemorySize::from_bytes(bytes).expect("non-zero memory"))
        .expect("non-zero cores")
}

#[test]
fn huge_core_requests_do_not_overflow_the_budget() {
    let mut budget = ResourceBudget::new(u32::MAX, u64::MAX, 8);
    let big = request(3_000_000_000, 1);

    assert!(budget.try_reserve(&big));
    assert!(!budget.try_reserve(&big));
    assert_eq!(budget.active(), 1);
}

#[test]
fn huge_memory_requests_do_not_overflow_the_budget() {
    let mut budget = ResourceBudget::new(8, u64::MAX, 8);
    let big = request(1, u64::MAX - 10);

    assert!(budget.try_reserve(&big));
    assert!(!budget.try_reserve(&request(1, 100)));

    budget.release(&big);
    assert!(budget.try_reserve(&request(1, 100)));
}

#[test]
fn released_worker_slot_can_be_reserved_again() {
    let mut budget = ResourceBudget::new(8, 8 * GIB, 1);
    let small = request(1, GIB);

    assert!(budget.try_reserve(&small));
    assert!(!budget.try_reserve(&small));
    budget.release(&small);
    assert!(budget.try_reserve(&small));
}
