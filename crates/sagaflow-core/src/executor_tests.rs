//! Tests for the step executor.

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::json;

/// Step that fails `fail_times` times before succeeding.
fn flaky_step(retries: u32, fail_times: u32, calls: Arc<AtomicU32>) -> Step {
    Step::from_fn("flaky", "Fails a few times", move |_ctx, _input| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= fail_times {
                Err(StepError::failed(format!("failure #{}", n)))
            } else {
                Ok(StepOutput::new().with("attempts", n))
            }
        }
    })
    .with_retries(retries)
}

fn input() -> StepInput {
    StepInput {
        workflow_id: "wf-1".to_string(),
        step_number: 1,
        total_steps: 1,
        ..Default::default()
    }
}

fn fast_executor() -> StepExecutor {
    StepExecutor::new(RetryPolicy::fixed(Duration::from_millis(10)))
}

#[tokio::test]
async fn test_always_failing_step_runs_retry_count_plus_one_times() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = flaky_step(3, u32::MAX, calls.clone());

    let err = fast_executor()
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    match err {
        StepError::Exhausted { step, attempts, source } => {
            assert_eq!(step, "flaky");
            assert_eq!(attempts, 4);
            assert_eq!(source.to_string(), "failure #4");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_success_on_attempt_k_stops_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = flaky_step(5, 2, calls.clone());

    let output = fast_executor()
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(output.values["attempts"], json!(3));
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = flaky_step(0, 1, calls.clone());

    let err = fast_executor()
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(err.to_string().contains("1 attempts"));
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_is_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let step = Step::from_fn("slow", "Sleeps past its timeout", move |_ctx, _input| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(60)).await;
            Ok::<_, StepError>(StepOutput::new())
        }
    })
    .with_timeout(Duration::from_secs(1))
    .with_retries(1);

    let err = fast_executor()
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    match err {
        StepError::Exhausted { source, .. } => {
            assert!(matches!(*source, StepError::Timeout(d) if d == Duration::from_secs(1)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_attempt_token() {
    let (tx, rx) = tokio::sync::oneshot::channel::<CancellationToken>();
    let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
    let step = Step::from_fn("observer", "Hands out its token", move |ctx: StepContext, _input| {
        let tx = tx.clone();
        async move {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(ctx.cancel.clone());
            }
            sleep(Duration::from_secs(60)).await;
            Ok::<_, StepError>(StepOutput::new())
        }
    })
    .with_timeout(Duration::from_millis(500));

    let outer = CancellationToken::new();
    let _ = fast_executor().execute(&step, input(), &outer).await;

    let attempt_token = rx.await.unwrap();
    assert!(attempt_token.is_cancelled());
    assert!(!outer.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_applies_when_step_has_none() {
    let step = Step::from_fn("slow", "", |_ctx, _input| async {
        sleep(Duration::from_secs(60)).await;
        Ok::<_, StepError>(StepOutput::new())
    });

    let err = fast_executor()
        .with_default_timeout(Duration::from_secs(2))
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_outer_cancellation_stops_running_attempt_without_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let step = Step::from_fn("long", "", move |_ctx, _input| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(3600)).await;
            Ok::<_, StepError>(StepOutput::new())
        }
    })
    .with_retries(5);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = fast_executor().execute(&step, input(), &cancel).await.unwrap_err();
    assert!(matches!(err, StepError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_outer_cancellation_aborts_retry_wait() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = flaky_step(3, u32::MAX, calls.clone());

    let executor = StepExecutor::new(RetryPolicy::fixed(Duration::from_secs(600)));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let err = executor.execute(&step, input(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_already_cancelled_token_runs_nothing() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = flaky_step(2, 0, calls.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fast_executor().execute(&step, input(), &cancel).await.unwrap_err();
    assert!(matches!(err, StepError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_each_attempt_receives_same_input() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let record = seen.clone();
    let step = Step::from_fn("inspect", "", move |ctx: StepContext, input: StepInput| {
        let record = record.clone();
        async move {
            record.lock().push((ctx.attempt, input.step_number));
            if ctx.attempt < 2 {
                return Err(StepError::failed("first attempt fails"));
            }
            Ok::<_, StepError>(StepOutput::new())
        }
    })
    .with_retries(1);

    fast_executor()
        .execute(&step, input(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![(1, 1), (2, 1)]);
}
