//! The error entry point: one-shot delayed retry for rate limits,
//! structured deferral otherwise, fatal re-raise for the rest.

use std::sync::atomic::Ordering;
use std::time::Duration;

use courier::context::ExecutionContext;
use courier::dispatch::{Delivery, DeliveryMode, Dispatcher, SendRequest};
use courier::error::DispatchError;
use courier::handler::ErrorOutcome;

use crate::support::{serve_once, serve_sequence};

fn webhook_request(address: &str) -> SendRequest {
    SendRequest {
        text: "deploy finished".to_owned(),
        channel: None,
        mode: DeliveryMode::Webhook,
        address: Some(address.to_owned()),
    }
}

fn fast_dispatcher() -> Dispatcher {
    Dispatcher::new().with_retry_delay(Duration::from_millis(10))
}

#[tokio::test]
async fn rate_limit_retries_exactly_once_and_recovers() {
    let (url, hits, _) = serve_sequence(vec![
        ("429 Too Many Requests".to_owned(), "slow down".to_owned()),
        ("200 OK".to_owned(), "ok".to_owned()),
    ])
    .await;
    let request = webhook_request(&url);
    let ctx = ExecutionContext::default();
    let dispatcher = fast_dispatcher();

    let error = match dispatcher.invoke(&request, &ctx).await {
        Ok(result) => panic!("first call should be rate limited, got {result:?}"),
        Err(err) => err,
    };
    assert!(matches!(error, DispatchError::Transport { status: 429, .. }));

    let outcome = dispatcher
        .on_error(error, &request, &ctx)
        .await
        .expect("retry should recover");
    match outcome {
        ErrorOutcome::Recovered(result) => {
            assert_eq!(result.delivery, Delivery::Webhook { ok: true });
        }
        ErrorOutcome::RetryRequested => panic!("expected a recovered result"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_retry_is_wrapped_and_not_retried_again() {
    let (url, hits, _) = serve_sequence(vec![
        ("429 Too Many Requests".to_owned(), "slow down".to_owned()),
        ("429 Too Many Requests".to_owned(), "slow down".to_owned()),
    ])
    .await;
    let request = webhook_request(&url);
    let ctx = ExecutionContext::default();
    let dispatcher = fast_dispatcher();

    let error = match dispatcher.invoke(&request, &ctx).await {
        Ok(result) => panic!("first call should be rate limited, got {result:?}"),
        Err(err) => err,
    };

    let wrapped = match dispatcher.on_error(error, &request, &ctx).await {
        Ok(outcome) => panic!("expected the retry to fail, got {outcome:?}"),
        Err(err) => err,
    };
    assert!(matches!(
        wrapped,
        DispatchError::RetryFailed { ref source }
            if matches!(**source, DispatchError::Transport { status: 429, .. })
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn auth_failure_re_raises_without_another_call() {
    let (url, hits, _) =
        serve_sequence(vec![("401 Unauthorized".to_owned(), "denied".to_owned())]).await;
    let request = webhook_request(&url);
    let ctx = ExecutionContext::default();
    let dispatcher = fast_dispatcher();

    let error = match dispatcher.invoke(&request, &ctx).await {
        Ok(result) => panic!("call should be rejected, got {result:?}"),
        Err(err) => err,
    };

    let fatal = match dispatcher.on_error(error, &request, &ctx).await {
        Ok(outcome) => panic!("expected a fatal re-raise, got {outcome:?}"),
        Err(err) => err,
    };
    assert!(matches!(fatal, DispatchError::Transport { status: 401, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gateway_failure_defers_to_the_caller() {
    let url = serve_once("502 Bad Gateway", "upstream down").await;
    let request = webhook_request(&url);
    let ctx = ExecutionContext::default();
    let dispatcher = fast_dispatcher();

    let error = match dispatcher.invoke(&request, &ctx).await {
        Ok(result) => panic!("call should fail, got {result:?}"),
        Err(err) => err,
    };

    let outcome = dispatcher
        .on_error(error, &request, &ctx)
        .await
        .expect("gateway failures are deferred, not raised");
    assert_eq!(outcome, ErrorOutcome::RetryRequested);
}

#[tokio::test]
async fn unknown_errors_request_a_retry_without_any_network_call() {
    // Address points at a closed port; a network attempt would fail
    // loudly rather than hang, but none should happen at all.
    let request = webhook_request("http://127.0.0.1:1");
    let ctx = ExecutionContext::default();
    let dispatcher = fast_dispatcher();

    let outcome = dispatcher
        .on_error(
            DispatchError::Parse("truncated body".to_owned()),
            &request,
            &ctx,
        )
        .await
        .expect("unknown errors are deferred");
    assert_eq!(outcome, ErrorOutcome::RetryRequested);
}
