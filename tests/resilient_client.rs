//! Behaviour of the full limiter → breaker → call → fallback chain.

use std::time::Duration;

use futures_util::future::join_all;
use user_service::resilience::{CallRequest, CircuitState, FailureReason};

mod common;
use common::{client, policy, ScriptedRemote, Step};

const RESOURCE: &str = "department-service";

#[tokio::test(start_paused = true)]
async fn test_limiter_rejects_burst_then_refills() {
    let remote = ScriptedRemote::always(Step::Ok("engineering".into()));
    let client = client(remote.clone(), policy(3, 5));

    let mut reasons = Vec::new();
    for _ in 0..5 {
        reasons.push(client.call(CallRequest::new(RESOURCE, "1")).await.reason());
    }

    assert!(reasons[..3].iter().all(Option::is_none));
    assert!(reasons[3..]
        .iter()
        .all(|r| *r == Some(FailureReason::RejectedByLimiter)));
    assert_eq!(remote.calls(), 3);

    let rejected = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(rejected.payload(), "fallback:rejected_by_limiter:1");

    tokio::time::advance(Duration::from_secs(1)).await;
    let refilled = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert!(!refilled.used_fallback());
    assert_eq!(refilled.payload(), "engineering");
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_and_skips_remote() {
    let remote = ScriptedRemote::always(Step::Fail);
    let client = client(remote.clone(), policy(100, 3));

    for _ in 0..3 {
        let response = client.call(CallRequest::new(RESOURCE, "1")).await;
        assert_eq!(response.reason(), Some(FailureReason::DownstreamError));
    }
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);

    for _ in 0..10 {
        let response = client.call(CallRequest::new(RESOURCE, "1")).await;
        assert_eq!(response.reason(), Some(FailureReason::BreakerOpen));
    }
    assert_eq!(remote.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_trial_success_closes() {
    let remote = ScriptedRemote::new([Step::Fail, Step::Fail], Step::Ok("engineering".into()));
    let client = client(remote.clone(), policy(100, 2));

    client.call(CallRequest::new(RESOURCE, "1")).await;
    client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(30)).await;
    let trial = client.call(CallRequest::new(RESOURCE, "1")).await;

    assert!(!trial.used_fallback());
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Closed);
    assert_eq!(client.circuit_breaker().snapshot(RESOURCE).failure_count, 0);
    assert_eq!(remote.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_trial_failure_reopens() {
    let remote = ScriptedRemote::always(Step::Fail);
    let client = client(remote.clone(), policy(100, 2));

    client.call(CallRequest::new(RESOURCE, "1")).await;
    client.call(CallRequest::new(RESOURCE, "1")).await;
    tokio::time::advance(Duration::from_secs(30)).await;

    let trial = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(trial.reason(), Some(FailureReason::DownstreamError));
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);

    let next = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(next.reason(), Some(FailureReason::BreakerOpen));
    assert_eq!(remote.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_call_times_out_and_counts_as_failure() {
    let remote = ScriptedRemote::always(Step::Slow(Duration::from_secs(5)));
    let client = client(remote.clone(), policy(100, 2));

    let response = client.call(CallRequest::new(RESOURCE, "7")).await;
    assert_eq!(response.reason(), Some(FailureReason::Timeout));
    assert_eq!(response.payload(), "fallback:timeout:7");
    assert_eq!(client.circuit_breaker().snapshot(RESOURCE).failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_per_request_timeout_overrides_policy() {
    let remote = ScriptedRemote::always(Step::Slow(Duration::from_millis(500)));
    let client = client(remote.clone(), policy(100, 5));

    let response = client
        .call(CallRequest::new(RESOURCE, "1").with_timeout(Duration::from_secs(1)))
        .await;
    assert_eq!(response.payload(), "slow:1");
}

#[tokio::test(start_paused = true)]
async fn test_only_one_half_open_trial_under_concurrency() {
    let remote = ScriptedRemote::new([Step::Fail], Step::Slow(Duration::from_secs(1)));
    let client = client(remote.clone(), policy(100, 1));

    client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);
    tokio::time::advance(Duration::from_secs(30)).await;

    let calls = (0..10).map(|_| client.call(CallRequest::new(RESOURCE, "1")));
    let responses = join_all(calls).await;

    let live = responses.iter().filter(|r| !r.used_fallback()).count();
    let short_circuited = responses
        .iter()
        .filter(|r| r.reason() == Some(FailureReason::BreakerOpen))
        .count();
    assert_eq!(live, 1);
    assert_eq!(short_circuited, 9);
    assert_eq!(remote.calls(), 2);
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_resources_are_isolated() {
    let remote = ScriptedRemote::new([Step::Fail, Step::Fail], Step::Ok("payroll".into()));
    let client = client(remote.clone(), policy(2, 2));

    client.call(CallRequest::new("department-service", "1")).await;
    client.call(CallRequest::new("department-service", "1")).await;
    assert_eq!(client.circuit_breaker().state("department-service"), CircuitState::Open);
    assert_eq!(client.rate_limiter().available_permits("department-service"), 0);

    let other = client.call(CallRequest::new("payroll-service", "1")).await;
    assert!(!other.used_fallback());
    assert_eq!(client.circuit_breaker().state("payroll-service"), CircuitState::Closed);
    assert_eq!(client.rate_limiter().available_permits("payroll-service"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_call_counts_as_one_failure() {
    let remote = ScriptedRemote::always(Step::Slow(Duration::from_secs(10)));
    let mut defaults = policy(100, 2);
    defaults.call_timeout_ms = 60_000;
    let client = client(remote.clone(), defaults);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        client.call(CallRequest::new(RESOURCE, "1")),
    )
    .await;
    assert!(abandoned.is_err());

    let snapshot = client.circuit_breaker().snapshot(RESOURCE);
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_admission_does_not_touch_breaker() {
    let remote = ScriptedRemote::always(Step::Fail);
    let client = client(remote.clone(), policy(1, 1));

    client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);
    tokio::time::advance(Duration::from_secs(30)).await;

    // Drain the permit that refilled while the circuit was open.
    let _ = client.rate_limiter().try_acquire(RESOURCE);
    let rejected = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(rejected.reason(), Some(FailureReason::RejectedByLimiter));
    assert_eq!(client.circuit_breaker().state(RESOURCE), CircuitState::Open);
    assert_eq!(remote.calls(), 1);

    // The expired open timeout is still waiting for its trial.
    tokio::time::advance(Duration::from_secs(1)).await;
    let trial = client.call(CallRequest::new(RESOURCE, "1")).await;
    assert_eq!(trial.reason(), Some(FailureReason::DownstreamError));
    assert_eq!(remote.calls(), 2);
}
