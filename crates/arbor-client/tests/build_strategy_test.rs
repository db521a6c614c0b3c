//! Strategy selection from configuration

use std::sync::Arc;

use arbor_client::{
    AsyncRetryCenter, ClientError, Configuration, CreateMode, MemoryProvider, Provider,
    build_strategy,
};
use config::Config;

fn configuration(settings: &[(&str, &str)]) -> Configuration {
    let mut builder = Config::builder();
    for (key, value) in settings {
        builder = builder.set_override(*key, *value).unwrap();
    }
    Configuration::from_config(builder.build().unwrap())
}

fn fast_retry(strategy: &str) -> Configuration {
    configuration(&[
        ("arbor.retry.strategy", strategy),
        ("arbor.retry.max-retries", "2"),
        ("arbor.retry.base-delay-ms", "1"),
        ("arbor.retry.max-delay-ms", "1"),
    ])
}

#[tokio::test]
async fn test_usual_strategy_does_not_retry() {
    let memory = Arc::new(MemoryProvider::new());
    let strategy = build_strategy(&fast_retry("usual"), memory.clone(), None).unwrap();

    memory.expire_next(1);
    let err = strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap_err();

    assert!(err.is_policy_exhausted());
    assert_eq!(memory.calls(), 1);
}

#[tokio::test]
async fn test_sync_strategy_retries_inline() {
    let memory = Arc::new(MemoryProvider::new());
    let strategy = build_strategy(&fast_retry("sync"), memory.clone(), None).unwrap();

    memory.expire_next(2);
    strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap();

    assert_eq!(memory.value("/k").as_deref(), Some("v"));
    assert_eq!(memory.calls(), 3);
    assert_eq!(memory.resets(), 2);
}

#[tokio::test]
async fn test_sync_is_the_default() {
    let memory = Arc::new(MemoryProvider::new());
    let strategy = build_strategy(&Configuration::default(), memory.clone(), None).unwrap();

    memory.expire_next(1);
    strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap();
    assert!(memory.contains("/k"));
}

#[tokio::test]
async fn test_async_strategy_requires_center() {
    let memory = Arc::new(MemoryProvider::new());
    let result = build_strategy(&fast_retry("async"), memory, None);
    assert!(matches!(result, Err(ClientError::Config(_))));
}

#[tokio::test]
async fn test_unknown_strategy_is_rejected() {
    let memory = Arc::new(MemoryProvider::new());
    let result = build_strategy(&fast_retry("eventually"), memory, None);
    assert!(matches!(result, Err(ClientError::Config(_))));
}

#[tokio::test]
async fn test_async_strategy_hands_off_after_single_attempt() {
    let memory = Arc::new(MemoryProvider::new());
    let center = AsyncRetryCenter::new(1);
    let strategy =
        build_strategy(&fast_retry("async"), memory.clone(), Some(center.clone())).unwrap();
    assert!(center.is_started());

    memory.expire_next(1);
    strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap();
    center.wait_idle().await;

    assert_eq!(center.stats().enqueued, 1);
    assert_eq!(center.stats().succeeded, 1);
    assert_eq!(memory.resets(), 0);
    assert_eq!(memory.value("/k").as_deref(), Some("v"));
}

#[tokio::test]
async fn test_async_inline_retries_absorb_short_outage() {
    let memory = Arc::new(MemoryProvider::new());
    let center = AsyncRetryCenter::new(1);
    let config = configuration(&[
        ("arbor.retry.strategy", "async"),
        ("arbor.retry.max-retries", "2"),
        ("arbor.retry.base-delay-ms", "1"),
        ("arbor.retry.async.inline-retries", "true"),
    ]);
    let strategy = build_strategy(
        &config,
        memory.clone(),
        Some(center.clone()),
    )
    .unwrap();

    memory.expire_next(2);
    strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap();

    assert_eq!(center.stats().enqueued, 0);
    assert_eq!(memory.resets(), 2);
    assert!(memory.contains("/k"));
}

#[tokio::test]
async fn test_center_from_configuration() {
    let config = configuration(&[
        ("arbor.retry.strategy", "async"),
        ("arbor.retry.max-retries", "4"),
        ("arbor.retry.base-delay-ms", "1"),
        ("arbor.retry.async.workers", "3"),
    ]);
    let center = AsyncRetryCenter::from_configuration(&config);

    assert_eq!(center.workers(), 3);
    assert_eq!(center.policy().unwrap().max_retries(), Some(4));
    assert!(!center.is_started());

    let memory = Arc::new(MemoryProvider::new());
    let strategy = build_strategy(&config, memory.clone(), Some(center.clone())).unwrap();
    assert!(center.is_started());

    // inline attempt and first replay both expire
    memory.expire_next(2);
    strategy
        .create_current_only("/k", "v", CreateMode::Persistent)
        .await
        .unwrap();
    center.wait_idle().await;

    assert_eq!(center.stats().retried, 1);
    assert_eq!(center.stats().succeeded, 1);
    assert_eq!(memory.value("/k").as_deref(), Some("v"));
}

#[test]
fn test_center_workers_at_least_one() {
    let center =
        AsyncRetryCenter::from_configuration(&configuration(&[("arbor.retry.async.workers", "0")]));
    assert_eq!(center.workers(), 1);
}

#[tokio::test]
async fn test_namespace_sets_branch_boundary() {
    let memory = Arc::new(MemoryProvider::with_namespace("svc"));
    for p in ["/svc", "/svc/a", "/svc/a/b"] {
        memory.create(p, "", CreateMode::Persistent).await.unwrap();
    }
    let config = configuration(&[("arbor.registry.namespace", "svc")]);
    let strategy = build_strategy(&config, memory.clone(), None).unwrap();

    strategy.delete_current_branch("a/b").await.unwrap();

    assert_eq!(memory.paths(), vec!["/svc"]);
}
