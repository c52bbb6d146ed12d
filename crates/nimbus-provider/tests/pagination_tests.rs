use nimbus_core::EndpointTracker;
use nimbus_provider::{
    ProviderError, RawPage, ResourceIterator, RetryPolicy, ScriptedTransport, Transport,
    TransportPageSource,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FIRST: &str = "https://arm.test/items?api-version=1";

fn page_url(n: usize) -> String {
    format!("https://arm.test/items?api-version=1&page={}", n)
}

fn transient() -> ProviderError {
    ProviderError::Transient {
        endpoint: FIRST.into(),
        status: Some(500),
        message: "Internal Server Error".into(),
    }
}

fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        endpoint: FIRST.into(),
        retry_after: None,
    }
}

fn source(transport: &Arc<ScriptedTransport>) -> TransportPageSource<Value> {
    let transport: Arc<dyn Transport> = transport.clone();
    TransportPageSource::new(transport, FIRST.to_string())
}

#[tokio::test]
async fn test_pagination_delivers_every_item_in_order() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond(
            FIRST,
            RawPage::new(vec![json!({"id": 1}), json!({"id": 2})]).with_next_link(&page_url(2)),
        )
        .respond(
            &page_url(2),
            RawPage::new(vec![json!({"id": 3})]).with_next_link(&page_url(3)),
        )
        .respond(&page_url(3), RawPage::new(vec![json!({"id": 4}), json!({"id": 5})]));

    let iterator = ResourceIterator::new(RetryPolicy::immediate(3));
    let mut ids = Vec::new();
    let stats = iterator
        .for_each(&source(&transport), |item: Value| {
            ids.push(item["id"].as_i64().unwrap_or_default());
            async { Ok::<(), ProviderError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.items, 5);
    assert_eq!(stats.requests, 3);
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test]
async fn test_next_page_waits_for_current_items() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond(
            FIRST,
            RawPage::new(vec![json!({"id": 1}), json!({"id": 2})]).with_next_link(&page_url(2)),
        )
        .respond(&page_url(2), RawPage::new(vec![json!({"id": 3})]));

    let iterator = ResourceIterator::new(RetryPolicy::immediate(3));
    let mut calls_seen = Vec::new();
    let observer = transport.clone();
    iterator
        .for_each(&source(&transport), |_item: Value| {
            calls_seen.push(observer.calls().len());
            async {
                tokio::task::yield_now().await;
                Ok::<(), ProviderError>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(calls_seen, vec![1, 1, 2]);
}

#[tokio::test]
async fn test_always_rate_limited_stops_at_ceiling() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail_forever(FIRST, rate_limited());

    let iterator = ResourceIterator::new(RetryPolicy::immediate(4));
    let mut delivered = 0;
    let err = iterator
        .for_each(&source(&transport), |_item: Value| {
            delivered += 1;
            async { Ok::<(), ProviderError>(()) }
        })
        .await
        .unwrap_err();

    assert_eq!(transport.call_count(FIRST), 4);
    assert_eq!(delivered, 0);
    match err {
        ProviderError::RetriesExhausted {
            endpoint,
            attempts,
            last_error,
        } => {
            assert_eq!(endpoint, FIRST);
            assert_eq!(attempts, 4);
            assert!(matches!(*last_error, ProviderError::RateLimited { .. }));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_two_failures_then_success_makes_three_attempts() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail(FIRST, transient())
        .fail(FIRST, rate_limited())
        .respond(FIRST, RawPage::new(vec![json!({"id": "only"})]));

    let iterator = ResourceIterator::new(RetryPolicy::immediate(5));
    let mut delivered = Vec::new();
    let stats = iterator
        .for_each(&source(&transport), |item: Value| {
            delivered.push(item);
            async { Ok::<(), ProviderError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(transport.call_count(FIRST), 3);
    assert_eq!(stats.requests, 3);
    assert_eq!(delivered, vec![json!({"id": "only"})]);
}

#[tokio::test]
async fn test_retry_ceiling_applies_to_continuation_pages() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond(FIRST, RawPage::new(vec![json!({"id": 1})]).with_next_link(&page_url(2)))
        .fail_forever(&page_url(2), transient());

    let iterator = ResourceIterator::new(RetryPolicy::immediate(3));
    let mut delivered = 0;
    let err = iterator
        .for_each(&source(&transport), |_item: Value| {
            delivered += 1;
            async { Ok::<(), ProviderError>(()) }
        })
        .await
        .unwrap_err();

    assert_eq!(delivered, 1);
    assert_eq!(transport.call_count(&page_url(2)), 3);
    assert_eq!(err.endpoint(), Some(page_url(2).as_str()));
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail_forever(
        FIRST,
        ProviderError::PermissionDenied {
            endpoint: FIRST.into(),
            status: 403,
            message: "AuthorizationFailed".into(),
        },
    );

    let iterator = ResourceIterator::new(RetryPolicy::immediate(5));
    let err = iterator
        .for_each(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap_err();

    assert_eq!(transport.call_count(FIRST), 1);
    assert!(err.is_permission_denied());
    assert_eq!(err.endpoint(), Some(FIRST));
}

#[tokio::test]
async fn test_not_found_distinguished_from_permission_denied() {
    let transport = Arc::new(ScriptedTransport::new());
    let iterator = ResourceIterator::new(RetryPolicy::immediate(5));

    let required = iterator
        .for_each(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap_err();
    assert!(required.is_not_found());
    assert!(!required.is_permission_denied());

    let optional = iterator
        .for_each_optional(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap();
    assert!(optional.is_none());
    assert_eq!(transport.call_count(FIRST), 2);
}

#[tokio::test]
async fn test_callback_error_stops_iteration() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond(
            FIRST,
            RawPage::new(vec![json!({"id": 1}), json!({"id": 2})]).with_next_link(&page_url(2)),
        )
        .respond(&page_url(2), RawPage::new(vec![json!({"id": 3})]));

    #[derive(Debug)]
    enum SinkError {
        Rejected,
        Provider(ProviderError),
    }
    impl From<ProviderError> for SinkError {
        fn from(e: ProviderError) -> Self {
            SinkError::Provider(e)
        }
    }

    let iterator = ResourceIterator::new(RetryPolicy::immediate(3));
    let err = iterator
        .for_each(&source(&transport), |item: Value| {
            let reject = item["id"] == json!(1);
            async move {
                if reject {
                    Err(SinkError::Rejected)
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SinkError::Rejected));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_honours_retry_after_hint() {
    tokio::time::pause();

    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail(
            FIRST,
            ProviderError::RateLimited {
                endpoint: FIRST.into(),
                retry_after: Some(Duration::from_secs(7)),
            },
        )
        .respond(FIRST, RawPage::new(vec![json!({"id": 1})]));

    let policy = RetryPolicy {
        rate_limit_cooldown: Duration::from_secs(60),
        ..RetryPolicy::default()
    };
    let iterator = ResourceIterator::new(policy);

    let started = tokio::time::Instant::now();
    iterator
        .for_each(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap();
    let waited = started.elapsed();

    assert!(waited >= Duration::from_secs(7));
    assert!(waited < Duration::from_secs(60));
}

#[tokio::test]
async fn test_tracker_names_in_flight_endpoint() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail_forever(FIRST, transient());

    let tracker = EndpointTracker::new();
    let iterator = ResourceIterator::new(RetryPolicy::immediate(2)).with_tracker(tracker.clone());
    let _ = iterator
        .for_each(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await;
    assert_eq!(tracker.current().as_deref(), Some(FIRST));

    tracker.clear();
    transport.respond(&page_url(9), RawPage::new(vec![]));
    let ok_source = TransportPageSource::<Value>::new(transport.clone(), page_url(9));
    iterator
        .for_each(&ok_source, |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap();
    assert!(tracker.current().is_none());
}

#[tokio::test]
async fn test_nested_walk_hands_tracker_back_to_parent() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(FIRST, RawPage::new(vec![json!({"id": 1}), json!({"id": 2})]));
    transport.respond_forever(&page_url(9), RawPage::new(vec![json!({"id": "child"})]));

    let tracker = EndpointTracker::new();
    let iterator = ResourceIterator::new(RetryPolicy::immediate(2)).with_tracker(tracker.clone());
    let observed = Arc::new(Mutex::new(Vec::new()));

    iterator
        .for_each(&source(&transport), |_parent: Value| {
            let iterator = iterator.clone();
            let tracker = tracker.clone();
            let observed = Arc::clone(&observed);
            let dyn_transport: Arc<dyn Transport> = transport.clone();
            let children = TransportPageSource::<Value>::new(dyn_transport, page_url(9));
            async move {
                iterator
                    .for_each(&children, |_child: Value| async { Ok::<(), ProviderError>(()) })
                    .await?;
                observed.lock().unwrap().push(tracker.current());
                Ok::<(), ProviderError>(())
            }
        })
        .await
        .unwrap();

    let observed = observed.lock().unwrap().clone();
    assert_eq!(observed, vec![Some(FIRST.to_string()), Some(FIRST.to_string())]);
    assert!(tracker.current().is_none());
}

#[tokio::test]
async fn test_oversized_retry_after_hint_is_capped() {
    tokio::time::pause();

    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail(
            FIRST,
            ProviderError::RateLimited {
                endpoint: FIRST.into(),
                retry_after: Some(Duration::from_secs(86_400)),
            },
        )
        .respond(FIRST, RawPage::new(vec![json!({"id": 1})]));

    let iterator = ResourceIterator::new(RetryPolicy::default());
    let started = tokio::time::Instant::now();
    iterator
        .for_each(&source(&transport), |_item: Value| async { Ok::<(), ProviderError>(()) })
        .await
        .unwrap();

    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(30));
    assert!(waited < Duration::from_secs(31));
}
