//! Integration tests for the reader half of `EventRepository`.

mod common;

use everstream_core::error::EventStoreError;
use everstream_core::event::RecordedEvent;
use everstream_core::record::NewRecord;
use everstream_core::specification::Specification;
use everstream_core::store::RecordStore;
use everstream_core::stream::{GLOBAL_STREAM_NAME, Stream};
use everstream_core::version::ExpectedVersion;
use everstream_test_support::TestEvent;

use common::{event, repository};

fn ids(events: &[RecordedEvent]) -> Vec<&str> {
    events.iter().map(|e| e.event_id.as_str()).collect()
}

async fn seed_orders(repo: &everstream_store::EventRepository, ids: &[&str]) {
    for id in ids {
        repo.append_to_stream(vec![event(id)], &Stream::named("orders"), ExpectedVersion::Auto)
            .await
            .unwrap();
    }
}

// --- ordering ---

#[tokio::test]
async fn test_order_follows_insertion_not_event_id_values() {
    let (repo, _) = repository();
    // Ids deliberately out of lexicographic order.
    seed_orders(&repo, &["2", "1", "3"]).await;

    let forward = repo.read(&Specification::stream("orders")).await.unwrap();
    let backward = repo
        .read(&Specification::stream("orders").backward())
        .await
        .unwrap();

    assert_eq!(ids(&forward), vec!["2", "1", "3"]);
    assert_eq!(ids(&backward), vec!["3", "1", "2"]);
}

#[tokio::test]
async fn test_limit_truncates_after_ordering() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    let head = repo
        .read(&Specification::stream("orders").limit(1))
        .await
        .unwrap();
    let tail = repo
        .read(&Specification::stream("orders").backward().limit(2))
        .await
        .unwrap();

    assert_eq!(ids(&head), vec!["e0"]);
    assert_eq!(ids(&tail), vec!["e2", "e1"]);
}

// --- exclusive bounds ---

#[tokio::test]
async fn test_start_bound_is_exclusive_in_both_directions() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    let from_e0 = repo
        .read(&Specification::stream("orders").from("e0"))
        .await
        .unwrap();
    let from_e1_backward = repo
        .read(&Specification::stream("orders").backward().from("e1"))
        .await
        .unwrap();

    assert_eq!(ids(&from_e0), vec!["e1", "e2"]);
    assert_eq!(ids(&from_e1_backward), vec!["e0"]);
}

#[tokio::test]
async fn test_stop_bound_is_exclusive() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    let to_e2 = repo
        .read(&Specification::stream("orders").to("e2"))
        .await
        .unwrap();

    assert_eq!(ids(&to_e2), vec!["e0", "e1"]);
}

#[tokio::test]
async fn test_bound_on_an_unknown_event_is_event_not_found() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0"]).await;

    let result = repo
        .read(&Specification::stream("orders").from("missing"))
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::EventNotFound(id)) if id == "missing"
    ));
}

// --- filters ---

#[tokio::test]
async fn test_id_and_type_filters_narrow_the_scope() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    let by_id = repo
        .read(
            &Specification::stream("orders")
                .with_ids(vec!["e1".to_owned(), "e2".to_owned()]),
        )
        .await
        .unwrap();
    let by_type = repo
        .read(&Specification::stream("orders").of_types(vec!["nope".to_owned()]))
        .await
        .unwrap();

    assert_eq!(ids(&by_id), vec!["e1", "e2"]);
    assert!(by_type.is_empty());
}

// --- count ---

#[tokio::test]
async fn test_count_matches_the_scope_and_honors_limit() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    assert_eq!(repo.count(&Specification::stream("orders")).await.unwrap(), 3);
    assert_eq!(
        repo.count(&Specification::stream("orders").limit(2))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        repo.count(&Specification::stream("orders").from("e0"))
            .await
            .unwrap(),
        2
    );
}

// --- reserved internal name ---

#[tokio::test]
async fn test_reading_or_counting_the_reserved_name_always_fails() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0"]).await;

    let variants = [
        Specification::stream(GLOBAL_STREAM_NAME),
        Specification::stream(GLOBAL_STREAM_NAME).backward(),
        Specification::stream(GLOBAL_STREAM_NAME).limit(5),
        Specification::stream(GLOBAL_STREAM_NAME).limit(5).backward(),
    ];
    for spec in variants {
        assert!(matches!(
            repo.read(&spec).await,
            Err(EventStoreError::ReservedInternalName(_))
        ));
        assert!(matches!(
            repo.count(&spec).await,
            Err(EventStoreError::ReservedInternalName(_))
        ));
    }
}

// --- global feed ---

#[tokio::test]
async fn test_global_feed_sees_every_append_in_order() {
    let (repo, _) = repository();

    repo.append_to_stream(vec![event("a0")], &Stream::named("a"), ExpectedVersion::Auto)
        .await
        .unwrap();
    repo.append_to_stream(vec![event("b0")], &Stream::named("b"), ExpectedVersion::Auto)
        .await
        .unwrap();
    repo.append_to_stream(vec![event("a1")], &Stream::named("a"), ExpectedVersion::Exact(0))
        .await
        .unwrap();

    let feed = repo.read(&Specification::global()).await.unwrap();
    let first = repo.read(&Specification::global().limit(1)).await.unwrap();

    assert_eq!(ids(&feed), vec!["a0", "b0", "a1"]);
    assert_eq!(ids(&first), vec!["a0"]);
}

#[tokio::test]
async fn test_global_feed_bounds_compare_on_insertion_time() {
    let (repo, _) = repository();

    repo.append_to_stream(vec![event("a0")], &Stream::named("a"), ExpectedVersion::Auto)
        .await
        .unwrap();
    repo.append_to_stream(vec![event("b0")], &Stream::named("b"), ExpectedVersion::Auto)
        .await
        .unwrap();
    repo.append_to_stream(vec![event("c0")], &Stream::named("c"), ExpectedVersion::Auto)
        .await
        .unwrap();

    let after_a0 = repo.read_all_streams_forward(Some("a0"), 10).await.unwrap();
    let before_c0_backward = repo.read_all_streams_backward(Some("c0"), 10).await.unwrap();

    assert_eq!(ids(&after_a0), vec!["b0", "c0"]);
    assert_eq!(ids(&before_c0_backward), vec!["b0", "a0"]);
}

// --- first / last ---

#[tokio::test]
async fn test_read_first_and_read_last_resolve_against_the_scope_order() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2"]).await;

    let reader = repo.reader();
    let spec = Specification::stream("orders");

    let first = reader.read_first(&spec).await.unwrap().unwrap();
    let last = reader.read_last(&spec).await.unwrap().unwrap();
    // With a limit, "last" is the tail of the truncated window.
    let last_of_window = reader
        .read_last(&spec.clone().limit(2))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.event_id, "e0");
    assert_eq!(last.event_id, "e2");
    assert_eq!(last_of_window.event_id, "e1");
}

#[tokio::test]
async fn test_read_first_on_an_empty_scope_is_none() {
    let (repo, _) = repository();

    let first = repo
        .reader()
        .read_first(&Specification::stream("ghost"))
        .await
        .unwrap();

    assert!(first.is_none());
}

// --- batched reads ---

#[tokio::test]
async fn test_batched_read_pages_through_the_scope() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2", "e3", "e4"]).await;

    let mut batches = repo
        .read_in_batches(&Specification::stream("orders").in_batches(2))
        .await
        .unwrap();

    let mut pages = Vec::new();
    while let Some(page) = batches.next_page().await.unwrap() {
        pages.push(ids(&page).iter().map(ToString::to_string).collect::<Vec<_>>());
    }

    assert_eq!(
        pages,
        vec![
            vec!["e0".to_owned(), "e1".to_owned()],
            vec!["e2".to_owned(), "e3".to_owned()],
            vec!["e4".to_owned()],
        ]
    );
}

#[tokio::test]
async fn test_batched_read_respects_the_overall_limit() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2", "e3", "e4"]).await;

    let batches = repo
        .read_in_batches(&Specification::stream("orders").in_batches(2).limit(3))
        .await
        .unwrap();
    let all = batches.collect_all().await.unwrap();

    assert_eq!(ids(&all), vec!["e0", "e1", "e2"]);
}

// --- reconstruction ---

#[tokio::test]
async fn test_events_reconstruct_through_the_registry() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0"]).await;

    let events = repo.read_stream_events_forward("orders").await.unwrap();

    let test_event = events[0].downcast_ref::<TestEvent>().unwrap();
    assert_eq!(test_event.label, "e0");
}

#[tokio::test]
async fn test_an_unregistered_event_type_is_a_caller_visible_error() {
    let (repo, store) = repository();
    store
        .insert_many(vec![NewRecord {
            stream: "orders".to_owned(),
            event_id: "e0".to_owned(),
            event_type: "unregistered.type".to_owned(),
            data: serde_json::json!({}),
            metadata: serde_json::json!({}),
            position: Some(1),
        }])
        .await
        .unwrap();

    let result = repo.read_stream_events_forward("orders").await;

    assert!(matches!(
        result,
        Err(EventStoreError::UnknownEventType(tag)) if tag == "unregistered.type"
    ));
}

// --- directional convenience readers ---

#[tokio::test]
async fn test_windowed_directional_reads() {
    let (repo, _) = repository();
    seed_orders(&repo, &["e0", "e1", "e2", "e3"]).await;

    let forward = repo
        .read_events_forward("orders", Some("e0"), 2)
        .await
        .unwrap();
    let backward = repo
        .read_events_backward("orders", Some("e3"), 2)
        .await
        .unwrap();
    let from_head = repo.read_events_forward("orders", None, 2).await.unwrap();

    assert_eq!(ids(&forward), vec!["e1", "e2"]);
    assert_eq!(ids(&backward), vec!["e2", "e1"]);
    assert_eq!(ids(&from_head), vec!["e0", "e1"]);
}
