//! End-to-end bulk operation scenarios against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use hypothesis_client::{
    Annotation, ClientConfig, ClientError, GroupUpdate, HypothesisClient, InMemoryTransport,
    NewGroup, Progress, SearchQuery, SortField, SortOrder,
};
use serde_json::json;
use tokio::time::Instant;

const USER: &str = "acct:e2e@hypothes.is";

fn setup(config: ClientConfig) -> (HypothesisClient, Arc<InMemoryTransport>) {
    let store = Arc::new(InMemoryTransport::new(USER));
    let client = HypothesisClient::with_transport(store.clone(), Some("token".to_string()), config)
        .unwrap()
        .with_base_uri("https://annotations.example.org/api/")
        .unwrap();
    (client, store)
}

fn identical_payloads(count: usize) -> Vec<Annotation> {
    vec![
        Annotation::new("__world__")
            .with_field("uri", json!("https://example.com/paper"))
            .with_field("text", json!("Same note"))
            .with_field("tags", json!(["e2e"]));
        count
    ]
}

#[tokio::test(start_paused = true)]
async fn parallel_create_then_delete() {
    let (client, store) = setup(ClientConfig::default());

    let created = client.create_annotations(identical_payloads(5)).await.unwrap();
    let ids: Vec<String> = created.iter().filter_map(|a| a.id.clone()).collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 5);

    let deleted = client.delete_annotations(&ids).await.unwrap();
    assert!(deleted.iter().all(|d| d.deleted));
    assert_eq!(store.annotation_count().await, 0);

    assert!(store
        .requests()
        .await
        .iter()
        .all(|r| r.url.starts_with("https://annotations.example.org/api/")));
}

#[tokio::test(start_paused = true)]
async fn sequential_create_reports_monotonic_progress() {
    let mut config = ClientConfig::default();
    config.create.max_parallel = 1;
    let (client, store) = setup(config);

    let progress = Progress::new();
    let observer = progress.clone();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while !observer.is_complete() {
            seen.push(observer.current());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        seen.push(observer.current());
        seen
    });

    let created = client
        .create_annotations_with_progress(identical_payloads(5), &progress)
        .await
        .unwrap();
    let seen = watcher.await.unwrap();

    assert_eq!(created.len(), 5);
    assert_eq!(store.annotation_count().await, 5);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&5));
    assert_eq!(progress.max(), 5);
}

#[tokio::test]
async fn search_500_over_larger_corpus() {
    let (client, store) = setup(ClientConfig::default());
    store.seed_many(700, "g1").await;

    let rows = client
        .search_annotations(&SearchQuery::new().group("g1").with_limit(500))
        .await
        .unwrap();

    assert_eq!(rows.len(), 500);
    let searches = store.requests_for("search").await;
    assert_eq!(searches.len(), 3);
    assert!(searches.iter().all(|r| r
        .query_value("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .is_some_and(|l| l <= 200)));
}

#[tokio::test(start_paused = true)]
async fn sequential_search_is_fully_ordered() {
    let (client, store) = setup(ClientConfig::default());
    store.seed_many(610, "g1").await;

    let rows = client
        .search_annotations_sequential(
            &SearchQuery::new()
                .group("g1")
                .sorted_by(SortField::Updated, SortOrder::Asc),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 610);
    assert!(rows.windows(2).all(|w| w[0].updated <= w[1].updated));
    assert_eq!(store.requests_for("search").await.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn failing_transport_exhausts_retries() {
    let mut config = ClientConfig::default();
    config.search.max_retries = 3;
    config.search.retry_interval_seconds = 10;
    let (client, store) = setup(config);
    store.fail_always(true).await;

    let start = Instant::now();
    let err = client
        .search_annotations(&SearchQuery::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RetriesExhausted { limit: 3, .. }));
    assert_eq!(store.request_count().await, 4);
    assert_eq!(start.elapsed(), Duration::from_secs(30));
}

#[tokio::test]
async fn empty_batch_issues_no_requests() {
    let (client, store) = setup(ClientConfig::default());

    let err = client.create_annotations(Vec::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn silently_dropped_writes_are_recovered() {
    let (client, store) = setup(ClientConfig::default());
    store.drop_next_creates(3).await;

    let created = client.create_annotations(identical_payloads(8)).await.unwrap();

    assert_eq!(created.len(), 8);
    let stored: HashSet<_> = store
        .annotations()
        .await
        .into_iter()
        .filter_map(|a| a.id)
        .collect();
    assert!(created
        .iter()
        .all(|a| a.id.as_ref().is_some_and(|id| stored.contains(id))));
    assert_eq!(stored.len(), 8);
}

#[tokio::test]
async fn group_management_flow() {
    let (client, _) = setup(ClientConfig::default());

    let profile = client.get_user_profile().await.unwrap();
    assert_eq!(profile.userid.as_deref(), Some(USER));

    let group = client.create_group(&NewGroup::new("Seminar")).await.unwrap();
    let updated = client
        .update_group(
            &group.id,
            &GroupUpdate {
                name: None,
                description: Some("Spring term".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Spring term"));

    let annotation = client
        .create_annotation(&Annotation::new(group.id.clone()).with_field("text", json!("hi")))
        .await
        .unwrap();
    let id = annotation.id.clone().unwrap();
    assert_eq!(client.fetch_annotation(&id).await.unwrap(), annotation);

    client.leave_group(&group.id).await.unwrap();
    let remaining = client.list_groups().await.unwrap();
    assert!(remaining.iter().all(|g| g.is_public()));
}
