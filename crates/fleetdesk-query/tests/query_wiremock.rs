//! End-to-end tests for resource queries against a mocked backend

use fleetdesk_api::{ApiClient, FALLBACK_MESSAGE, HttpClientConfig, ResourceApi};
use fleetdesk_core::{Record, Resource};
use fleetdesk_query::{
    CacheConfig, ListParams, MemoryNotifier, NotificationLevel, QueryCache, QueryError, QueryKey,
    ResourceQuery,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

struct Harness {
    cache: QueryCache,
    notifier: Arc<MemoryNotifier>,
    api: ResourceApi,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        Self::with_config(
            server,
            CacheConfig {
                stale_time: Duration::from_secs(60),
                retry: 0,
                ..CacheConfig::default()
            },
        )
    }

    fn with_config(server: &MockServer, config: CacheConfig) -> Self {
        let client = ApiClient::new(server.uri(), &HttpClientConfig::default()).unwrap();
        Self {
            cache: QueryCache::new(config),
            notifier: Arc::new(MemoryNotifier::new()),
            api: ResourceApi::new(Arc::new(client)),
        }
    }

    fn query(&self, resource: Resource) -> ResourceQuery<Record> {
        ResourceQuery::new(
            resource,
            self.api.clone(),
            self.cache.clone(),
            self.notifier.clone(),
        )
    }
}

#[tokio::test]
async fn test_concurrent_lists_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vehicles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"_id": "v1", "regNo": "KA01"}]))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let a = harness.query(Resource::Vehicle);
    let b = harness.query(Resource::Vehicle);
    let c = harness.query(Resource::Vehicle);
    let params = ListParams::new();

    let (ra, rb, rc) = tokio::join!(a.list(&params), b.list(&params), c.list(&params));

    for result in [ra, rb, rc] {
        let data = result.data.unwrap();
        assert_eq!(data[0].get_str("regNo"), Some("KA01"));
    }
    assert_eq!(harness.cache.len(), 1);
}

#[tokio::test]
async fn test_missing_id_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let trips = harness.query(Resource::Trip);

    assert!(trips.get_by_id(None).await.is_idle());
    assert!(trips.get_by_id(Some("")).await.is_idle());
    assert!(trips.get_by_id(Some("   ")).await.is_idle());
    assert!(
        trips
            .sub_resource(None, "subtrips", &ListParams::new())
            .await
            .is_idle()
    );
    assert!(harness.cache.is_empty());
}

#[tokio::test]
async fn test_create_invalidates_lists_and_caches_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/trips"))
        .and(query_param("status", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/trips"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "t9", "status": "open"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let trips = harness.query(Resource::Trip);
    let open = ListParams::new().with("status", "open");

    assert!(trips.list(&open).await.data.unwrap().is_empty());
    // Fresh, so no second request yet
    assert!(trips.list(&open).await.is_success());

    let created = trips.create(&json!({"status": "open"})).await.unwrap();
    assert_eq!(created.id().as_deref(), Some("t9"));

    let list_key = QueryKey::list(Resource::Trip, "status=open");
    assert!(harness.cache.get(&list_key).unwrap().invalidated);
    let detail = harness.cache.get(&QueryKey::detail(Resource::Trip, "t9")).unwrap();
    assert_eq!(detail.data["status"], "open");

    // Invalidated list refetches
    trips.list(&open).await;

    let notes = harness.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Success);
    assert_eq!(notes[0].message, "Trip created");
}

#[tokio::test]
async fn test_update_patches_detail_and_invalidates_collections() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/trips/t1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"_id": "t1", "status": "closed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let trips = harness.query(Resource::Trip);
    let detail = QueryKey::detail(Resource::Trip, "t1");
    let other_detail = QueryKey::detail(Resource::Trip, "t2");
    let list = QueryKey::list(Resource::Trip, "status=open");
    let subtrips = QueryKey::sub(Resource::Trip, "t1", "subtrips", "");
    harness.cache.set(detail.clone(), json!({"_id": "t1", "status": "open"}));
    harness.cache.set(other_detail.clone(), json!({"_id": "t2", "status": "open"}));
    harness.cache.set(list.clone(), json!([{"_id": "t1", "status": "open"}]));
    harness.cache.set(subtrips.clone(), json!([]));

    let updated = trips.update("t1", &json!({"status": "closed"})).await.unwrap();
    assert_eq!(updated.get_str("status"), Some("closed"));

    let patched = harness.cache.get(&detail).unwrap();
    assert!(!patched.invalidated);
    assert_eq!(patched.data["status"], "closed");
    assert!(harness.cache.get(&list).unwrap().invalidated);
    assert!(harness.cache.get(&subtrips).unwrap().invalidated);
    assert!(!harness.cache.get(&other_detail).unwrap().invalidated);

    let notes = harness.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, "Trip updated");
}

#[tokio::test]
async fn test_failed_create_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/drivers"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Licence number is required"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let drivers = harness.query(Resource::Driver);
    harness.cache.set(QueryKey::list(Resource::Driver, ""), json!([{"_id": "d1"}]));
    harness.cache.set(QueryKey::detail(Resource::Driver, "d1"), json!({"_id": "d1"}));
    let before = harness.cache.snapshot();

    let err = drivers.create(&json!({"name": "Suresh"})).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(harness.cache.snapshot(), before);

    let notes = harness.notifier.take();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert_eq!(notes[0].message, "Licence number is required");
}

#[tokio::test]
async fn test_read_retries_transient_failure_with_default_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"_id": "c1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::with_config(&server, CacheConfig::default());
    assert_eq!(harness.cache.config().retry, 1);

    let result = harness
        .query(Resource::Customer)
        .list(&ListParams::new())
        .await;

    assert!(result.is_success());
    assert_eq!(result.data.unwrap()[0].id().as_deref(), Some("c1"));
    assert!(harness.notifier.notifications().is_empty());
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"_id": "i1"}])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/invoices/i1"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Invoice already paid"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/invoices/i1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let invoices = harness.query(Resource::Invoice);
    invoices.list(&ListParams::new()).await;
    let before = harness.cache.snapshot();

    let err = invoices
        .update("i1", &json!({"status": "draft"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));

    let err = invoices.delete("i1").await.unwrap_err();
    assert_eq!(err.user_message(), FALLBACK_MESSAGE);

    assert_eq!(harness.cache.snapshot(), before);

    let notes = harness.notifier.take();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
    assert_eq!(notes[0].message, "Invoice already paid");
    assert_eq!(notes[1].message, FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_delete_evicts_record_and_its_sub_resources() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/vehicles/v1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let vehicles = harness.query(Resource::Vehicle);
    harness.cache.set(QueryKey::detail(Resource::Vehicle, "v1"), json!({"_id": "v1"}));
    harness.cache.set(QueryKey::sub(Resource::Vehicle, "v1", "documents", ""), json!([]));
    harness.cache.set(QueryKey::sub(Resource::Vehicle, "v2", "documents", ""), json!([]));
    harness.cache.set(QueryKey::list(Resource::Vehicle, ""), json!([]));

    vehicles.delete("v1").await.unwrap();

    assert!(harness.cache.get(&QueryKey::detail(Resource::Vehicle, "v1")).is_none());
    assert!(
        harness
            .cache
            .get(&QueryKey::sub(Resource::Vehicle, "v1", "documents", ""))
            .is_none()
    );
    assert!(
        harness
            .cache
            .get(&QueryKey::sub(Resource::Vehicle, "v2", "documents", ""))
            .unwrap()
            .invalidated
    );
    assert!(harness.cache.get(&QueryKey::list(Resource::Vehicle, "")).unwrap().invalidated);
    assert_eq!(harness.notifier.notifications()[0].message, "Vehicle deleted");
}

#[tokio::test]
async fn test_blank_id_mutation_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let drivers = harness.query(Resource::Driver);

    assert_eq!(drivers.delete(" ").await, Err(QueryError::MissingId));
    assert_eq!(
        drivers.update("", &json!({})).await.unwrap_err(),
        QueryError::MissingId
    );
}

#[tokio::test]
async fn test_list_error_is_reported_in_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/parts"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Forbidden"})))
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let result = harness.query(Resource::Part).list(&ListParams::new()).await;

    assert!(result.is_error());
    assert_eq!(result.error.unwrap().user_message(), "Forbidden");
    assert!(harness.cache.is_empty());
    // Query failures are not toasted
    assert!(harness.notifier.notifications().is_empty());
}
