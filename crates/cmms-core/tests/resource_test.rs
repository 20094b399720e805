// Integration tests for `ResourceController` against a scripted transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use cmms_core::{CoreError, ExpiringCache, PrimaryKey, Record, ResourceController, ResourceEndpoint};

use common::{MockTransport, Reply};

// ── Helpers ─────────────────────────────────────────────────────────

fn setup(endpoint: &str, pk: &str) -> (Arc<MockTransport>, Arc<ExpiringCache>, ResourceController<Record>) {
    setup_with_ttl(endpoint, pk, None)
}

fn setup_with_ttl(
    endpoint: &str,
    pk: &str,
    ttl: Option<Duration>,
) -> (Arc<MockTransport>, Arc<ExpiringCache>, ResourceController<Record>) {
    let transport = MockTransport::new();
    let cache = Arc::new(ExpiringCache::new());
    let resource = ResourceController::new(
        ResourceEndpoint::new(endpoint, pk),
        transport.clone(),
        Arc::clone(&cache),
        ttl,
    );
    (transport, cache, resource)
}

fn items_json(resource: &ResourceController<Record>) -> Value {
    Value::Array(resource.items().into_iter().map(Value::Object).collect())
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_all_unwraps_paginated_envelope() {
    let (transport, _, resource) = setup("/faenas/", "idfaena");
    transport.on(
        "GET",
        "faenas/",
        Reply::ok(json!({
            "count": 2,
            "results": [
                { "idfaena": 1, "nombrefaena": "Norte" },
                { "idfaena": 2, "nombrefaena": "Sur" },
            ]
        })),
    );

    resource.fetch_all().await.unwrap();

    let state = resource.state();
    assert_eq!(state.items.len(), 2);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_fetch_all_accepts_bare_arrays_and_drops_duplicate_keys() {
    let (transport, _, resource) = setup("equipos", "idequipo");
    transport.on(
        "GET",
        "equipos/",
        Reply::ok(json!([
            { "idequipo": 0, "nombre": "Pala" },
            { "idequipo": 0, "nombre": "Pala (dup)" },
            { "idequipo": 1, "nombre": "Camión" },
        ])),
    );

    resource.fetch_all().await.unwrap();

    assert_eq!(
        items_json(&resource),
        json!([
            { "idequipo": 0, "nombre": "Pala" },
            { "idequipo": 1, "nombre": "Camión" },
        ])
    );
}

#[tokio::test]
async fn test_fetch_failure_keeps_items_and_records_error() {
    let (transport, _, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }])))
        .on("GET", "faenas/", Reply::status(500, json!({ "detail": "Server exploded" })));

    resource.fetch_all().await.unwrap();
    let err = resource.fetch_all().await.unwrap_err();

    assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    let state = resource.state();
    assert_eq!(state.items.len(), 1);
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("API error: Server exploded"));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_fetches_apply_only_the_latest() {
    let (transport, _, resource) = setup("equipos", "idequipo");
    transport
        .on("GET", "equipos/", Reply::ok(json!([{ "idequipo": 1 }])).after(200))
        .on(
            "GET",
            "equipos/",
            Reply::ok(json!([{ "idequipo": 1 }, { "idequipo": 2 }])).after(50),
        );

    let (first, second) = tokio::join!(resource.fetch_all(), resource.fetch_all());
    first.unwrap();
    second.unwrap();

    assert_eq!(resource.items().len(), 2);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(resource.items().len(), 2);
    assert!(!resource.state().loading);
}

#[tokio::test(start_paused = true)]
async fn test_load_uses_cache_until_ttl_expires() {
    let (transport, _, resource) =
        setup_with_ttl("faenas", "idfaena", Some(Duration::from_millis(100)));
    transport.on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }])));

    resource.load().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    resource.load().await.unwrap();
    assert_eq!(transport.count("GET", "faenas/"), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    resource.load().await.unwrap();
    assert_eq!(transport.count("GET", "faenas/"), 2);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_appends_server_item() {
    let (transport, _, resource) = setup("tipos-tarea", "idtipotarea");
    transport
        .on("GET", "tipos-tarea/", Reply::ok(json!([{ "idtipotarea": 1, "nombretipotarea": "Preventiva" }])))
        .on(
            "POST",
            "tipos-tarea/",
            Reply::ok(json!({ "idtipotarea": 2, "nombretipotarea": "Correctiva" })),
        );

    resource.fetch_all().await.unwrap();
    let created = resource
        .create(&json!({ "nombretipotarea": "Correctiva" }))
        .await
        .unwrap();

    assert_eq!(created.get("idtipotarea"), Some(&json!(2)));
    assert_eq!(resource.items().len(), 2);
    assert_eq!(
        transport.last_body("POST", "tipos-tarea/"),
        Some(json!({ "nombretipotarea": "Correctiva" }))
    );
}

#[tokio::test]
async fn test_update_replaces_in_place() {
    let (transport, _, resource) = setup("tipos-equipo", "id");
    transport
        .on("GET", "tipos-equipo/", Reply::ok(json!([
            { "id": 1, "name": "A" },
            { "id": 2, "name": "B" },
        ])))
        .on("PUT", "tipos-equipo/1/", Reply::ok(json!({ "id": 1, "name": "Z" })));

    resource.fetch_all().await.unwrap();
    resource
        .update(&PrimaryKey::Int(1), &json!({ "name": "Z" }))
        .await
        .unwrap();

    assert_eq!(
        items_json(&resource),
        json!([{ "id": 1, "name": "Z" }, { "id": 2, "name": "B" }])
    );
}

#[tokio::test]
async fn test_remove_waits_for_server_confirmation() {
    let (transport, _, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 0 }, { "idfaena": 5 }])))
        .on("DELETE", "faenas/5/", Reply::status(409, json!({ "detail": "In use." })))
        .on("DELETE", "faenas/0/", Reply::ok(Value::Null));

    resource.fetch_all().await.unwrap();

    let err = resource.remove(&PrimaryKey::Int(5)).await.unwrap_err();
    assert!(err.to_string().contains("In use."));
    assert_eq!(resource.items().len(), 2);
    assert!(resource.state().error.is_some());

    resource.remove(&PrimaryKey::Int(0)).await.unwrap();
    assert_eq!(items_json(&resource), json!([{ "idfaena": 5 }]));
}

#[tokio::test]
async fn test_create_validation_error_is_rethrown() {
    let (transport, _, resource) = setup("faenas", "idfaena");
    transport.on(
        "POST",
        "faenas/",
        Reply::status(400, json!({ "nombrefaena": ["This field is required."] })),
    );

    let err = resource.create(&json!({})).await.unwrap_err();

    assert_eq!(err.user_message(), "nombrefaena: This field is required.");
    assert!(resource.items().is_empty());
    assert_eq!(
        resource.state().error.as_deref(),
        Some("nombrefaena: This field is required.")
    );

    resource.clear_error();
    assert_eq!(resource.state().error, None);
}

#[tokio::test]
async fn test_mutations_invalidate_the_cached_list() {
    let (transport, cache, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([])))
        .on("POST", "faenas/", Reply::ok(json!({ "idfaena": 3 })));

    resource.load().await.unwrap();
    assert!(cache.contains(&resource.endpoint().cache_key()));

    resource.create(&json!({ "nombrefaena": "Oeste" })).await.unwrap();
    assert!(!cache.contains(&resource.endpoint().cache_key()));

    resource.load().await.unwrap();
    assert_eq!(transport.count("GET", "faenas/"), 2);
}

#[tokio::test]
async fn test_concurrent_mutations_see_latest_snapshot() {
    let (transport, _, resource) = setup("faenas", "idfaena");
    transport
        .on("POST", "faenas/", Reply::ok(json!({ "idfaena": 1 })).after(20))
        .on("POST", "faenas/", Reply::ok(json!({ "idfaena": 2 })).after(5));

    let body_a = json!({ "nombrefaena": "A" });
    let body_b = json!({ "nombrefaena": "B" });
    let (a, b) = tokio::join!(resource.create(&body_a), resource.create(&body_b),);
    a.unwrap();
    b.unwrap();

    let mut keys: Vec<Value> = resource
        .items()
        .iter()
        .filter_map(|r| r.get("idfaena").cloned())
        .collect();
    keys.sort_by_key(|v| v.as_i64());
    assert_eq!(keys, vec![json!(1), json!(2)]);
}

// ── Mutations racing reads ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_create_during_fetch_is_not_lost_or_cached_stale() {
    let (transport, cache, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }])).after(100))
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }, { "idfaena": 2 }])))
        .on("POST", "faenas/", Reply::ok(json!({ "idfaena": 2 })).after(10));

    let body = json!({ "nombrefaena": "Sur" });
    let (read, created) = tokio::join!(resource.fetch_all(), resource.create(&body),);
    read.unwrap();
    created.unwrap();

    assert!(resource.get(&PrimaryKey::Int(2)).is_some());
    assert_eq!(items_json(&resource), json!([{ "idfaena": 1 }, { "idfaena": 2 }]));
    assert_eq!(transport.count("GET", "faenas/"), 2);
    assert!(!resource.state().loading);

    let cached: Option<Vec<Record>> = cache.get(&resource.endpoint().cache_key());
    assert_eq!(cached.as_ref().map(Vec::len), Some(2));

    tokio::time::sleep(Duration::from_secs(1)).await;
    resource.load().await.unwrap();
    assert_eq!(transport.count("GET", "faenas/"), 2);
    assert_eq!(resource.items().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_during_fetch_is_not_reverted() {
    let (transport, _, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1, "nombrefaena": "Norte" }])))
        .on(
            "GET",
            "faenas/",
            Reply::ok(json!([{ "idfaena": 1, "nombrefaena": "Norte" }])).after(100),
        )
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1, "nombrefaena": "Sur" }])))
        .on(
            "PUT",
            "faenas/1/",
            Reply::ok(json!({ "idfaena": 1, "nombrefaena": "Sur" })).after(10),
        );

    resource.fetch_all().await.unwrap();
    let body = json!({ "nombrefaena": "Sur" });
    let (read, updated) = tokio::join!(
        resource.fetch_all(),
        resource.update(&PrimaryKey::Int(1), &body),
    );
    read.unwrap();
    updated.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(items_json(&resource), json!([{ "idfaena": 1, "nombrefaena": "Sur" }]));
    assert_eq!(transport.count("GET", "faenas/"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_remove_during_load_does_not_resurrect_the_item() {
    let (transport, cache, resource) = setup("faenas", "idfaena");
    transport
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }, { "idfaena": 2 }])).after(100))
        .on("GET", "faenas/", Reply::ok(json!([{ "idfaena": 1 }])))
        .on("DELETE", "faenas/2/", Reply::ok(Value::Null).after(10));

    let (read, removed) = tokio::join!(resource.load(), resource.remove(&PrimaryKey::Int(2)));
    read.unwrap();
    removed.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(resource.get(&PrimaryKey::Int(2)).is_none());
    assert_eq!(items_json(&resource), json!([{ "idfaena": 1 }]));

    let cached: Option<Vec<Record>> = cache.get(&resource.endpoint().cache_key());
    assert_eq!(cached.as_ref().map(Vec::len), Some(1));
}
