// End-to-end tests of `Console` over real HTTP (wiremock).

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cmms_core::{
    AuthScheme, ColumnDescriptor, Console, ConsoleConfig, Entity, FieldDescriptor, ListView,
    OptionsSource, PrimaryKey, Record, ResourceEndpoint, ScreenConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Faena {
    idfaena: i64,
    nombrefaena: String,
    #[serde(default)]
    activa: bool,
}

impl Entity for Faena {}

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Console) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let mut config = ConsoleConfig::new(base)
        .with_token(SecretString::from("t0ken".to_owned()), AuthScheme::Token);
    config.debounce = Duration::from_millis(40);
    (server, Console::connect(config).unwrap())
}

async fn mount_faenas(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/faenas/"))
        .and(header("Authorization", "Token t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "idfaena": 1, "nombrefaena": "Norte", "activa": true },
                { "idfaena": 2, "nombrefaena": "Sur" },
            ]
        })))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_typed_resource_round_trip() {
    let (server, console) = setup().await;
    mount_faenas(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/faenas/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idfaena": 2, "nombrefaena": "Sur Alto", "activa": true
        })))
        .mount(&server)
        .await;

    let faenas = console.resource::<Faena>(ResourceEndpoint::new("faenas", "idfaena"));
    faenas.fetch_all().await.unwrap();
    assert_eq!(faenas.items().len(), 2);
    assert!(!faenas.items()[1].activa);

    faenas
        .update(&PrimaryKey::Int(2), &json!({ "nombrefaena": "Sur Alto" }))
        .await
        .unwrap();
    assert_eq!(
        faenas.get(&PrimaryKey::Int(2)),
        Some(Faena {
            idfaena: 2,
            nombrefaena: "Sur Alto".into(),
            activa: true,
        })
    );
}

#[tokio::test]
async fn test_debounced_query_coalesces_triggers() {
    let (server, console) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/equipos/"))
        .and(query_param("idfaena", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "idequipo": 10, "codigoequipo": "CEX-10" }
        ])))
        .mount(&server)
        .await;

    let query = console.query::<Record>("equipos", vec![("idfaena".into(), "1".into())]);
    let mut updates = query.subscribe();
    for _ in 0..5 {
        query.trigger();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match updates.changed().await {
                Some(state) if state.data.is_some() && !state.loading => break state,
                Some(_) => {}
                None => panic!("controller went away"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(settled.data.unwrap()[0]["codigoequipo"], "CEX-10");
    assert_eq!(requests_to(&server, "/api/equipos/").await, 1);

    // A second trigger inside the ttl answers from the cache.
    query.trigger();
    assert_eq!(query.state().data.as_ref().map(Vec::len), Some(1));
    assert_eq!(requests_to(&server, "/api/equipos/").await, 1);
}

#[tokio::test]
async fn test_screen_shares_cache_with_resources() {
    let (server, console) = setup().await;
    mount_faenas(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/equipos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "idequipo": 0, "codigoequipo": "CEX-01", "nombrefaena": "Norte" }
        ])))
        .mount(&server)
        .await;

    let config = ScreenConfig::<Record>::new("Equipos", ResourceEndpoint::new("equipos", "idequipo"))
        .column(ColumnDescriptor::field("Código", "codigoequipo"))
        .column(ColumnDescriptor::field("Faena", "nombrefaena"))
        .field(FieldDescriptor::select(
            "idfaena",
            "Faena",
            OptionsSource::new("faenas", "idfaena", "nombrefaena"),
        ));
    let mut screen = console.screen(config);
    screen.enter().await.unwrap();

    match screen.view() {
        ListView::Table(table) => assert_eq!(table.rows[0].cells, vec!["CEX-01", "Norte"]),
        other => panic!("expected a table, got {other:?}"),
    }
    assert_eq!(screen.options_for("idfaena").len(), 2);

    // The faenas list read by the options is reused by a resource controller.
    let faenas = console.resource::<Record>(ResourceEndpoint::new("faenas", "idfaena"));
    faenas.load().await.unwrap();
    assert_eq!(faenas.items().len(), 2);
    assert_eq!(requests_to(&server, "/api/faenas/").await, 1);

    console.invalidate_all();
    faenas.load().await.unwrap();
    assert_eq!(requests_to(&server, "/api/faenas/").await, 2);
}
