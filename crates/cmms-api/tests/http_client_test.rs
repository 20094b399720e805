// Integration tests for `HttpClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cmms_api::{AuthScheme, Credentials, Error, HttpClient, Transport, unwrap_list};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let client = HttpClient::with_client(reqwest::Client::new(), base).with_credentials(
        Credentials::new(SecretString::from("s3cret".to_owned()), AuthScheme::Token),
    );
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_token_header_and_unwraps_envelope() {
    let (server, client) = setup().await;

    let body = json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            { "idfaena": 1, "nombrefaena": "Faena Norte" },
            { "idfaena": 2, "nombrefaena": "Faena Sur" },
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/faenas/"))
        .and(header("Authorization", "Token s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.get("faenas/", &[]).await.unwrap();
    let items: Vec<Value> = unwrap_list(payload).unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["nombrefaena"], "Faena Sur");
}

#[tokio::test]
async fn test_get_with_query_and_bare_array() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/equipos/"))
        .and(query_param("idfaena", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "idequipo": 0 }])))
        .mount(&server)
        .await;

    let payload = client
        .get("equipos/", &[("idfaena".into(), "3".into())])
        .await
        .unwrap();
    let items: Vec<Value> = unwrap_list(payload).unwrap();

    assert_eq!(items, vec![json!({ "idequipo": 0 })]);
}

#[tokio::test]
async fn test_bearer_scheme() {
    let server = MockServer::start().await;
    let client = HttpClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
        .with_credentials(Credentials::new(
            SecretString::from("jwt-token".to_owned()),
            AuthScheme::Bearer,
        ));

    Mock::given(method("GET"))
        .and(path("/tipos-tarea/"))
        .and(header("Authorization", "Bearer jwt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(client.get("/tipos-tarea/", &[]).await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_post_and_put_send_json_bodies() {
    let (server, client) = setup().await;

    let payload = json!({ "nombretipo": "Camión" });

    Mock::given(method("POST"))
        .and(path("/api/tipos-equipo/"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "idtipoequipo": 7, "nombretipo": "Camión" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/tipos-equipo/7/"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "idtipoequipo": 7, "nombretipo": "Camión" })),
        )
        .mount(&server)
        .await;

    let created = client.post("tipos-equipo/", &payload).await.unwrap();
    assert_eq!(created["idtipoequipo"], 7);

    let updated = client.put("tipos-equipo/7/", &payload).await.unwrap();
    assert_eq!(updated["nombretipo"], "Camión");
}

#[tokio::test]
async fn test_delete_with_empty_body_is_null() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/faenas/4/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert_eq!(client.delete("faenas/4/").await.unwrap(), Value::Null);
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/faenas/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Invalid token." })),
        )
        .mount(&server)
        .await;

    assert!(client.is_authenticated());
    let err = client.get("faenas/", &[]).await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(err.is_auth_expired());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_validation_errors_keep_the_body() {
    let (server, client) = setup().await;

    let errors = json!({ "nombrefaena": ["This field is required."] });

    Mock::given(method("POST"))
        .and(path("/api/faenas/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(&errors))
        .mount(&server)
        .await;

    let err = client.post("faenas/", &json!({})).await.unwrap_err();

    match &err {
        Error::Api { status, message, body } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "Bad Request");
            assert_eq!(body.as_ref(), Some(&errors));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_detail_message_is_preferred() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/faenas/9/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let err = client.delete("faenas/9/").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("Not found."));
}

#[tokio::test]
async fn test_non_json_success_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/faenas/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.get("faenas/", &[]).await.unwrap_err();

    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("oops")),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/faenas/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.get("faenas/", &[]).await.unwrap_err();
    assert!(err.is_transient());
}
