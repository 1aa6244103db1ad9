/// End-to-end checkout tests
/// Runs the pipeline and the HTTP routes against a mocked postal service
/// and in-process order stores
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_checkout_api::bin_client::BinlistClient;
use rust_checkout_api::card::CardBrand;
use rust_checkout_api::cep_client::{PostalLookup, ViaCepClient};
use rust_checkout_api::checkout::{CheckoutOptions, CheckoutPipeline};
use rust_checkout_api::errors::{CheckoutError, LookupError, StoreError};
use rust_checkout_api::handlers::{router, AppState};
use rust_checkout_api::models::{NewOrder, Order};
use rust_checkout_api::order_store::{InMemoryOrderStore, OrderStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Order store whose inserts always fail.
struct FailingStore(StoreError);

#[async_trait]
impl OrderStore for FailingStore {
    async fn insert_order(&self, _order: &NewOrder) -> Result<Order, StoreError> {
        Err(self.0.clone())
    }
}

async fn mock_cep_service() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ws/01001000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cep": "01001-000",
            "logradouro": "Praça da Sé",
            "bairro": "Sé",
            "localidade": "São Paulo",
            "uf": "SP"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ws/99999999/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"erro": true})))
        .mount(&server)
        .await;

    server
}

fn postal(server: &MockServer) -> Arc<dyn PostalLookup> {
    Arc::new(ViaCepClient::new(format!("{}/ws", server.uri()), Duration::from_secs(5)).unwrap())
}

fn valid_body() -> Value {
    json!({
        "card_number": "4111 1111 1111 1111",
        "card_holder": "Maria Silva",
        "expiration_date": "12/29",
        "cvv": "123",
        "cep": "01001-000",
        "number": "100"
    })
}

fn app(pipeline: CheckoutPipeline, postal: Arc<dyn PostalLookup>) -> Router {
    router(Arc::new(AppState {
        postal,
        pipeline: Arc::new(pipeline),
    }))
}

async fn post_json(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_approved_checkout_records_order() {
    let server = mock_cep_service().await;
    let store = InMemoryOrderStore::new();
    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default())
        .with_order_store(Arc::new(store.clone()));

    let approval = pipeline
        .process(valid_body().to_string().as_bytes())
        .await
        .unwrap();

    assert_eq!(approval.card_brand, CardBrand::Visa);
    assert_eq!(approval.order_id, Some(1));
    assert_eq!(approval.address.city, "São Paulo");

    let orders = store.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].card_holder, "Maria Silva");
    assert_eq!(orders[0].card_brand, "Visa");
    assert_eq!(orders[0].status, "APPROVED");
    assert_eq!(orders[0].address_line, "Praça da Sé, 100 - Sé. São Paulo - SP");
}

#[tokio::test]
async fn test_address_failure_wins_over_card_failure() {
    let server = mock_cep_service().await;
    let store = InMemoryOrderStore::new();
    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default())
        .with_order_store(Arc::new(store.clone()));

    let mut body = valid_body();
    body["cep"] = json!("99999-999");
    body["card_number"] = json!("123");

    let err = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::Address(LookupError::NotFound));
    assert!(store.orders().await.is_empty());
}

#[tokio::test]
async fn test_missing_number_rejected_before_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default());

    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("number");

    let err = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::MissingField("number"));
}

#[tokio::test]
async fn test_null_number_reported_as_missing_field() {
    let server = MockServer::start().await;
    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default());

    let mut body = valid_body();
    body["number"] = Value::Null;

    let err = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::MissingField("number"));
}

#[tokio::test]
async fn test_unknown_brand_rejected() {
    let server = mock_cep_service().await;
    let store = InMemoryOrderStore::new();
    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default())
        .with_order_store(Arc::new(store.clone()));

    let mut body = valid_body();
    body["card_number"] = json!("9999 9999 9999 9999");

    let err = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::CardBrandUnknown);
    assert!(store.orders().await.is_empty());
}

#[tokio::test]
async fn test_payment_fields_rejected_without_recording() {
    let server = mock_cep_service().await;
    let store = InMemoryOrderStore::new();
    let pipeline = CheckoutPipeline::new(postal(&server), CheckoutOptions::default())
        .with_order_store(Arc::new(store.clone()));

    let mut body = valid_body();
    body["cvv"] = json!("12");

    let err = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::PaymentFieldsInvalid);
    assert!(store.orders().await.is_empty());
}

#[tokio::test]
async fn test_persistence_disabled_approves_without_order_id() {
    let server = mock_cep_service().await;
    let options = CheckoutOptions {
        enable_persistence: false,
        ..Default::default()
    };
    let pipeline = CheckoutPipeline::new(postal(&server), options);

    let approval = pipeline
        .process(valid_body().to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(approval.order_id, None);
}

#[tokio::test]
async fn test_store_failure_kinds_are_distinct() {
    let server = mock_cep_service().await;

    let without_store = CheckoutPipeline::new(postal(&server), CheckoutOptions::default());
    let err = without_store
        .process(valid_body().to_string().as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::PersistenceUnavailable(_)));

    let failing = CheckoutPipeline::new(postal(&server), CheckoutOptions::default())
        .with_order_store(Arc::new(FailingStore(StoreError::Query(
            "duplicate key".into(),
        ))));
    let err = failing
        .process(valid_body().to_string().as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::PersistenceFailure(_)));
}

#[tokio::test]
async fn test_bin_lookup_overrides_local_rules() {
    let server = mock_cep_service().await;
    let bin_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/22230000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scheme": "mastercard"})))
        .mount(&bin_server)
        .await;

    let options = CheckoutOptions {
        enable_bin_lookup: true,
        enable_persistence: false,
        ..Default::default()
    };
    let pipeline = CheckoutPipeline::new(postal(&server), options).with_bin_lookup(Arc::new(
        BinlistClient::new(bin_server.uri(), Duration::from_secs(5)).unwrap(),
    ));

    // 2-series Mastercard is outside the local prefix rules
    let mut body = valid_body();
    body["card_number"] = json!("2223 0000 4840 0011");

    let approval = pipeline
        .process(body.to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(approval.card_brand, CardBrand::Mastercard);
}

#[tokio::test]
async fn test_bin_lookup_failure_falls_back_to_local_rules() {
    let server = mock_cep_service().await;
    let bin_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&bin_server)
        .await;

    let options = CheckoutOptions {
        enable_bin_lookup: true,
        enable_persistence: false,
        ..Default::default()
    };
    let pipeline = CheckoutPipeline::new(postal(&server), options).with_bin_lookup(Arc::new(
        BinlistClient::new(bin_server.uri(), Duration::from_secs(5)).unwrap(),
    ));

    let approval = pipeline
        .process(valid_body().to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(approval.card_brand, CardBrand::Visa);
}

// ============================================================================
// HTTP routes
// ============================================================================

#[tokio::test]
async fn test_checkout_endpoint_success() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);
    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default())
        .with_order_store(Arc::new(InMemoryOrderStore::new()));

    let (status, body) =
        post_json(app(pipeline, lookup), "/api/checkout", valid_body().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["card_brand"], json!("Visa"));
    assert_eq!(body["order_id"], json!(1));
    assert_eq!(body["address_info"]["logradouro"], json!("Praça da Sé"));
    assert_eq!(body["address_info"]["uf"], json!("SP"));
}

#[tokio::test]
async fn test_checkout_endpoint_store_unavailable() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);
    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default())
        .with_order_store(Arc::new(FailingStore(StoreError::Unavailable(
            "pool timed out".into(),
        ))));

    let (status, body) =
        post_json(app(pipeline, lookup), "/api/checkout", valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("payment approved"), "{}", message);
    assert!(!message.contains("pool timed out"));
}

#[tokio::test]
async fn test_checkout_endpoint_status_codes() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);

    let cases = [
        ("card_number", json!("123"), StatusCode::BAD_REQUEST),
        ("cep", json!("123"), StatusCode::BAD_REQUEST),
        ("cep", json!("99999999"), StatusCode::BAD_REQUEST),
        ("expiration_date", json!("12/2"), StatusCode::PAYMENT_REQUIRED),
    ];

    for (field, value, expected) in cases {
        let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default())
            .with_order_store(Arc::new(InMemoryOrderStore::new()));
        let mut body = valid_body();
        body[field] = value;

        let (status, response) =
            post_json(app(pipeline, lookup.clone()), "/api/checkout", body.to_string()).await;

        assert_eq!(status, expected, "{} -> {:?}", field, response);
        assert_eq!(response["success"], json!(false));
    }
}

#[tokio::test]
async fn test_checkout_endpoint_malformed_json() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);
    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());

    let (status, body) =
        post_json(app(pipeline, lookup), "/api/checkout", "{\"card_number\":".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "invalid payload"}));
}

#[tokio::test]
async fn test_non_post_methods_not_allowed() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);

    for uri in ["/api/checkout", "/api/lookup-cep"] {
        let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
        let response = app(pipeline, lookup.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
    }
}

#[tokio::test]
async fn test_lookup_cep_endpoint() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);

    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
    let (status, body) = post_json(
        app(pipeline, lookup.clone()),
        "/api/lookup-cep",
        json!({"cep": "01001-000"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["localidade"], json!("São Paulo"));

    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
    let (status, body) = post_json(
        app(pipeline, lookup.clone()),
        "/api/lookup-cep",
        json!({"cep": "99999999"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "postal code not found"}));

    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
    let (status, body) = post_json(
        app(pipeline, lookup),
        "/api/lookup-cep",
        json!({"cep": "123"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid postal code"}));
}

#[tokio::test]
async fn test_validation_endpoints() {
    let server = mock_cep_service().await;
    let lookup = postal(&server);

    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
    let (status, body) = post_json(
        app(pipeline, lookup.clone()),
        "/api/validate-card",
        json!({"card_number": "4532 0151 1283 0367"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["card_brand"], json!("Visa"));
    assert_eq!(body["masked"], json!("**** 0367"));

    let pipeline = CheckoutPipeline::new(lookup.clone(), CheckoutOptions::default());
    let (status, body) = post_json(
        app(pipeline, lookup),
        "/api/validate-cpf",
        json!({"cpf": "111.111.111-11"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"valid": false, "reason": "degenerate"}));
}
