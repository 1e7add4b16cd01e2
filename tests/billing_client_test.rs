//! Commerce API client integration tests using wiremock
//!
//! Covers the HTTP transport (headers, URL resolution, timeouts, error
//! mapping) and the propagate / `None` / default split of the billing
//! endpoints.

use std::time::Duration;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use hanzo_commerce::types::{
    DepositRequest, Pagination, SubscribeRequest, TransactionQuery, UpdateSpendAlertRequest,
};
use hanzo_commerce::{ApiRequest, CommerceClient, CommerceClientConfig, CommerceError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client(server: &MockServer, token: Option<&str>) -> CommerceClient {
    CommerceClient::new(CommerceClientConfig {
        base_url: server.uri(),
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .expect("valid base URL")
}

/// Matches requests that carry no `name` header at all.
struct HeaderAbsent(&'static str);

impl Match for HeaderAbsent {
    fn matches(&self, request: &Request) -> bool {
        !request
            .headers
            .keys()
            .any(|name| name.as_str().eq_ignore_ascii_case(self.0))
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_sends_bearer_and_no_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing/balance"))
        .and(query_param("user", "u1"))
        .and(query_param("currency", "usd"))
        .and(header("authorization", "Bearer tok"))
        .and(header("accept", "application/json"))
        .and(HeaderAbsent("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balance": 12.5,
            "holds": 2.5,
            "available": 10.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = make_client(&server, Some("tok"))
        .get_balance("u1", "usd")
        .await
        .unwrap();
    assert_eq!(balance.balance, 12.5);
    assert_eq!(balance.available, 10.0);
}

#[tokio::test]
async fn test_unauthenticated_client_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan"))
        .and(HeaderAbsent("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "slug": "pro", "name": "Pro", "price": 20.0, "currency": "usd", "interval": "month" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let plans = make_client(&server, None).get_plans().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].slug.as_deref(), Some("pro"));
}

#[tokio::test]
async fn test_post_sends_json_body_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/billing/deposit"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "user": "u1",
            "currency": "usd",
            "amount": 5.0,
            "expiresIn": "30d"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "tx1",
            "type": "deposit",
            "amount": 5.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deposit = DepositRequest {
        user: "u1".to_string(),
        currency: Some("usd".to_string()),
        amount: 5.0,
        expires_in: Some("30d".to_string()),
        ..Default::default()
    };
    let tx = make_client(&server, Some("tok"))
        .add_deposit(&deposit)
        .await
        .unwrap();
    assert_eq!(tx.id.as_deref(), Some("tx1"));
    assert_eq!(tx.kind.as_deref(), Some("deposit"));
}

#[tokio::test]
async fn test_per_request_token_overrides_client_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing/meters"))
        .and(header("authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let meters: Vec<serde_json::Value> = make_client(&server, Some("tok"))
        .request(ApiRequest::get("/api/v1/billing/meters").token("override"))
        .await
        .unwrap();
    assert!(meters.is_empty());
}

#[tokio::test]
async fn test_authorized_endpoint_call_uses_given_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing/balance"))
        .and(header("authorization", "Bearer call-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balance": 5.0, "holds": 0.0, "available": 5.0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, Some("tok"));
    let balance = client
        .authorized(Some("call-token"))
        .get_balance("u1", "usd")
        .await
        .unwrap();
    assert_eq!(balance.available, 5.0);

    // The override does not stick to the original client.
    let plans = client.authorized(None).get_plans().await.unwrap();
    assert!(plans.is_empty());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = make_client(&server, None).with_timeout(Duration::from_millis(50));
    let err = client.get_plans().await.unwrap_err();
    assert!(matches!(err, CommerceError::Timeout(d) if d == Duration::from_millis(50)));
}

#[tokio::test]
async fn test_error_status_carries_reason_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/subscribe"))
        .respond_with(ResponseTemplate::new(404).set_body_string("plan missing"))
        .mount(&server)
        .await;

    let request = SubscribeRequest {
        plan_id: "p1".to_string(),
        user_id: "u1".to_string(),
        payment_token: None,
    };
    let err = make_client(&server, Some("tok"))
        .subscribe(&request)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        "Commerce API error (404): Not Found: plan missing"
    );
}

#[tokio::test]
async fn test_error_status_with_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = make_client(&server, None).get_plans().await.unwrap_err();
    match err {
        CommerceError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error:");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_base_path_is_replaced_by_absolute_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = CommerceClient::new(CommerceClientConfig {
        base_url: format!("{}/ignored/prefix/", server.uri()),
        token: None,
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    assert!(client.get_plans().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Query strings and path ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_transactions_omit_zero_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing/transactions"))
        .and(query_param("user", "u1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "t1", "type": "hold", "amount": 1.0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = TransactionQuery {
        limit: Some(10),
        offset: Some(0),
        currency: None,
    };
    let txs = make_client(&server, None)
        .get_transactions("u1", &query)
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(!query.contains("offset"));
    assert!(!query.contains("currency"));
}

#[tokio::test]
async fn test_invoices_paging_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing/invoices"))
        .and(query_param("user", "u1"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "inv1", "status": "paid", "total": 20.0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let invoices = make_client(&server, None)
        .get_invoices(
            "u1",
            Pagination {
                limit: Some(5),
                offset: Some(10),
            },
        )
        .await;
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].status.as_deref(), Some("paid"));
}

#[tokio::test]
async fn test_path_ids_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan/pro%2Fannual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "slug": "pro/annual"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let plan = make_client(&server, None).get_plan("pro/annual").await;
    assert_eq!(plan.and_then(|p| p.slug).as_deref(), Some("pro/annual"));
}

// ---------------------------------------------------------------------------
// Failure policy per endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_plan_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/plan/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(make_client(&server, None).get_plan("missing").await.is_none());
}

#[tokio::test]
async fn test_get_subscription_server_error_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/subscribe/s1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(make_client(&server, None)
        .get_subscription("s1")
        .await
        .is_none());
}

#[tokio::test]
async fn test_best_effort_endpoints_fall_back_to_defaults() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = make_client(&server, Some("tok"));

    assert!(client.get_user_subscriptions("u1").await.is_empty());
    assert!(client.get_invoices("u1", Pagination::default()).await.is_empty());
    assert!(client.get_payment_methods("u1").await.is_empty());
    assert!(client.get_spend_alerts("u1").await.is_empty());
    assert!(client.get_credit_grants("u1").await.is_empty());
    assert!(client.get_meters().await.is_empty());

    let usage = client.get_usage("u1").await;
    assert_eq!(usage.total_cost, 0.0);
    assert_eq!(usage.currency, "usd");
    assert!(usage.period.start.is_none());
    assert!(usage.records.is_empty());

    let credit = client.get_credit_balance("u1").await;
    assert_eq!(credit.user_id.as_deref(), Some("u1"));
    assert!(credit.balances.is_empty());

    let summary = client.get_meter_events_summary("u1").await;
    assert_eq!(summary.user_id.as_deref(), Some("u1"));
    assert!(summary.meters.is_empty());
}

#[tokio::test]
async fn test_propagating_endpoints_surface_errors() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(402).set_body_string("payment required"))
        .mount(&server)
        .await;

    let client = make_client(&server, Some("tok"));

    assert_eq!(client.get_balance("u1", "usd").await.unwrap_err().status(), Some(402));
    assert_eq!(client.grant_starter_credit("u1").await.unwrap_err().status(), Some(402));
    assert_eq!(client.cancel_subscription("s1").await.unwrap_err().status(), Some(402));
    assert_eq!(client.apply_discount("s1", "SAVE").await.unwrap_err().status(), Some(402));
    assert_eq!(client.validate_discount_code("SAVE").await.unwrap_err().status(), Some(402));
    assert_eq!(client.get_portal_overview("c1").await.unwrap_err().status(), Some(402));
    assert_eq!(
        client
            .update_spend_alert("a1", &UpdateSpendAlertRequest::default())
            .await
            .unwrap_err()
            .status(),
        Some(402)
    );
}

#[tokio::test]
async fn test_unit_endpoints_ignore_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/subscribe/s1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/billing/payment-methods/pm1/default"))
        .and(HeaderAbsent("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, Some("tok"));
    client.cancel_subscription("s1").await.unwrap();
    client.set_default_payment_method("pm1").await.unwrap();
}

#[tokio::test]
async fn test_apply_discount_posts_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/subscribe/s1/promotion"))
        .and(body_json(serde_json::json!({ "code": "SAVE10" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "SAVE10",
            "kind": "percent",
            "value": 10.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let discount = make_client(&server, Some("tok"))
        .apply_discount("s1", "SAVE10")
        .await
        .unwrap();
    assert_eq!(discount.code.as_deref(), Some("SAVE10"));
    assert_eq!(discount.value, Some(10.0));
}
