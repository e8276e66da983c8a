//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use kct_commerce::api::{self, AppState};
use kct_commerce::domain::aggregates::{Customer, CustomerGroup, Order};
use kct_commerce::domain::value_objects::Money;
use kct_commerce::publisher::EventPublisher;
use kct_commerce::repository::InMemoryStore;
use kct_commerce::tax::stripe::{Calculation, CalculatedLine, CalculatedLineList};
use kct_commerce::tax::{CalculationRequest, TaxCalculationApi, TaxError, TaxLineResolver, TaxOptions};
use kct_commerce::{CustomerAnalytics, SegmentationThresholds};
use tower::ServiceExt;

/// Charges 8.25% on every line it is sent.
struct FixedRateApi;

#[async_trait]
impl TaxCalculationApi for FixedRateApi {
    async fn calculate(&self, request: &CalculationRequest) -> Result<Calculation, TaxError> {
        let data: Vec<CalculatedLine> = request.line_items.iter().map(|l| CalculatedLine {
            reference: Some(l.reference.clone()),
            amount: l.amount,
            amount_tax: (l.amount * 825 + 5_000) / 10_000,
            tax_breakdown: vec![],
        }).collect();
        Ok(Calculation {
            id: Some("taxcalc_test".into()),
            tax_amount_exclusive: data.iter().map(|l| l.amount_tax).sum(),
            line_items: CalculatedLineList { data },
        })
    }
}

async fn app(automatic_tax: bool) -> axum::Router {
    let store = Arc::new(InMemoryStore::default());
    store.insert_customer(Customer {
        id: "cus_1".into(), email: "groom@example.com".into(), first_name: Some("Sam".into()), last_name: None,
        has_account: true, created_at: Utc::now() - Duration::days(365),
    }).await;
    store.insert_group(CustomerGroup::new("grp_vip", "VIP Customer").with_members(["cus_1"])).await;
    store.insert_order(Order::new("order_1", Some("cus_1".into()), Money::usd(120_000), Utc::now() - Duration::days(10))).await;

    let state = AppState {
        tax: Arc::new(TaxLineResolver::new(Arc::new(FixedRateApi), TaxOptions { automatic_tax, ..Default::default() })),
        analytics: Arc::new(CustomerAnalytics::new(store.clone(), store, SegmentationThresholds::default())),
        events: EventPublisher::disabled(),
    };
    api::router(state)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder().method("POST").uri(uri).header("content-type", "application/json")
        .body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn cart_body() -> serde_json::Value {
    serde_json::json!({
        "cart_id": "cart_wedding",
        "currency": "usd",
        "items": [
            { "id": "item_tux", "variant_id": "var_tux_40r", "quantity": 1, "unit_price": 49_900 },
            { "id": "item_vest", "variant_id": "var_vest_m", "quantity": 2, "unit_price": 6_000 }
        ],
        "shipping_methods": [{ "id": "sm_express", "name": "Express", "amount": 2_000 }],
        "shipping_address": { "address_1": "1 Main St", "city": "Austin", "province": "TX", "postal_code": "78701", "country_code": "US" }
    })
}

#[tokio::test]
async fn health() {
    let (status, body) = send(app(true).await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn cart_taxes_are_calculated_per_line() {
    let (status, body) = send(app(true).await, post_json("/store/carts/taxes", cart_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart_id"], "cart_wedding");
    assert_eq!(body["source"], "calculated");

    let lines = body["tax_lines"].as_array().unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["line_item_id"], "item_tux");
    assert_eq!(lines[2]["shipping_line_id"], "sm_express");
    assert!(lines.iter().all(|l| l["provider_id"] == "stripe-tax"));

    // 49_900 + 12_000 = 61_900 subtotal; tax 4117 + 990 + 165
    assert_eq!(body["subtotal"], 61_900);
    assert_eq!(body["shipping_total"], 2_000);
    assert_eq!(body["tax_total"], 5_272);
    assert_eq!(body["total"], 61_900 + 2_000 + 5_272);
}

#[tokio::test]
async fn cart_taxes_are_zero_when_disabled() {
    let (status, body) = send(app(false).await, post_json("/store/carts/taxes", cart_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "disabled");
    assert_eq!(body["tax_total"], 0);
    let lines = body["tax_lines"].as_array().unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l["name"] == "No Tax" && l["code"] == "NONE"));
}

#[tokio::test]
async fn cart_without_address_gets_zero_tax() {
    let mut body = cart_body();
    body.as_object_mut().unwrap().remove("shipping_address");
    let (status, body) = send(app(true).await, post_json("/store/carts/taxes", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "disabled");
    assert_eq!(body["tax_lines"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_cart_is_rejected() {
    let body = serde_json::json!({ "items": [{ "id": "item_1", "quantity": 0, "unit_price": 100 }] });
    let (status, body) = send(app(true).await, post_json("/store/carts/taxes", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 422);
}

#[tokio::test]
async fn admin_analytics_overview() {
    let (status, body) = send(app(true).await, get("/admin/customer-analytics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analytics"]["overview"]["total_customers"], 1);
    assert_eq!(body["analytics"]["overview"]["total_revenue"], 120_000);
    assert_eq!(body["analytics"]["groups"][0]["metrics"]["total_orders"], 1);
}

#[tokio::test]
async fn customer_metrics_and_not_found() {
    let (status, body) = send(app(true).await, get("/admin/customers/cus_1/analytics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lifetime_value"], 120_000);
    assert_eq!(body["segment"], "new");
    assert_eq!(body["churn"]["level"], "low");

    let (status, body) = send(app(true).await, get("/admin/customers/cus_missing/analytics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn identical_items_each_get_a_tax_line() {
    let body = serde_json::json!({
        "cart_id": "cart_party",
        "items": [
            { "id": "item_groom", "variant_id": "var_tux_40r", "quantity": 1, "unit_price": 49_900 },
            { "id": "item_best_man", "variant_id": "var_tux_40r", "quantity": 1, "unit_price": 49_900 }
        ],
        "shipping_address": { "country_code": "US", "province": "TX" }
    });
    let (status, body) = send(app(true).await, post_json("/store/carts/taxes", body)).await;
    assert_eq!(status, StatusCode::OK);
    let lines = body["tax_lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["line_item_id"], "item_groom");
    assert_eq!(lines[1]["line_item_id"], "item_best_man");
    assert_eq!(body["tax_total"], 4_117 * 2);
}

#[tokio::test]
async fn duplicate_line_ids_are_rejected() {
    let body = serde_json::json!({ "items": [
        { "id": "item_1", "quantity": 1, "unit_price": 100 },
        { "id": "item_1", "quantity": 1, "unit_price": 200 }
    ] });
    let (status, body) = send(app(true).await, post_json("/store/carts/taxes", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 422);
}

#[tokio::test]
async fn customer_groups_setup_is_idempotent() {
    let app = app(true).await;
    let (status, body) = send(app.clone(), post_json("/admin/setup-customer-groups", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["total_groups"], 12);
    assert_eq!(body["summary"]["created"], 11);
    assert_eq!(body["summary"]["already_existed"], 1);
    assert_eq!(body["results"]["existing"][0], "VIP Customer");

    let (_, body) = send(app.clone(), post_json("/admin/setup-customer-groups", serde_json::json!({}))).await;
    assert_eq!(body["summary"]["created"], 0);
    assert_eq!(body["summary"]["already_existed"], 12);

    let (status, body) = send(app.clone(), get("/admin/setup-customer-groups")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_groups"], 12);
    assert_eq!(body["kct_configured"], true);
    let wedding = body["groups"].as_array().unwrap().iter().find(|g| g["name"] == "Wedding Party").unwrap();
    assert_eq!(wedding["type"], "event");
    assert_eq!(wedding["discount"], 15);

    let (_, body) = send(app, get("/admin/customer-analytics")).await;
    assert_eq!(body["analytics"]["overview"]["total_groups"], 12);
    let guests = body["analytics"]["groups"].as_array().unwrap().iter().find(|g| g["name"] == "Guest Purchasers").unwrap();
    assert_eq!(guests["metadata"]["conversion_incentive"], "10% off when you create an account");
}
