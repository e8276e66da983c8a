//! HTTP surface: storefront tax calculation and admin analytics.

pub mod error;
pub mod schemas;

pub use error::ApiError;

use std::sync::Arc;

use axum::{extract::{Path, State}, routing::{get, post}, Json, Router};
use chrono::Utc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::analytics::{groups, CustomerAnalytics, CustomerMetrics};
use crate::publisher::EventPublisher;
use crate::tax::TaxProvider;
use schemas::{CartTaxRequest, CartTaxResponse};

#[derive(Clone)]
pub struct AppState {
    pub tax: Arc<dyn TaxProvider>,
    pub analytics: Arc<CustomerAnalytics>,
    pub events: EventPublisher,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "kct-commerce"})) }))
        .route("/store/carts/taxes", post(calculate_cart_taxes))
        .route("/admin/customer-analytics", get(customer_analytics))
        .route("/admin/customers/:id/analytics", get(customer_metrics))
        .route("/admin/setup-customer-groups", post(setup_customer_groups).get(customer_groups))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

async fn calculate_cart_taxes(State(s): State<AppState>, Json(r): Json<CartTaxRequest>) -> Result<Json<CartTaxResponse>, ApiError> {
    r.validate()?;
    let mut cart = r.into_cart()?;
    let (items, shipping, context) = cart.tax_inputs();
    let resolution = s.tax.resolve(&items, &shipping, &context).await;
    cart.apply_tax_lines(resolution.lines);
    s.events.publish_all(cart.take_events()).await;
    Ok(Json(CartTaxResponse::from_cart(&cart, resolution.source)))
}

async fn customer_analytics(State(s): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let analytics = s.analytics.overview(Utc::now()).await?;
    Ok(Json(serde_json::json!({ "success": true, "analytics": analytics })))
}

async fn customer_metrics(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<CustomerMetrics>, ApiError> {
    Ok(Json(s.analytics.customer_metrics(&id, Utc::now()).await?))
}

async fn setup_customer_groups(State(s): State<AppState>) -> Json<serde_json::Value> {
    let results = s.analytics.setup_customer_groups().await;
    let summary = serde_json::json!({
        "total_groups": results.total,
        "created": results.created.len(),
        "already_existed": results.existing.len(),
        "failed": results.failed.len(),
    });
    Json(serde_json::json!({ "success": true, "message": "Customer groups setup completed", "results": results, "summary": summary }))
}

async fn customer_groups(State(s): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let summaries = s.analytics.group_summaries().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "total_groups": summaries.len(),
        "kct_configured": groups::is_configured(&summaries),
        "groups": summaries,
    })))
}
