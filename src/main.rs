//! KCT Commerce - checkout tax and customer analytics service

use std::sync::Arc;

use anyhow::Result;
use kct_commerce::api::{self, AppState};
use kct_commerce::publisher::EventPublisher;
use kct_commerce::repository::{CustomerRepository, InMemoryStore, OrderRepository, PgStore};
use kct_commerce::tax::{StripeTaxClient, TaxLineResolver};
use kct_commerce::{AppConfig, CustomerAnalytics};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let (customers, orders): (Arc<dyn CustomerRepository>, Arc<dyn OrderRepository>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let store = Arc::new(PgStore::new(db));
            (store.clone() as Arc<dyn CustomerRepository>, store as Arc<dyn OrderRepository>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, analytics will read from an in-memory store");
            let store = Arc::new(InMemoryStore::default());
            (store.clone() as Arc<dyn CustomerRepository>, store as Arc<dyn OrderRepository>)
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };

    if !config.stripe.automatic_tax {
        tracing::info!("automatic tax disabled, carts receive zero-rate tax lines");
    }
    let stripe = StripeTaxClient::new(&config.stripe)?;
    let state = AppState {
        tax: Arc::new(TaxLineResolver::new(Arc::new(stripe), config.stripe.tax_options())),
        analytics: Arc::new(CustomerAnalytics::new(customers, orders, config.segmentation)),
        events: EventPublisher::new(nats),
    };

    let app = api::router(state);
    tracing::info!("🚀 KCT Commerce listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
