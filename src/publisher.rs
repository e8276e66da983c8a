//! Publishes domain events to NATS. Publishing is best-effort: failures are
//! logged and never reach the request that raised the event.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.nats else {
            debug!(count = events.len(), "event publishing disabled, dropping events");
            return;
        };
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { warn!(subject, error = %e, "failed to serialize event"); continue; }
            };
            if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                warn!(subject, error = %e, "failed to publish event");
            }
        }
    }
}
