use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::channels::DeliveryChannel;
use crate::db::{ContactStore, EventStore};
use crate::otp::OtpCache;
use crate::processor::dispatcher::Dispatcher;

pub mod admin;
pub mod auth;
pub mod error;
pub mod otp;
pub mod sos;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub contacts: Arc<dyn ContactStore>,
    pub events: Arc<dyn EventStore>,
    pub sms: Arc<dyn DeliveryChannel>,
    pub otp: Arc<OtpCache>,
    pub jwt_secret: String,
    pub admin_api_key: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/sos/events",
            get(sos::list_events).post(sos::reject_events_trigger),
        )
        .route("/api/sos/events/{id}", patch(sos::close_event))
        .route("/api/sos/{kind}", post(sos::trigger))
        .route("/api/otp/send", post(otp::send))
        .route("/api/otp/verify", post(otp::verify))
        .route("/api/admin/sos-events", get(admin::list_events))
        .route("/api/admin/dashboard-stats", get(admin::dashboard_stats))
        .route("/api/admin/active-users", get(admin::active_users))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::channels::DeliveryError;
    use crate::db::memory::{MemoryContactStore, MemoryEventStore};
    use crate::geocode::{fallback_address, AddressResolver};
    use crate::http::auth::Claims;
    use crate::models::dispatch::{Channel, Coordinates, FailureKind};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tower::ServiceExt as _;
    use uuid::Uuid;

    pub const SECRET: &str = "test-secret";
    pub const ADMIN_KEY: &str = "admin-key";

    /// Accepts every number except those in `reject`.
    #[derive(Default)]
    pub struct StubChannel {
        pub channel: Channel,
        pub reject: Vec<String>,
        pub sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DeliveryChannel for StubChannel {
        fn channel(&self) -> Channel {
            self.channel
        }

        fn recipient_limit(&self) -> Option<usize> {
            match self.channel {
                Channel::Sms => None,
                Channel::Call => Some(1),
            }
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn send(&self, recipient: &str, message: &str) -> Result<String, DeliveryError> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), message.to_string()));
            if self.reject.iter().any(|r| r == recipient) {
                return Err(DeliveryError::new(FailureKind::InvalidRecipient, "Invalid Numbers"));
            }
            Ok(format!("req-{}", recipient))
        }
    }

    pub struct OfflineGeocoder;

    #[async_trait]
    impl AddressResolver for OfflineGeocoder {
        async fn resolve(&self, coords: Coordinates) -> String {
            fallback_address(coords)
        }
    }

    pub struct TestApp {
        pub contacts: Arc<MemoryContactStore>,
        pub events: Arc<MemoryEventStore>,
        pub sms: Arc<StubChannel>,
        pub voice: Arc<StubChannel>,
        pub otp: Arc<OtpCache>,
        pub router: Router,
    }

    impl TestApp {
        pub fn new(reject: &[&str]) -> Self {
            let contacts = Arc::new(MemoryContactStore::default());
            let events = Arc::new(MemoryEventStore::default());
            let sms = Arc::new(StubChannel {
                reject: reject.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            });
            let voice = Arc::new(StubChannel {
                channel: Channel::Call,
                ..Default::default()
            });
            let otp = Arc::new(OtpCache::new(Duration::from_secs(300)));
            let dispatcher = Arc::new(Dispatcher::new(
                contacts.clone(),
                Arc::new(OfflineGeocoder),
                sms.clone(),
                voice.clone(),
                events.clone(),
            ));
            let state = AppState {
                dispatcher,
                contacts: contacts.clone(),
                events: events.clone(),
                sms: sms.clone(),
                otp: otp.clone(),
                jwt_secret: SECRET.to_string(),
                admin_api_key: ADMIN_KEY.to_string(),
            };
            Self {
                contacts,
                events,
                sms,
                voice,
                otp,
                router: router(state),
            }
        }

        pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap()
            };
            (status, json)
        }
    }

    pub fn token_for(user_id: Uuid) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let claims = Claims { user_id, exp };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub fn authed(method: &str, uri: &str, user_id: Uuid, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token_for(user_id)))
            .header("content-type", "application/json");
        match body {
            Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}
