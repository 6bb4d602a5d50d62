//! # Canteen API
//!
//! HTTP surface of the canteen ordering backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Canteen API Routes                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────┐  ┌──────────────────────────────┐ │
//! │  │  /api/customer/outlets  CUSTOMER │  │  /api/staff/outlets   STAFF  │ │
//! │  │                                  │  │                (SUPERADMIN)  │ │
//! │  │ • POST customer-order            │  │ • PUT  update-order          │ │
//! │  │ • GET  get-current-quota         │  │ • GET  get-order/{o}/{id}    │ │
//! │  │ • POST apply-coupon              │  │ • POST add-manual-order      │ │
//! │  │ • GET  customer-ongoing-order    │  └──────────────────────────────┘ │
//! │  │ • GET  customer-order-history    │                                   │
//! │  │ • PUT  customer-cancel-order/{id}│  ┌──────────────────────────────┐ │
//! │  │ • POST verify-razorpay-payment   │  │  /api/customer/feedback      │ │
//! │  │ • GET  razorpay-key              │  │ • POST submit                │ │
//! │  └──────────────────────────────────┘  └──────────────────────────────┘ │
//! │                                                                         │
//! │  GET /health (no auth)                                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         AppState                                  │  │
//! │  │  OrderingService ─┐                                               │  │
//! │  │  FeedbackService ─┼── Database (SQLite pool) + BackgroundTasks     │  │
//! │  │  JwtManager       │                                               │  │
//! │  │  ApiConfig        │                                               │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`] for the environment variables.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use canteen_core::payment::{HmacSignatureVerifier, PaymentVerifier};
use canteen_db::{BackgroundTasks, Database, FeedbackService, OrderingService};

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ordering: OrderingService,
    pub feedback: FeedbackService,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// Production wiring: HMAC verifier keyed by the gateway secret.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let verifier = Arc::new(HmacSignatureVerifier::new(config.razorpay_key_secret.clone()));
        Self::with_verifier(db, config, verifier)
    }

    /// Wiring with an explicit payment verifier.
    pub fn with_verifier(db: Database, config: ApiConfig, verifier: Arc<dyn PaymentVerifier>) -> Self {
        let tasks = BackgroundTasks::new();
        AppState {
            ordering: OrderingService::new(db.clone(), verifier, config.business_utc_offset_minutes, tasks.clone()),
            feedback: FeedbackService::new(db.clone(), tasks),
            jwt: Arc::new(JwtManager::new(&config.jwt_secret)),
            config: Arc::new(config),
            db,
        }
    }

    /// Background jobs spawned by any service.
    pub fn tasks(&self) -> &BackgroundTasks {
        self.ordering.tasks()
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejection is an [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

// =============================================================================
// Router
// =============================================================================

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes::health::routes())
        .nest("/api/customer/outlets", routes::customer::routes())
        .nest("/api/customer/feedback", routes::customer::feedback_routes())
        .nest("/api/staff/outlets", routes::staff::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Cookie auth needs credentials, which rules out wildcards.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}
