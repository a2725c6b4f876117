/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use shyft_api::{app::AppState, config::Config};
/// use shyft_shared::{
///     auth::gotrue::GoTrueAuth,
///     billing::stripe::StripeClient,
///     db::{pool::create_pool, postgres::PgStore},
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let http = reqwest::Client::new();
///
/// let state = AppState::new(
///     Arc::new(PgStore::new(pool)),
///     Arc::new(GoTrueAuth::new(http.clone(), &config.auth.url, &config.auth.anon_key)),
///     Arc::new(StripeClient::new(http, &config.stripe.secret_key)),
///     config,
/// );
/// let app = shyft_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_auth, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use shyft_shared::{
    auth::provider::AuthProvider, billing::provider::PaymentsProvider, db::store::Store,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Relational storage
    pub store: Arc<dyn Store>,

    /// Hosted auth service
    pub auth: Arc<dyn AuthProvider>,

    /// Payments provider
    pub payments: Arc<dyn PaymentsProvider>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        store: Arc<dyn Store>,
        auth: Arc<dyn AuthProvider>,
        payments: Arc<dyn PaymentsProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            auth,
            payments,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                         # public
/// ├── /auth/
/// │   ├── POST /signup                     # public
/// │   ├── POST /login                      # public
/// │   ├── POST /forgot-password            # public
/// │   ├── POST /refresh                    # public
/// │   ├── POST /logout                     # bearer
/// │   └── GET  /me                         # bearer
/// ├── /jobs/                               # bearer
/// │   ├── GET, POST /
/// │   ├── GET, PATCH, DELETE /:id
/// │   ├── POST /:id/dispatch
/// │   └── POST /:id/complete
/// ├── /technicians/                        # bearer
/// │   ├── GET, POST /
/// │   ├── GET /available
/// │   ├── PATCH /:id/status
/// │   └── PATCH /:id/location
/// ├── /dashboard/                          # bearer
/// │   ├── GET /stats
/// │   ├── GET /team
/// │   └── GET /revenue-chart
/// ├── /billing/                            # bearer
/// │   ├── GET  /prices
/// │   ├── GET  /subscription
/// │   ├── POST /checkout
/// │   └── POST /portal
/// └── POST /webhooks/stripe                # signature-verified
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let auth_layer = || axum::middleware::from_fn_with_state(state.clone(), require_auth);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route_layer(auth_layer())
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/refresh", post(routes::auth::refresh));

    let job_routes = Router::new()
        .route(
            "/",
            get(routes::jobs::list_jobs).post(routes::jobs::create_job),
        )
        .route(
            "/:id",
            get(routes::jobs::get_job)
                .patch(routes::jobs::update_job)
                .delete(routes::jobs::delete_job),
        )
        .route("/:id/dispatch", post(routes::jobs::dispatch_job))
        .route("/:id/complete", post(routes::jobs::complete_job))
        .route_layer(auth_layer());

    let technician_routes = Router::new()
        .route(
            "/",
            get(routes::technicians::list_technicians)
                .post(routes::technicians::create_technician),
        )
        .route("/available", get(routes::technicians::list_available))
        .route("/:id/status", patch(routes::technicians::update_status))
        .route("/:id/location", patch(routes::technicians::update_location))
        .route_layer(auth_layer());

    let dashboard_routes = Router::new()
        .route("/stats", get(routes::dashboard::stats))
        .route("/team", get(routes::dashboard::team))
        .route("/revenue-chart", get(routes::dashboard::revenue_chart))
        .route_layer(auth_layer());

    let billing_routes = Router::new()
        .route("/prices", get(routes::billing::list_prices))
        .route("/subscription", get(routes::billing::get_subscription))
        .route("/checkout", post(routes::billing::create_checkout))
        .route("/portal", post(routes::billing::create_portal))
        .route_layer(auth_layer());

    let webhook_routes =
        Router::new().route("/stripe", post(routes::webhooks::stripe_webhook));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/jobs", job_routes)
        .nest("/technicians", technician_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/billing", billing_routes)
        .nest("/webhooks", webhook_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
