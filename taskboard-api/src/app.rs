/// Application state and router setup
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Route layout
///
/// | Path | Auth |
/// |---|---|
/// | `/`, `/health` | public |
/// | `/ws?token=` | token in query string |
/// | `/api/auth/register`, `/login`, `/google-login` | public |
/// | everything else under `/api` | bearer token |

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes, ws,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::identity::IdentityVerifier, events::EventPublisher, services::accounts::TokenIssuer,
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Where services send live events (the hub itself, or the Redis relay)
    pub events: Arc<dyn EventPublisher>,

    /// Local WebSocket connections
    pub hub: Arc<ws::Hub>,

    /// External identity verifier; `None` disables Google login
    pub verifier: Option<Arc<dyn IdentityVerifier>>,

    /// Bearer token signer
    pub tokens: TokenIssuer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates state that publishes straight to the local hub
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let hub = Arc::new(ws::Hub::new());
        let events: Arc<dyn EventPublisher> = hub.clone();
        Self::with_publisher(store, events, hub, config)
    }

    /// Creates state with an explicit publisher (e.g. the Redis relay)
    pub fn with_publisher(
        store: Arc<dyn Store>,
        events: Arc<dyn EventPublisher>,
        hub: Arc<ws::Hub>,
        config: Config,
    ) -> Self {
        let tokens = TokenIssuer::new(
            config.auth.jwt_secret.clone(),
            chrono::Duration::seconds(config.auth.token_lifetime_secs),
        );

        Self {
            store,
            events,
            hub,
            verifier: None,
            tokens,
            config: Arc::new(config),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }
}

/// Builds the Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Public service routes
    let service_routes = Router::new()
        .route("/", get(routes::health::banner))
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(ws::ws_handler));

    let public_auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/google-login", post(routes::auth::google_login));

    // Everything below requires a bearer token
    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route("/comments/:id", delete(routes::comments::delete_comment))
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/:id/read", put(routes::notifications::mark_read))
        .route("/dashboard/overview", get(routes::dashboard::overview))
        .route("/dashboard/stats", get(routes::dashboard::stats))
        .route("/dashboard/calendar", get(routes::dashboard::calendar))
        .route("/dashboard/report", get(routes::dashboard::report))
        .route("/admin/users", get(routes::admin::list_users))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = public_auth_routes.merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
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
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(service_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
