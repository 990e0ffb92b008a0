pub mod config;
pub mod modules;
pub mod services;
pub mod tenants;

use axum::{http::header, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::environment::{AppEnv, Config};
use config::DbPool;
use modules::admin::admin_routes;
use modules::auth::auth_routes;
use services::email::templates::LinkBuilder;
use services::email::{EmailService, HttpEmailSender, LogEmailSender};
use services::jwt::JwtService;
use services::metrics::{metrics_middleware, MetricsRegistry};
use services::password_policy::BreachChecker;
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::security::{cors_layer, security_headers};
use tenants::{FsTenantStore, TenantRegistry};

/// Request-time knobs extracted from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: AppEnv,
    pub use_httponly_cookies: bool,
    pub allowed_origins: Vec<String>,
}

pub struct AppState {
    pub db: DbPool,
    pub http_client: reqwest::Client,
    pub jwt: JwtService,
    pub email: EmailService,
    pub tenants: TenantRegistry,
    pub breach: BreachChecker,
    pub metrics: Arc<MetricsRegistry>,
    pub settings: Settings,
}

/// Wires the full application state from configuration. Tests assemble an
/// [`AppState`] by hand instead, swapping in their own sender and store.
pub fn build_state(config: &Config, db: DbPool) -> Arc<AppState> {
    let http_client = reqwest::Client::new();
    let metrics = MetricsRegistry::new().expect("metrics registry");

    let links = LinkBuilder::new(
        config.app_env,
        config.base_domain.clone(),
        config.dev_server_port,
    );
    let sender = match (&config.email_api_url, &config.email_api_key) {
        (Some(url), Some(key)) => Some(Arc::new(HttpEmailSender::new(
            http_client.clone(),
            url.clone(),
            key.clone(),
        )) as Arc<dyn services::email::EmailSender>),
        _ if config.app_env == AppEnv::Development => {
            Some(Arc::new(LogEmailSender) as Arc<dyn services::email::EmailSender>)
        }
        _ => None,
    };
    let email = EmailService::new(
        sender,
        config.email_from.clone(),
        links,
        config.notify_email.clone(),
        metrics.clone(),
    );

    let tenants = TenantRegistry::new(Arc::new(FsTenantStore::new(
        config.tenant_store_dir.clone(),
    )));

    let breach = BreachChecker::new(http_client.clone(), config.breach_check_url.clone());

    Arc::new(AppState {
        db,
        http_client,
        jwt: JwtService::new(&config.jwt_secret),
        email,
        tenants,
        breach,
        metrics,
        settings: Settings {
            app_env: config.app_env,
            use_httponly_cookies: config.use_httponly_cookies,
            allowed_origins: config.allowed_origins.clone(),
        },
    })
}

pub async fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.settings.app_env, &state.settings.allowed_origins);
    let rate_limiter = create_rate_limiter(60, 100);
    let metrics = state.metrics.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/auth", auth_routes())
        .merge(admin_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100))
        .layer(RateLimitLayer::new(rate_limiter))
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "Courtpass API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
