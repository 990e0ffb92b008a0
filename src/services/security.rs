use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::environment::AppEnv;

pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

/// Permissive in development; in production only the configured origins are
/// allowed. Preflight OPTIONS is answered by the layer itself.
pub fn cors_layer(env: AppEnv, allowed_origins: &[String]) -> CorsLayer {
    match env {
        AppEnv::Development => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        AppEnv::Production => {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| {
                            tracing::warn!(%origin, "ignoring malformed entry in ALLOWED_ORIGINS");
                        })
                        .ok()
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
