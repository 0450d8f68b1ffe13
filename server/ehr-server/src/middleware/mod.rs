//! Middleware for request processing

pub mod auth_context;

pub use auth_context::{
    any_principal, doctors_only, patients_only, require_auth, require_role, AuthContext,
};

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const SLOW_REQUEST: Duration = Duration::from_secs(1);

/// Log requests that take longer than a second
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;
    let duration = start.elapsed();

    if duration > SLOW_REQUEST {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %response.status(),
            duration_ms = duration.as_millis(),
            "Slow request detected"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %path,
            status = %response.status(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// CORS for the configured browser origins. `*` allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}
