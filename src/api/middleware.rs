//! API Middleware
//!
//! Identity extraction and request logging.

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;

/// Identity headers set by the upstream authentication service
pub const USER_ID_HEADER: &str = "X-Request-User-Id";
pub const USER_NAME_HEADER: &str = "X-Request-User-Name";
pub const USER_EMAIL_HEADER: &str = "X-Request-User-Email";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
}

/// Build the operation context from request headers.
///
/// Authentication happens upstream; this trusts the identity headers it is
/// given. Requests without a user id get an anonymous context, and handlers
/// that need a user reject them with `missing_header`.
pub fn context_from_headers(headers: &HeaderMap) -> Result<OperationContext, AppError> {
    let mut context = OperationContext::new();
    if let Some(correlation_id) =
        header_str(headers, CORRELATION_ID_HEADER).and_then(|s| Uuid::parse_str(s).ok())
    {
        context = context.with_correlation_id(correlation_id);
    }
    context.ensure_correlation_id();

    if let Some(user_id) = header_str(headers, USER_ID_HEADER) {
        let user_id = Uuid::parse_str(user_id).map_err(|_| {
            AppError::InvalidRequest(format!("Invalid {} header format", USER_ID_HEADER))
        })?;
        context = context.with_request_user(user_id);
    }

    context.request_user_name = header_str(headers, USER_NAME_HEADER).map(str::to_string);
    context.request_user_email = header_str(headers, USER_EMAIL_HEADER).map(str::to_string);

    if let Some(ip) = client_ip(headers) {
        context = context.with_client_ip(ip);
    }

    Ok(context)
}

// =========================================================================
// Identity Middleware
// =========================================================================

/// Attach an `OperationContext` to the request
pub async fn identity_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let context = context_from_headers(request.headers()).map_err(IntoResponse::into_response)?;
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-callback-signature",
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware. Runs inside the identity middleware so the
/// correlation id is available.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
