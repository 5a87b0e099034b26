use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tankctl_types::CallerIdentity;

use crate::AppState;

/// Caller resolved for the current request, stored in request extensions.
#[derive(Clone, Debug)]
pub struct CallerContext(pub CallerIdentity);

/// Resolves the caller from HTTP Basic credentials.
///
/// A request without an `Authorization` header proceeds as the anonymous
/// caller and is left to the operation's role check. Malformed or wrong
/// credentials are rejected with `401` before any operation runs.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let caller = match basic_credentials(req.headers())? {
        None => CallerIdentity::anonymous(),
        Some((username, secret)) => {
            let state = req
                .extensions()
                .get::<Arc<AppState>>()
                .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
            state
                .directory
                .resolve_caller(&username, &secret)
                .ok_or(StatusCode::UNAUTHORIZED)?
        }
    };

    req.extensions_mut().insert(CallerContext(caller));
    Ok(next.run(req).await)
}

/// Extracts `(username, secret)` from a Basic `Authorization` header.
///
/// Returns `Ok(None)` when the header is absent.
pub(crate) fn basic_credentials(
    headers: &HeaderMap,
) -> Result<Option<(String, String)>, StatusCode> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let decoded = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let (username, secret) = decoded.split_once(':').ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Some((username.to_string(), secret.to_string())))
}
