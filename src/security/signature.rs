//! Optional HMAC request signatures for critical operations.
//!
//! Signed requests carry `X-Request-Timestamp` (unix seconds) and
//! `X-Request-Signature`, the hex HMAC-SHA256 of
//! `timestamp || method || path || body` under the service secret.

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::warn;

use crate::{error::AppError, state::AppState};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-request-signature";
pub const TIMESTAMP_HEADER: &str = "x-request-timestamp";
pub const SKIP_HEADER: &str = "x-skip-signature";

/// Maximum clock skew accepted between client and server, in seconds.
pub const MAX_SKEW_SECS: f64 = 300.0;

fn mac(secret: &[u8], timestamp: &str, method: &str, path: &str, body: &[u8]) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("hmac key rejected: {e}"))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body);
    Ok(mac)
}

pub fn sign(secret: &[u8], timestamp: &str, method: &str, path: &str, body: &[u8]) -> anyhow::Result<String> {
    Ok(hex::encode(mac(secret, timestamp, method, path, body)?.finalize().into_bytes()))
}

pub fn verify(
    secret: &[u8],
    signature: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &[u8],
    now: i64,
) -> Result<(), AppError> {
    let ts: f64 = timestamp
        .trim()
        .parse()
        .ok()
        .filter(|t: &f64| t.is_finite())
        .ok_or_else(|| AppError::Signature("Invalid request timestamp".into()))?;
    if (now as f64 - ts).abs() > MAX_SKEW_SECS {
        return Err(AppError::Signature("Request expired".into()));
    }

    let provided = hex::decode(signature.trim())
        .map_err(|_| AppError::Signature("Invalid request signature".into()))?;
    mac(secret, timestamp, method, path, body)?
        .verify_slice(&provided)
        .map_err(|_| AppError::Signature("Invalid request signature".into()))
}

fn header_str(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Middleware stage for routes that opt into request signing.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.request_signing {
        return Ok(next.run(request).await);
    }

    if header_str(&request, SKIP_HEADER).as_deref() == Some("development") {
        if state.config.environment.is_production() {
            warn!(path = %request.uri().path(), "signature bypass header ignored in production");
        } else {
            warn!(path = %request.uri().path(), "request signature check bypassed");
            return Ok(next.run(request).await);
        }
    }

    let (Some(signature), Some(timestamp)) = (
        header_str(&request, SIGNATURE_HEADER),
        header_str(&request, TIMESTAMP_HEADER),
    ) else {
        return Err(AppError::Signature("Missing request signature".into()));
    };

    let (parts, body) = request.into_parts();
    // nested routers see a stripped path; the client signs the full one
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path().to_string(), |OriginalUri(uri)| uri.path().to_string());
    let bytes = to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?;

    verify(
        state.config.jwt.secret.as_bytes(),
        &signature,
        &timestamp,
        parts.method.as_str(),
        &path,
        &bytes,
        OffsetDateTime::now_utc().unix_timestamp(),
    )
    .inspect_err(|e| warn!(path = %path, reason = %e, "request signature rejected"))?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
