//! Control-plane ingress — POST /ipc/:platform.
//!
//! Accepts `{command, data?}` JSON from external automations (cron hooks,
//! webhook bridges). Each platform source is authenticated independently,
//! then the command is enqueued on the bus and the caller's private reply
//! slot is awaited.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use murmur_core::config::IpcAuthMode;
use murmur_core::Platform;
use murmur_extensions::CommandReply;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

/// POST /ipc/:platform
///
/// Verifies the request per the source's auth mode and forwards the command
/// to the bus. Returns the resolved reply, `not_found` when no handler
/// claimed the command, 401 on auth failure.
pub async fn ipc_handler(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let cfg = &state.config.ipc;

    if !cfg.enabled {
        warn!(platform = %platform, "ipc request received but subsystem is disabled");
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "ipc subsystem is disabled"})),
        ));
    }

    let source_cfg = cfg
        .sources
        .iter()
        .find(|s| s.platform == platform)
        .ok_or_else(|| {
            warn!(platform = %platform, "unknown ipc source");
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "unknown ipc source"})),
            )
        })?;

    match &source_cfg.auth_mode {
        IpcAuthMode::HmacSha256 => {
            verify_hmac_sha256(&headers, &body, source_cfg.secret.as_deref())
                .map_err(|e| auth_error(&e))?;
        }
        IpcAuthMode::BearerToken => {
            verify_bearer_token(&headers, source_cfg.secret.as_deref())
                .map_err(|e| auth_error(&e))?;
        }
        IpcAuthMode::None => {
            // Operator explicitly opted out.
        }
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(platform = %platform, error = %e, "invalid JSON in ipc body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid JSON body"})),
        )
    })?;

    let command = match payload.get("command").and_then(|v| v.as_str()) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "missing 'command' field"})),
            ));
        }
    };
    let data = payload.get("data").cloned().unwrap_or(json!({}));

    info!(platform = %platform, command = %command, "ipc command arrived");

    match state
        .ipc
        .request(command.as_str(), Platform::from(platform.as_str()), data)
        .await
    {
        Ok(CommandReply::Ok { data }) => Ok(Json(json!({"ok": true, "data": data}))),
        Ok(CommandReply::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": "not_found", "command": command})),
        )),
        Err(e) => {
            warn!(command = %command, error = %e, "ipc request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": "internal error"})),
            ))
        }
    }
}

// ── Auth helpers ──────────────────────────────────────────────────────────────

/// Verify GitHub-style HMAC-SHA256: `sha256=<hex>` in X-Hub-Signature-256.
fn verify_hmac_sha256(
    headers: &HeaderMap,
    body: &Bytes,
    secret: Option<&str>,
) -> Result<(), String> {
    let secret = secret.ok_or_else(|| "no HMAC secret configured for this source".to_string())?;

    let sig_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Hub-Signature-256 header".to_string())?;

    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "malformed X-Hub-Signature-256 header".to_string())?;

    let expected =
        hex::decode(sig_hex).map_err(|_| "X-Hub-Signature-256 is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}

/// Verify a static bearer token in the `Authorization: Bearer <token>` header.
fn verify_bearer_token(headers: &HeaderMap, secret: Option<&str>) -> Result<(), String> {
    let expected =
        secret.ok_or_else(|| "no bearer token configured for this source".to_string())?;

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Authorization header must use Bearer scheme".to_string())?;

    if token == expected {
        Ok(())
    } else {
        Err("bearer token mismatch".to_string())
    }
}

fn auth_error(reason: &str) -> (StatusCode, Json<Value>) {
    warn!(reason = %reason, "ipc authentication failed");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "authentication failed", "reason": reason})),
    )
}
