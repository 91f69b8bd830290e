//! Demo auth flow
//!
//! A process-wide "client session" token cell with explicit set and clear
//! routes, plus the `/secure` route that checks the presented header against
//! it. Deliberately global toy state, not a security mechanism.

use std::sync::{Mutex, OnceLock};

use hyper::StatusCode;
use serde_json::json;
use yarde::app::App;
use yarde::dispatch::RequestContext;
use yarde::error::HttpError;
use yarde::response::ResponseValue;
use yarde::routing::PatternError;

use std::sync::Arc;

const VALID_TOKEN: &str = "Bearer valid-token";

static AUTH_TOKEN: OnceLock<Mutex<Option<String>>> = OnceLock::new();

fn token_cell() -> &'static Mutex<Option<String>> {
    AUTH_TOKEN.get_or_init(|| Mutex::new(None))
}

fn set_token(token: &str) {
    if let Ok(mut cell) = token_cell().lock() {
        *cell = Some(token.to_string());
    }
}

fn clear_token() {
    if let Ok(mut cell) = token_cell().lock() {
        *cell = None;
    }
}

fn current_token() -> Option<String> {
    token_cell().lock().map(|cell| cell.clone()).unwrap_or(None)
}

pub fn register(app: &mut App) -> Result<(), PatternError> {
    app.get("/auth/set-token", |_ctx: Arc<RequestContext>| async {
        set_token(VALID_TOKEN);
        Ok(Some(ResponseValue::Json(json!({
            "message": "Auth token set!",
            "token": VALID_TOKEN,
        }))))
    })?;

    app.get("/auth/clear-token", |_ctx: Arc<RequestContext>| async {
        clear_token();
        Ok(Some(ResponseValue::Json(json!({
            "message": "Auth token cleared.",
        }))))
    })?;

    app.get("/secure", |ctx: Arc<RequestContext>| async move {
        let Some(presented) = ctx.header("authorization").map(ToString::to_string) else {
            return Err(
                HttpError::new(StatusCode::UNAUTHORIZED).with_status_message("Unauthorized")
            );
        };

        let user = verify_token(&presented).map_err(|_| {
            HttpError::new(StatusCode::FORBIDDEN)
                .with_status_message("Forbidden")
                .with_message("Invalid token")
        })?;

        Ok(Some(ResponseValue::Json(json!({
            "message": "Access granted",
            "user": user,
        }))))
    })?;

    Ok(())
}

/// Accepts only the token `/auth/set-token` hands out while it is current.
fn verify_token(token: &str) -> Result<serde_json::Value, ()> {
    if token == VALID_TOKEN && current_token().as_deref() == Some(token) {
        Ok(json!({ "userId": 123, "name": "Alice" }))
    } else {
        Err(())
    }
}
