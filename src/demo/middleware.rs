//! Demo middleware
//!
//! The global logging pair, the `/timed` pair (first link records the start
//! time, second replies with the elapsed time), the `/greet` shortcut reply
//! and the `/user` context seeding.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use yarde::app::App;
use yarde::dispatch::RequestContext;
use yarde::response::ResponseValue;

pub fn register(app: &mut App) {
    // Global pair: runs for every request, never terminal.
    app.mount("/", |_ctx: Arc<RequestContext>| async {
        println!("Middleware 1");
        Ok(None)
    });
    app.mount("/", |_ctx: Arc<RequestContext>| async {
        println!("Middleware 2");
        Ok(None)
    });

    app.mount("/timed", |ctx: Arc<RequestContext>| async move {
        let start = Utc::now().timestamp_millis();
        ctx.insert("startTime", json!(start));
        println!("Start time set: {start}");
        Ok(None)
    });
    app.mount("/timed", |ctx: Arc<RequestContext>| async move {
        let start = ctx
            .get("startTime")
            .and_then(|v| v.as_i64())
            .unwrap_or_default();
        Ok(Some(ResponseValue::Json(json!({
            "processingTime": Utc::now().timestamp_millis() - start,
            "message": "Timed response",
        }))))
    });

    // Replies from middleware; no route behind it.
    app.mount("/greet", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::text("Welcome to the playground")))
    });

    // Seeds the identity /user/profile reads back out of the context.
    app.mount("/user", |ctx: Arc<RequestContext>| async move {
        ctx.insert("user", json!({ "id": 123, "name": "John" }));
        Ok(None)
    });
}
