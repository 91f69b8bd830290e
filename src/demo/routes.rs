//! Demo routes
//!
//! One route per return shape the dispatcher understands: JSON and text
//! bodies, explicit null, deliberate silence, thrown errors, lazy handlers,
//! a streamed body and an early response.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Method, Response, StatusCode, Version};
use serde_json::{json, Value};
use yarde::app::App;
use yarde::dispatch::RequestContext;
use yarde::error::HttpError;
use yarde::handler::Handler;
use yarde::response::{ChunkStream, ResponseValue};
use yarde::routing::PatternError;

#[allow(clippy::too_many_lines)]
pub fn register(app: &mut App) -> Result<(), PatternError> {
    app.get("/", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Json(json!({ "message": "⚡️ Tadaa!" }))))
    })?;

    app.get("/hello", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Json(json!({
            "message": "hello from the playground",
        }))))
    })?;

    // 204 No Content
    app.get("/null", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Null))
    })?;

    // Deliberate silence: falls through to 404 Not Found
    app.get("/empty", |_ctx: Arc<RequestContext>| async { Ok(None) })?;

    app.get("/data", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Json(json!({ "key": "value" }))))
    })?;

    app.get("/welcome", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::text("Welcome to our service!")))
    })?;

    app.get("/message", |ctx: Arc<RequestContext>| async move {
        let name = ctx.query("name").unwrap_or("stranger").to_string();
        Ok(Some(ResponseValue::text(format!("Greetings, {name}!"))))
    })?;

    app.get("/delayed", |ctx: Arc<RequestContext>| async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(Some(ResponseValue::Json(json!({
            "url": request_url(&ctx),
            "message": "Response after 1 second",
        }))))
    })?;

    // Loaded on first hit; the loader stands in for a module import.
    app.route_lazy(Method::GET, "/big-route", || async {
        Ok(Arc::new(|_ctx: Arc<RequestContext>| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(Some(ResponseValue::Json(json!({
                "message": "Lazy route loaded",
                "timestamp": Utc::now(),
            }))))
        }) as Arc<dyn Handler>)
    })?;

    app.get("/validate", |_ctx: Arc<RequestContext>| async {
        Err(HttpError::new(StatusCode::BAD_REQUEST)
            .with_status_message("Bad Request")
            .with_message("Invalid user input")
            .with_data(json!({ "field": "email" })))
    })?;

    // Raw HTML is still text/plain; the engine never sniffs markup.
    app.get("/html", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::text("<h1>Hello HTML!</h1>")))
    })?;

    app.get("/json", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Json(json!({
            "status": "ok",
            "data": [1, 2, 3],
        }))))
    })?;

    app.get("/stream", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Stream(ChunkStream::from_iter([
            "Streaming ",
            "data ",
        ]))))
    })?;

    app.get("/error", |_ctx: Arc<RequestContext>| async {
        Err(HttpError::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_status_message("Internal Error")
            .with_message("Something went wrong on our end.")
            .fatal())
    })?;

    // The expensive setup runs once, inside the loader.
    app.route_lazy(Method::GET, "/lazy-heavy", || async {
        println!("Initializing heavy resource...");
        let heavy = initialize_heavy_resource();
        Ok(Arc::new(move |_ctx: Arc<RequestContext>| {
            let data = heavy.process();
            async move {
                Ok(Some(ResponseValue::Json(json!({
                    "data": data,
                    "loadedAt": Utc::now(),
                }))))
            }
        }) as Arc<dyn Handler>)
    })?;

    app.get("/request-info", |ctx: Arc<RequestContext>| async move {
        let headers: serde_json::Map<String, Value> = ctx
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                )
            })
            .collect();

        Ok(Some(ResponseValue::Json(json!({
            "path": request_url(&ctx),
            "method": ctx.method().as_str(),
            "headers": headers,
            "query": ctx.queries(),
        }))))
    })?;

    app.get("/custom-header", |ctx: Arc<RequestContext>| async move {
        ctx.set_header(
            HeaderName::from_static("x-custom-header"),
            HeaderValue::from_static("Hello from the engine"),
        );
        Ok(Some(ResponseValue::Json(json!({
            "url": request_url(&ctx),
            "httpVersion": http_version_label(ctx.version()),
        }))))
    })?;

    app.get("/user/profile", |ctx: Arc<RequestContext>| async move {
        let user = ctx.get("user").unwrap_or(Value::Null);
        let name = user["name"].as_str().unwrap_or("guest").to_string();
        Ok(Some(ResponseValue::text(format!(
            "Hello {name}! Your id is {}",
            user["id"]
        ))))
    })?;

    app.get("/respond-with", |ctx: Arc<RequestContext>| async move {
        let early = Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("X-Early-Response", "true")
            .body(Full::new(Bytes::from("Early response")))
            .map_err(HttpError::internal)?;
        ctx.respond_with(early);

        // Never reaches the client; the early response wins.
        Ok(Some(ResponseValue::text("This will be ignored")))
    })?;

    app.get("/normal-response", |_ctx: Arc<RequestContext>| async {
        Ok(Some(ResponseValue::Json(json!({
            "message": "This works normally",
            "timestamp": Utc::now(),
        }))))
    })?;

    app.post("/echo", |ctx: Arc<RequestContext>| async move {
        let content_type = ctx.header("content-type").map(ToString::to_string);
        let body = if content_type
            .as_deref()
            .is_some_and(|t| t.contains("application/json"))
        {
            ctx.read_body_json().await?
        } else {
            Value::String(String::from_utf8_lossy(&ctx.read_body().await?).into_owned())
        };

        Ok(Some(ResponseValue::Json(json!({
            "receivedAt": Utc::now(),
            "contentType": content_type,
            "body": body,
            "yourIp": ctx
                .header("x-forwarded-for")
                .map(ToString::to_string)
                .or_else(|| ctx.remote_addr().map(|addr| addr.ip().to_string())),
        }))))
    })?;

    app.get("/item/:id", |ctx: Arc<RequestContext>| async move {
        let id = ctx.param("id").unwrap_or_default();
        Ok(Some(ResponseValue::Json(json!({
            "id": id,
            "name": format!("Item {id}"),
            "details": format!("Details for item {id}"),
        }))))
    })?;

    app.get("/bonjour/:name", |ctx: Arc<RequestContext>| async move {
        let name = ctx
            .param("name")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "stranger".to_string());
        Ok(Some(ResponseValue::text(format!("Bonjour, {name}!"))))
    })?;

    app.get("/sub/*", |ctx: Arc<RequestContext>| async move {
        let rest = wildcard_rest(&ctx);
        Ok(Some(ResponseValue::text(format!("From Sub: Hello {rest}!"))))
    })?;

    app.get("/multi/**", |ctx: Arc<RequestContext>| async move {
        let rest = wildcard_rest(&ctx);
        Ok(Some(ResponseValue::text(format!(
            "From multi: Hello {rest}!"
        ))))
    })?;

    // Last: the route table is first-match-wins, so this single-segment
    // pattern would shadow every static route above it if registered
    // earlier.
    app.get("/:number", |ctx: Arc<RequestContext>| async move {
        let segment = ctx.param("number").unwrap_or_default();
        match segment.parse::<i64>() {
            Ok(n) if n % 2 == 0 => Ok(Some(ResponseValue::text(format!(
                "This is an even-numbered path! ({n})"
            )))),
            _ => Err(HttpError::new(StatusCode::NOT_FOUND).with_status_message("Path not found")),
        }
    })?;

    Ok(())
}

fn request_url(ctx: &RequestContext) -> String {
    match ctx.query_string() {
        Some(query) => format!("{}?{query}", ctx.path()),
        None => ctx.path().to_string(),
    }
}

fn http_version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

fn wildcard_rest(ctx: &RequestContext) -> String {
    ctx.param("_")
        .filter(|rest| !rest.is_empty())
        .unwrap_or_else(|| "guest".to_string())
}

struct HeavyResource;

impl HeavyResource {
    fn process(&self) -> &'static str {
        "This is heavy data from the resource"
    }
}

fn initialize_heavy_resource() -> HeavyResource {
    println!("Heavy resource initialized");
    HeavyResource
}
