//! Request dispatcher
//!
//! Drives one request through the engine: middleware links in mount order,
//! then route lookup, then the routed handler. The first link to produce a
//! value, an error, or an installed early response ends the walk; a chain
//! that runs out of links is a 404, exactly as if no route had matched.
//! Route parameters are bound to the context only once a routed handler is
//! actually about to run, so middleware never observes them.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::{Body, Incoming};
use hyper::{Request, Response, Version};

use crate::app::App;
use crate::handler::Handler;
use crate::logger::{self, AccessLogEntry};
use crate::response::{normalize, ResponseBody, ResponseIntent};

use super::RequestContext;

/// What one chain link produced.
enum LinkOutcome {
    /// Nothing to say; the walk moves to the next link.
    Continue,
    /// A terminal outcome; the walk stops here.
    Terminal(ResponseIntent),
}

/// Transport entry point. Builds the request context, dispatches, and
/// emits the access log line when one is configured. Infallible: every
/// failure inside the engine becomes a response, never a dropped
/// connection.
pub async fn handle_request(
    req: Request<Incoming>,
    app: Arc<App>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let ctx = Arc::new(RequestContext::from_request(
        req,
        app.max_body_size(),
        remote_addr,
    ));

    let response = dispatch(&app, &ctx).await;

    if let Some(format) = app.access_log_format() {
        logger::log_access(&access_entry(&ctx, &response, started), format);
    }

    Ok(response)
}

/// Run one request through the chain and fold the outcome into a wire
/// response. Usable without a transport; tests drive it with synthetic
/// contexts.
pub async fn dispatch(app: &App, ctx: &Arc<RequestContext>) -> Response<ResponseBody> {
    app.notify_request(ctx);

    let intent = run_chain(app, ctx).await;

    if let ResponseIntent::Error(error) = &intent {
        app.notify_error(error, ctx);
        if error.fatal {
            logger::log_fatal_error(ctx.method().as_str(), ctx.path(), error);
        }
    }

    normalize(intent, ctx, app.debug())
}

async fn run_chain(app: &App, ctx: &Arc<RequestContext>) -> ResponseIntent {
    for link in app.middleware().select(ctx.path()) {
        match run_link(link.as_ref(), ctx).await {
            LinkOutcome::Continue => {}
            LinkOutcome::Terminal(intent) => return intent,
        }
    }

    // Lookup happens after the middleware walk, so a short-circuiting
    // chain never triggers a lazy load.
    let Some(matched) = app.router().lookup(ctx.method(), ctx.path()) else {
        return ResponseIntent::NotFound;
    };
    let handler = match matched.entry.resolve().await {
        Ok(handler) => handler,
        Err(error) => return ResponseIntent::Error(error),
    };

    ctx.set_params(matched.params);
    match run_link(handler.as_ref(), ctx).await {
        // A routed handler with nothing to say reads as a missing route.
        LinkOutcome::Continue => ResponseIntent::NotFound,
        LinkOutcome::Terminal(intent) => intent,
    }
}

async fn run_link(handler: &dyn Handler, ctx: &Arc<RequestContext>) -> LinkOutcome {
    let result = handler.call(Arc::clone(ctx)).await;

    // An installed early response wins over whatever the link returned.
    if let Some(early) = ctx.take_early_response() {
        return LinkOutcome::Terminal(ResponseIntent::Early(early));
    }

    match result {
        Ok(None) => LinkOutcome::Continue,
        Ok(Some(value)) => LinkOutcome::Terminal(value.into()),
        Err(error) => LinkOutcome::Terminal(ResponseIntent::Error(error)),
    }
}

fn access_entry(
    ctx: &RequestContext,
    response: &Response<ResponseBody>,
    started: Instant,
) -> AccessLogEntry {
    let remote = ctx
        .remote_addr()
        .map_or_else(|| "-".to_string(), |addr| addr.ip().to_string());
    let mut entry = AccessLogEntry::new(remote, ctx.method().to_string(), ctx.path().to_string());
    entry.query = ctx.query_string().map(ToString::to_string);
    entry.http_version = http_version_label(ctx.version()).to_string();
    entry.status = response.status().as_u16();
    // Streams have no exact size up front; they log as zero bytes.
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
    entry.referer = ctx.header("referer").map(ToString::to_string);
    entry.user_agent = ctx.header("user-agent").map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn http_version_label(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::{header, Method, StatusCode};
    use serde_json::{json, Value};

    use super::*;
    use crate::error::HttpError;
    use crate::response::{ChunkStream, ResponseValue};

    async fn send(app: &App, method: Method, uri: &str) -> (StatusCode, Bytes) {
        send_ctx(app, Arc::new(RequestContext::new(method, uri))).await
    }

    async fn send_ctx(app: &App, ctx: Arc<RequestContext>) -> (StatusCode, Bytes) {
        let response = dispatch(app, &ctx).await;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, body)
    }

    fn json_body(body: &Bytes) -> Value {
        serde_json::from_slice(body).expect("json body")
    }

    #[tokio::test]
    async fn test_static_route_end_to_end() {
        let mut app = App::new();
        app.get("/hello", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::text("world")))
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"world");
    }

    #[tokio::test]
    async fn test_param_route_binds_and_rejects_empty_segment() {
        let mut app = App::new();
        app.get("/item/:id", |ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::text(
                ctx.param("id").unwrap_or_default(),
            )))
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/item/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"42");

        let (status, _) = send(&app, Method::GET, "/item/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wildcard_routes_bind_under_underscore() {
        let mut app = App::new();
        app.get("/sub/*", |ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::text(format!(
                "sub:{}",
                ctx.param("_").unwrap_or_default()
            ))))
        })
        .unwrap();
        app.get("/multi/**", |ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::text(format!(
                "multi:{}",
                ctx.param("_").unwrap_or_default()
            ))))
        })
        .unwrap();

        let (_, body) = send(&app, Method::GET, "/sub/guest").await;
        assert_eq!(&body[..], b"sub:guest");

        let (_, body) = send(&app, Method::GET, "/multi/a/b/c").await;
        assert_eq!(&body[..], b"multi:a/b/c");

        let (_, body) = send(&app, Method::GET, "/multi").await;
        assert_eq!(&body[..], b"multi:");
    }

    #[tokio::test]
    async fn test_null_is_204_and_silence_is_404() {
        let mut app = App::new();
        app.get("/null", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::Null))
        })
        .unwrap();
        app.get("/silent", |_ctx: Arc<RequestContext>| async { Ok(None) })
            .unwrap();

        let (status, body) = send(&app, Method::GET, "/null").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = send(&app, Method::GET, "/silent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_mismatch_is_404_not_405() {
        let mut app = App::new();
        app.post("/submit", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::text("ok")))
        })
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/submit").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_thrown_error_becomes_structured_json() {
        let mut app = App::new();
        app.get("/validate", |_ctx: Arc<RequestContext>| async {
            Err(HttpError::new(StatusCode::BAD_REQUEST)
                .with_status_message("Bad Request")
                .with_message("Invalid user input")
                .with_data(json!({ "field": "email" })))
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/validate").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json_body(&body);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["statusMessage"], "Bad Request");
        assert_eq!(body["message"], "Invalid user input");
        assert_eq!(body["data"]["field"], "email");
    }

    #[tokio::test]
    async fn test_middleware_prefix_is_segment_scoped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut app = App::new();
        app.mount("/ti", move |_ctx: Arc<RequestContext>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        });
        app.get("/time", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::text("tick")))
        })
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/time").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_middleware_seeds_context_for_handler() {
        let mut app = App::new();
        app.mount("/timed", |ctx: Arc<RequestContext>| async move {
            ctx.insert("startTime", json!(123));
            Ok(None)
        });
        app.get("/timed", |ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::json(
                &json!({ "start": ctx.get("startTime") }),
            )?))
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/timed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["start"], 123);
    }

    #[tokio::test]
    async fn test_middleware_never_sees_route_params() {
        let seen = Arc::new(Mutex::new(None));
        let probe = Arc::clone(&seen);
        let mut app = App::new();
        app.mount("/", move |ctx: Arc<RequestContext>| {
            *probe.lock().unwrap() = Some(ctx.param("id"));
            async { Ok(None) }
        });
        app.get("/item/:id", |ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::text(
                ctx.param("id").unwrap_or_default(),
            )))
        })
        .unwrap();

        let (_, body) = send(&app, Method::GET, "/item/7").await;
        assert_eq!(&body[..], b"7");
        assert_eq!(*seen.lock().unwrap(), Some(None));
    }

    #[tokio::test]
    async fn test_middleware_value_short_circuits_route() {
        let routed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&routed);
        let mut app = App::new();
        app.mount("/", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::text("intercepted")))
        });
        app.get("/hello", move |_ctx: Arc<RequestContext>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(ResponseValue::text("handler"))) }
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"intercepted");
        assert_eq!(routed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_middleware_error_stops_chain() {
        let routed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&routed);
        let mut app = App::new();
        app.mount("/", |_ctx: Arc<RequestContext>| async {
            Err(HttpError::new(StatusCode::UNAUTHORIZED))
        });
        app.get("/hello", move |_ctx: Arc<RequestContext>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(ResponseValue::text("handler"))) }
        })
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/hello").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(routed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_middleware_runs_in_mount_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new();
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            app.mount("/", move |_ctx: Arc<RequestContext>| {
                order.lock().unwrap().push(tag);
                async { Ok(None) }
            });
        }
        app.get("/", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::Null))
        })
        .unwrap();

        send(&app, Method::GET, "/").await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_lazy_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut app = App::new();
        app.route_lazy(Method::GET, "/heavy", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Arc::new(|_ctx: Arc<RequestContext>| async {
                    Ok(Some(ResponseValue::text("heavy")))
                }) as Arc<dyn Handler>)
            }
        })
        .unwrap();

        let ((a_status, a_body), (b_status, b_body)) = tokio::join!(
            send(&app, Method::GET, "/heavy"),
            send(&app, Method::GET, "/heavy")
        );
        assert_eq!(a_status, StatusCode::OK);
        assert_eq!(b_status, StatusCode::OK);
        assert_eq!(&a_body[..], b"heavy");
        assert_eq!(&b_body[..], b"heavy");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        send(&app, Method::GET, "/heavy").await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_load_failure_is_500_and_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut app = App::new();
        app.route_lazy(Method::GET, "/flaky", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    // Whatever status the loader claims, the client sees 500.
                    Err(HttpError::new(StatusCode::BAD_REQUEST).with_message("missing module"))
                } else {
                    Ok(Arc::new(|_ctx: Arc<RequestContext>| async {
                        Ok(Some(ResponseValue::text("recovered")))
                    }) as Arc<dyn Handler>)
                }
            }
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/flaky").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(&body)["statusCode"], 500);

        let (status, body) = send(&app, Method::GET, "/flaky").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"recovered");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_early_response_wins_over_returned_value() {
        let mut app = App::new();
        app.get("/respond-with", |ctx: Arc<RequestContext>| async move {
            let response = Response::builder()
                .status(StatusCode::ACCEPTED)
                .header("X-Early-Response", "true")
                .body(Full::new(Bytes::from("Early response")))
                .map_err(HttpError::internal)?;
            ctx.respond_with(response);
            Ok(Some(ResponseValue::text("This will be ignored")))
        })
        .unwrap();

        let ctx = Arc::new(RequestContext::new(Method::GET, "/respond-with"));
        let response = dispatch(&app, &ctx).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response
                .headers()
                .get("X-Early-Response")
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Early response");
    }

    #[tokio::test]
    async fn test_early_response_from_middleware_stops_chain() {
        let routed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&routed);
        let mut app = App::new();
        app.mount("/", |ctx: Arc<RequestContext>| async move {
            let response = Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("from middleware")))
                .map_err(HttpError::internal)?;
            ctx.respond_with(response);
            Ok(None)
        });
        app.get("/hello", move |_ctx: Arc<RequestContext>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(ResponseValue::text("handler"))) }
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"from middleware");
        assert_eq!(routed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_observer_sees_terminal_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe = Arc::clone(&seen);
        let mut app = App::new();
        app.on_error(move |error, ctx| {
            probe
                .lock()
                .unwrap()
                .push((error.status.as_u16(), ctx.path().to_string()));
        });
        app.get("/boom", |_ctx: Arc<RequestContext>| async {
            Err(HttpError::new(StatusCode::IM_A_TEAPOT))
        })
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/boom").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(*seen.lock().unwrap(), vec![(418, "/boom".to_string())]);
    }

    #[tokio::test]
    async fn test_request_observer_runs_for_every_request() {
        let seen = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&seen);
        let mut app = App::new();
        app.on_request(move |_ctx| {
            probe.fetch_add(1, Ordering::SeqCst);
        });

        send(&app, Method::GET, "/nowhere").await;
        send(&app, Method::GET, "/nowhere").await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stream_value_flows_through_dispatch() {
        let mut app = App::new();
        app.get("/stream", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::Stream(ChunkStream::from_iter([
                "Streaming ",
                "data ",
            ]))))
        })
        .unwrap();

        let (status, body) = send(&app, Method::GET, "/stream").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"Streaming data ");
    }

    #[tokio::test]
    async fn test_query_string_reaches_handler() {
        let mut app = App::new();
        app.get("/message", |ctx: Arc<RequestContext>| async move {
            let name = ctx.query("name").unwrap_or("stranger").to_string();
            Ok(Some(ResponseValue::text(format!("Greetings, {name}!"))))
        })
        .unwrap();

        let (_, body) = send(&app, Method::GET, "/message?name=Ada").await;
        assert_eq!(&body[..], b"Greetings, Ada!");

        let (_, body) = send(&app, Method::GET, "/message").await;
        assert_eq!(&body[..], b"Greetings, stranger!");
    }

    #[tokio::test]
    async fn test_access_entry_reflects_request_and_response() {
        let mut app = App::new();
        app.get("/hello", |_ctx: Arc<RequestContext>| async {
            Ok(Some(ResponseValue::text("world")))
        })
        .unwrap();

        let mut ctx = RequestContext::new(Method::GET, "/hello?x=1");
        ctx.insert_header(header::USER_AGENT, "tester/1.0".parse().unwrap());
        let ctx = Arc::new(ctx);
        let response = dispatch(&app, &ctx).await;

        let entry = access_entry(&ctx, &response, Instant::now());
        assert_eq!(entry.remote_addr, "-");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/hello");
        assert_eq!(entry.query.as_deref(), Some("x=1"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body_bytes, 5);
        assert_eq!(entry.user_agent.as_deref(), Some("tester/1.0"));
    }
}
