//! Demo playground
//!
//! Wires a small example application onto the engine: logging middleware,
//! one route per return shape the dispatcher understands, two lazy routes
//! and a toy auth flow. Route bodies are deliberately throwaway content;
//! the engine underneath is the subject.

mod auth;
mod middleware;
mod routes;

use yarde::app::{App, AppOptions};
use yarde::config::Config;
use yarde::routing::PatternError;

/// Assemble the playground app from the loaded configuration
pub fn build_app(config: &Config) -> Result<App, PatternError> {
    let mut app = App::with_options(AppOptions {
        debug: config.http.debug,
        max_body_size: config.http.max_body_size,
        access_log: config
            .logging
            .access_log
            .then(|| config.logging.access_log_format.clone()),
    });

    app.on_request(|ctx| {
        println!("Request received: {} {}", ctx.method(), ctx.path());
    });
    app.on_error(|error, ctx| {
        eprintln!(
            "Global error handler: {} {}: {error}",
            ctx.method(),
            ctx.path()
        );
    });

    middleware::register(&mut app);
    // Static routes must be in the table before routes.rs registers the
    // single-segment `/:number` pattern; the table is first-match-wins.
    auth::register(&mut app)?;
    routes::register(&mut app)?;

    Ok(app)
}
