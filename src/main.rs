//! Binary entry point
//!
//! Loads configuration, builds the demo playground app and serves it on an
//! explicitly sized multi-thread tokio runtime.

mod demo;

use std::sync::Arc;

use yarde::config::Config;
use yarde::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = config.server.workers {
        runtime_builder.worker_threads(workers);
        println!("[CONFIG] Using {workers} worker threads");
    } else {
        println!("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&config)?;

    let addr = config.socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let app = Arc::new(demo::build_app(&config)?);

    logger::log_server_start(&addr, &config);
    server::serve(listener, app, &config).await?;

    Ok(())
}
