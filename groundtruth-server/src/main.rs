#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod error;
mod routes;
mod service;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use config::ServerConfig;
use log::info;
use routes::UploadLimit;
use service::PotholeService;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let service = web::Data::new(PotholeService::from_config(&config)?);
    let limit = web::Data::new(UploadLimit(config.max_payload_bytes));

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(limit.clone())
            .configure(routes::configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    info!("Listening on {}", config.bind_address);
    server
        .bind(&config.bind_address)
        .with_context(|| format!("Failed to bind {}", config.bind_address))?
        .run()
        .await?;

    Ok(())
}
