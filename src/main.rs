use benchsrv::{BenchmarkApplication, DateCache, HttpServer, ServerConfig};
use color_eyre::eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_CONNECTIONS_VAR: &str = "BENCHSRV_MAX_CONNECTIONS";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging; RUST_LOG takes precedence over the default directive
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("benchsrv=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind = std::env::args().nth(1);
    let max_connections = std::env::var(MAX_CONNECTIONS_VAR).ok();
    let config = ServerConfig::from_args(bind.as_deref(), max_connections.as_deref())
        .wrap_err("Invalid command line or environment")?;

    let date = Arc::new(DateCache::new());
    let application =
        BenchmarkApplication::new(Arc::clone(&date)).wrap_err("Failed to register JSON contracts")?;

    info!(address = %config.bind_addr, max_connections = config.max_connections, "Starting benchmark server");

    let server = HttpServer::new(config, application).with_date_cache(date);
    server.run().await.wrap_err("Failed to run benchmark server")?;

    Ok(())
}
