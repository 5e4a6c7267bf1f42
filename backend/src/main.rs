//! Service entry-point: loads settings, installs tracing, connects the user
//! store, and serves the users API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::{info, warn};

use workshop::config::AppConfig;
use workshop::inbound::http::health::HealthState;
use workshop::outbound::persistence::{DbPool, run_migrations};
use workshop::server::{ServerConfig, create_server};
use workshop::telemetry::init_tracing;

async fn connect_store(config: &AppConfig) -> Result<Option<DbPool>> {
    let Some(pool_config) = config.pool_config()? else {
        return Ok(None);
    };

    if config.run_migrations() {
        run_migrations(pool_config.database_url())
            .await
            .wrap_err("applying database migrations")?;
    } else {
        info!("database migrations disabled");
    }

    let redacted = pool_config.redacted_url();
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err_with(|| format!("connecting to {redacted}"))?;
    info!(database = %redacted, "database pool ready");
    Ok(Some(pool))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = AppConfig::load().wrap_err("loading configuration")?;
    config.validate().wrap_err("validating configuration")?;

    let sink = init_tracing(config.log_format()?, config.search_sink_uri()?)
        .wrap_err("initialising tracing")?;
    let sink_stats = sink.map(|worker| {
        let stats = worker.stats();
        actix_web::rt::spawn(worker.run());
        stats
    });

    let mut server_config = ServerConfig::new(config.bind_addr()?);
    if let Some(pool) = connect_store(&config).await? {
        server_config = server_config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), server_config)
        .wrap_err("starting http server")?;
    let outcome = server.await;
    health_state.mark_unhealthy();

    if let Some(stats) = sink_stats.filter(|stats| stats.dropped() > 0 || stats.failed() > 0) {
        warn!(
            delivered = stats.delivered(),
            failed = stats.failed(),
            dropped = stats.dropped(),
            "search sink lost log events"
        );
    }

    outcome.wrap_err("http server terminated")
}
