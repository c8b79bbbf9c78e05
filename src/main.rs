use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use form_batcher::processor::ProcessingClient;
use form_batcher::{api, config, db, schedule};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    // Single scheduler task; cycles run back to back, never concurrently.
    let client = ProcessingClient::from_config(&cfg)?;
    let worker_pool = pool.clone();
    let ticks = cfg.schedule();
    let settings = cfg.dispatch_settings();
    tokio::spawn(async move {
        schedule::run_forever(&worker_pool, &client, ticks, settings).await;
    });

    info!(bind = %cfg.server.bind, "starting HTTP server");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .configure(api::init_app)
    })
    .bind(cfg.server.bind.as_str())
    .with_context(|| format!("failed to bind {}", cfg.server.bind))?
    .run()
    .await?;

    Ok(())
}
