use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use form_batcher::config;
use form_batcher::db;
use form_batcher::dispatch;
use form_batcher::processor::ProcessingClient;
use form_batcher::retry::RetryPolicy;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one batch dispatch cycle against the processing API and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Give up on the first transport failure instead of applying the retry policy
    #[arg(long)]
    no_retry: bool,

    /// Override processing.batch_size for this run
    #[arg(long)]
    batch_size: Option<u32>,
}

#[tokio::main]
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

    let client = ProcessingClient::from_config(&cfg)?;
    let mut settings = cfg.dispatch_settings();
    if args.no_retry {
        settings.retry = RetryPolicy::no_retry();
    }
    if let Some(n) = args.batch_size.filter(|n| *n > 0) {
        settings.batch_size = n;
    }

    let before = db::count_by_status(&pool).await?;
    info!(
        pending = before.pending,
        failed = before.failed,
        success = before.success,
        endpoint = %client.endpoint(),
        "starting one-off dispatch"
    );

    let report = dispatch::dispatch(&pool, &client, &settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let after = db::count_by_status(&pool).await?;
    info!(
        pending = after.pending,
        failed = after.failed,
        success = after.success,
        "dispatch finished"
    );
    Ok(())
}
