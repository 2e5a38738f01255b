mod app;
mod auth;
mod config;
mod constants;
mod error;
mod handlers;
mod integrity;
mod state;

use actix_web::{web, HttpServer};
use anyhow::Context;
use clap::Parser;
use config::{Cli, Commands, ServerConfig, SettingsArgs};
use integrity::VerifiedTree;
use ipfs::uri::{ensure_ipfs_uri_prefix, extract_cid, make_gateway_url, strip_ipfs_uri_prefix};
use ipfs::{HttpIpfs, Ipfs};
use state::AppState;
use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    // Initialize tracing with env filter
    // Filter out actix-server worker shutdown messages
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info")
                    .add_directive("actix_server::worker=warn".parse().unwrap())
                    .add_directive("actix_server::accept=warn".parse().unwrap())
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.settings).await,
        Commands::Verify => {
            verify(&cli.settings).await;
            Ok(())
        }
        Commands::Pin { cid } => pin(&cli.settings, &cid).await,
        Commands::Cat { cid } => cat(&cli.settings, &cid).await,
    }
}

/// Log a startup failure and stop the process before anything is served
fn fatal(err: impl Display) -> ! {
    error!("{}", err);
    std::process::exit(1)
}

/// Load the configuration, connect to IPFS and verify the tree; exits on any failure
async fn verify(settings: &SettingsArgs) -> (ServerConfig, HttpIpfs, VerifiedTree) {
    let config = ServerConfig::load(settings).unwrap_or_else(|e| fatal(e));
    let ipfs = HttpIpfs::connect(&config.ipfs)
        .await
        .unwrap_or_else(|e| fatal(format!("fatal {:#}", e)));

    let tree = integrity::verify_tree(&ipfs, &config.tree)
        .await
        .unwrap_or_else(|e| fatal(e));
    tree.log();

    (config, ipfs, tree)
}

async fn serve(settings: &SettingsArgs) -> anyhow::Result<()> {
    info!(
        "Starting NFT metadata uploader (PID: {})",
        std::process::id()
    );

    // Routes are registered only once the tree is verified
    let (config, ipfs, _tree) = verify(settings).await;

    let config = Arc::new(config);
    let ipfs: Arc<dyn Ipfs> = Arc::new(ipfs);
    let state = web::Data::new(AppState::new(config.clone(), ipfs));
    let bind_address = config.bind_address();

    let server = HttpServer::new(move || app::app(state.clone()))
        .bind(&bind_address)
        .map_err(|e| {
            error!("Failed to bind to {}: {}", bind_address, e);
            e
        })?;

    info!("HTTP server running on http://{} ({})", bind_address, settings.environment);

    server.run().await?;
    Ok(())
}

/// Pin a CID on the remote pinning service
async fn pin(settings: &SettingsArgs, cid_or_uri: &str) -> anyhow::Result<()> {
    let ipfs_settings = config::load_ipfs_settings(settings)?;
    let cid = extract_cid(cid_or_uri)?.to_string();

    let ipfs = HttpIpfs::connect(&ipfs_settings).await?;
    ipfs.pin(&cid)
        .await
        .with_context(|| format!("Failed to pin {}", cid))?;

    info!(
        "{} is pinned, gateway URL: {}",
        ensure_ipfs_uri_prefix(&cid),
        make_gateway_url(&ipfs_settings.gateway_url, &cid)
    );
    Ok(())
}

/// Write the content behind a CID or `ipfs://<cid>/<path>` URI to stdout
async fn cat(settings: &SettingsArgs, cid_or_uri: &str) -> anyhow::Result<()> {
    let ipfs_settings = config::load_ipfs_settings(settings)?;
    // Validates the root CID; the daemon resolves any path below it
    extract_cid(cid_or_uri)?;
    let path = strip_ipfs_uri_prefix(cid_or_uri);

    let ipfs = HttpIpfs::connect(&ipfs_settings).await?;
    let content = ipfs
        .cat(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}
