//! ExternalSecret updater - webhook server entry point

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use externalsecret_updater::config::{Cli, Config};
use externalsecret_updater::kube_utils::create_client;
use externalsecret_updater::reloader::Reloader;
use externalsecret_updater::store::KubeResourceStore;
use externalsecret_updater::telemetry::{init_telemetry, TelemetryConfig};
use externalsecret_updater::webhook::{start_webhook_server, webhook_router, WebhookState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube's rustls client needs a process-wide crypto provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let config = match Config::try_from(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    init_telemetry(TelemetryConfig::default()).context("failed to initialize telemetry")?;

    info!(
        listen_addr = %config.listen_addr,
        cache_buster = config.cache_buster.enabled,
        wait_interval = ?config.cache_buster.wait_interval,
        "Starting ExternalSecret updater"
    );

    let client = create_client(config.kubeconfig.as_deref())
        .await
        .context("failed to create Kubernetes client")?;

    let store = Arc::new(KubeResourceStore::new(client));
    let reloader = Reloader::new(
        store,
        config.cache_buster.post_update_hook(),
        config.namespace_file.clone(),
    );

    let router = webhook_router(WebhookState::new(reloader), config.credentials.clone());
    start_webhook_server(config.listen_addr, router).await?;

    Ok(())
}
