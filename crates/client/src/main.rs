//! Record registry client binary.
//!
//! Composition root wiring the Ethereum backend into the orchestration
//! layer: configuration from environment, wallet gateway + contract surface
//! over one shared JSON-RPC client, session resume/connect, network
//! enforcement, and an initial full list read.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use registry_client::{App, EnsureOutcome, SessionView, logging};
use registry_eth::{EthConfig, EthRegistryContract, EthWalletGateway, JsonRpcClient};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    // 1. Load and validate configuration
    let config = EthConfig::from_env().map_err(|e| anyhow!(e))?;
    config.validate().map_err(|e| anyhow!(e))?;

    tracing::info!("Starting registry client");
    tracing::info!("RPC endpoint: {}", config.rpc_url);
    tracing::info!("Required chain: {}", config.chain.chain_id);

    // 2. Build the Ethereum backend over one shared RPC client
    let rpc = Arc::new(JsonRpcClient::new(config.rpc_url.clone()));
    let gateway = EthWalletGateway::new(rpc.clone());
    gateway.spawn_watcher(Duration::from_secs(2));

    let mut builder = App::builder()
        .gateway(gateway)
        .chain(config.chain.clone());

    match &config.contract_address {
        Some(address) => {
            let contract = EthRegistryContract::new(rpc, address)
                .map_err(|e| anyhow!("Invalid contract binding: {e}"))?
                .with_poll_interval(Duration::from_millis(config.poll_interval_ms));
            tracing::info!("Registry contract: {address}");
            builder = builder.contract(contract);
        }
        None => {
            tracing::warn!(
                "No contract address configured; registry operations will fail until \
                 REGISTRY_CONTRACT_ADDRESS is set"
            );
        }
    }

    let app = builder.build()?;
    app.start();

    // 3. Establish a session: passive resume first, interactive connect
    // otherwise
    match app.session().try_resume().await {
        Ok(Some(identity)) => {
            tracing::info!("Resumed session for {}", identity.address.short());
        }
        Ok(None) => {
            let identity = app
                .session()
                .connect()
                .await
                .context("Wallet connect failed")?;
            tracing::info!("Connected as {}", identity.address.short());
        }
        Err(error) => return Err(anyhow!("Wallet resume failed: {error}")),
    }

    // 4. Enforce the required chain; a requested switch completes
    // asynchronously and rebuilds the session when it lands
    if let SessionView::WrongNetwork { active, required, .. } = app.session().view() {
        tracing::warn!("Wrong network: active {active}, required {required}");
        match app.guard().ensure_chain().await {
            Ok(EnsureOutcome::SwitchRequested) => {
                tracing::info!("Chain switch requested; waiting for the wallet to confirm")
            }
            Ok(EnsureOutcome::AlreadyActive) => {}
            Err(error) => tracing::error!("Chain switch failed: {error}"),
        }
    }

    // 5. Bind the registry and read the current record set
    if let Err(error) = app.rebind().await {
        tracing::warn!("Registry binding unavailable: {error}");
    } else {
        let records = app.view().records();
        tracing::info!("Registry holds {} record(s)", records.len());
        for record in &records {
            tracing::info!(
                "#{} {} ({}) - {} / {} - submitted by {}",
                record.sequence_index,
                record.name,
                record.reg_no,
                record.college_name,
                record.department,
                record.submitter.short(),
            );
        }
    }

    app.shutdown();
    Ok(())
}
