//! Wallet boundary over JSON-RPC.
//!
//! Speaks the EIP-1193/EIP-3085 method surface (`eth_requestAccounts`,
//! `wallet_switchEthereumChain`, `wallet_addEthereumChain`, ...). A browser
//! extension pushes account/chain notifications; an HTTP endpoint cannot, so
//! this gateway derives the same discrete [`WalletEvent`]s from a polling
//! watcher task. Consumers see an identical subscription either way.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use registry_core::{
    AccountAddress, ChainDescriptor, ChainId, SignerRef, SwitchError, WalletError, WalletEvent,
    WalletGateway,
};

use crate::rpc::{
    CODE_METHOD_NOT_FOUND, JsonRpcClient, RpcError, switch_error, wallet_error,
};

pub struct EthWalletGateway {
    rpc: Arc<JsonRpcClient>,
    events: broadcast::Sender<WalletEvent>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl EthWalletGateway {
    pub fn new(rpc: Arc<JsonRpcClient>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            rpc,
            events,
            watcher: Mutex::new(None),
        }
    }

    /// Start the polling watcher that diffs accounts/chain and broadcasts
    /// change notifications. Idempotent: a running watcher is kept.
    pub fn spawn_watcher(&self, interval: Duration) {
        let mut guard = self.watcher.lock().unwrap();
        if guard.is_some() {
            return;
        }

        let rpc = self.rpc.clone();
        let events = self.events.clone();
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_accounts: Option<Vec<AccountAddress>> = None;
            let mut last_chain: Option<ChainId> = None;

            loop {
                ticker.tick().await;

                if let Ok(accounts) = fetch_accounts(&rpc).await {
                    if last_accounts.as_ref() != Some(&accounts) {
                        if last_accounts.is_some() {
                            let _ = events.send(WalletEvent::AccountsChanged(accounts.clone()));
                        }
                        last_accounts = Some(accounts);
                    }
                }

                if let Ok(chain) = fetch_chain(&rpc).await {
                    if last_chain != Some(chain) {
                        if last_chain.is_some() {
                            let _ = events.send(WalletEvent::ChainChanged(chain));
                        }
                        last_chain = Some(chain);
                    }
                }
            }
        }));
    }

    pub fn stop_watcher(&self) {
        if let Some(handle) = self.watcher.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for EthWalletGateway {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

async fn fetch_accounts(rpc: &JsonRpcClient) -> Result<Vec<AccountAddress>, WalletError> {
    let raw: Vec<String> = rpc
        .request("eth_accounts", json!([]))
        .await
        .map_err(wallet_error)?;
    parse_accounts(raw)
}

async fn fetch_chain(rpc: &JsonRpcClient) -> Result<ChainId, WalletError> {
    let raw: String = rpc
        .request("eth_chainId", json!([]))
        .await
        .map_err(wallet_error)?;
    ChainId::from_hex(&raw).map_err(|e| WalletError::Rpc(e.to_string()))
}

fn parse_accounts(raw: Vec<String>) -> Result<Vec<AccountAddress>, WalletError> {
    raw.iter()
        .map(|text| AccountAddress::parse(text).map_err(|e| WalletError::Rpc(e.to_string())))
        .collect()
}

#[async_trait]
impl WalletGateway for EthWalletGateway {
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, WalletError> {
        let result: Result<Vec<String>, RpcError> =
            self.rpc.request("eth_requestAccounts", json!([])).await;
        let raw = match result {
            Ok(raw) => raw,
            // Plain nodes (Ganache, Hardhat) expose only eth_accounts; their
            // unlocked accounts are already authorized.
            Err(RpcError::Call { code, .. }) if code == CODE_METHOD_NOT_FOUND => self
                .rpc
                .request("eth_accounts", json!([]))
                .await
                .map_err(wallet_error)?,
            // An unreachable endpoint on a connect attempt means there is no
            // wallet to talk to at all.
            Err(RpcError::Transport(_)) => return Err(WalletError::Unavailable),
            Err(error) => return Err(wallet_error(error)),
        };
        parse_accounts(raw)
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, WalletError> {
        fetch_accounts(&self.rpc).await
    }

    async fn active_chain_id(&self) -> Result<ChainId, WalletError> {
        fetch_chain(&self.rpc).await
    }

    async fn signer_for(&self, address: &AccountAddress) -> Result<SignerRef, WalletError> {
        let accounts = fetch_accounts(&self.rpc).await?;
        if !accounts.contains(address) {
            return Err(WalletError::Unauthorized(*address));
        }
        Ok(SignerRef::new(*address))
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), SwitchError> {
        tracing::debug!(chain = %chain_id.as_hex(), "requesting chain switch");
        self.rpc
            .request::<serde_json::Value>(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain_id.as_hex() }]),
            )
            .await
            .map(|_| ())
            .map_err(switch_error)
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), WalletError> {
        tracing::info!(chain = %chain.display_name, "requesting chain registration");
        self.rpc
            .request::<serde_json::Value>(
                "wallet_addEthereumChain",
                json!([{
                    "chainId": chain.chain_id.as_hex(),
                    "chainName": chain.display_name,
                    "nativeCurrency": {
                        "name": chain.currency.name,
                        "symbol": chain.currency.symbol,
                        "decimals": chain.currency.decimals,
                    },
                    "rpcUrls": [chain.rpc_url],
                }]),
            )
            .await
            .map(|_| ())
            .map_err(wallet_error)
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_parsing_rejects_malformed_entries() {
        let good = vec!["0x00112233445566778899aabbccddeeff00112233".to_string()];
        assert_eq!(parse_accounts(good).unwrap().len(), 1);

        let bad = vec!["0xnot-an-address".to_string()];
        assert!(parse_accounts(bad).is_err());
    }
}
