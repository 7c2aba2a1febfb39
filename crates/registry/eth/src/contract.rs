//! Registry contract bound to a deployed address.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::types::Address;
use serde::Deserialize;
use serde_json::json;

use registry_core::{
    ContentDigest, Receipt, RecordDraft, RegistryContract, RegistryError, RegistryRecord,
    SignerRef, TxHash,
};

use crate::codec;
use crate::rpc::{JsonRpcClient, registry_error};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Typed contract surface over raw JSON-RPC.
///
/// Writes go through `eth_sendTransaction` so the wallet/node holding the
/// account keys signs; this client never touches key material.
pub struct EthRegistryContract {
    rpc: Arc<JsonRpcClient>,
    address: Address,
    poll_interval: Duration,
}

impl EthRegistryContract {
    /// Bind to a deployed contract address. An unparseable address is an
    /// unusable binding and fails here rather than on first use.
    pub fn new(rpc: Arc<JsonRpcClient>, address: &str) -> Result<Self, RegistryError> {
        let address = address
            .parse::<Address>()
            .map_err(|_| RegistryError::NoBinding)?;
        Ok(Self {
            rpc,
            address,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn address_text(&self) -> String {
        format!("{:#x}", self.address)
    }
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    status: Option<String>,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
}

fn parse_hex_u64(text: &str) -> Option<u64> {
    u64::from_str_radix(text.strip_prefix("0x").unwrap_or(text), 16).ok()
}

#[async_trait]
impl RegistryContract for EthRegistryContract {
    async fn submit_record(
        &self,
        signer: &SignerRef,
        draft: &RecordDraft,
        digest: Option<&ContentDigest>,
        fee_units: u64,
    ) -> Result<TxHash, RegistryError> {
        let data = codec::encode_add_record(draft, digest);
        let value = codec::fee_in_wei(fee_units);

        tracing::debug!(
            from = %signer.address().short(),
            to = %self.address_text(),
            fee_units,
            "dispatching record submission"
        );

        let raw: String = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": signer.address().to_string(),
                    "to": self.address_text(),
                    "value": format!("{value:#x}"),
                    "data": format!("0x{}", hex::encode(&data)),
                }]),
            )
            .await
            .map_err(registry_error)?;

        TxHash::parse(&raw).map_err(|e| RegistryError::Codec(e.to_string()))
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, RegistryError> {
        // Polls until the node reports the transaction mined. No internal
        // timeout: callers wrap this in tokio::time::timeout when they need
        // one, and cancelling the wait does not touch the on-chain outcome.
        loop {
            let receipt: Option<RawReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await
                .map_err(registry_error)?;

            if let Some(receipt) = receipt {
                if receipt.status.as_deref() == Some("0x1") {
                    return Ok(Receipt {
                        tx_hash: *tx_hash,
                        block_number: receipt.block_number.as_deref().and_then(parse_hex_u64),
                    });
                }
                return Err(RegistryError::Reverted(format!(
                    "transaction {tx_hash} reverted"
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn list_records(&self) -> Result<Vec<RegistryRecord>, RegistryError> {
        let raw: String = self
            .rpc
            .request(
                "eth_call",
                json!([
                    {
                        "to": self.address_text(),
                        "data": format!("0x{}", hex::encode(codec::encode_list_call())),
                    },
                    "latest",
                ]),
            )
            .await
            .map_err(registry_error)?;

        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| RegistryError::Codec(e.to_string()))?;
        codec::decode_record_list(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_address_fails_at_bind_time() {
        let rpc = Arc::new(JsonRpcClient::new("http://127.0.0.1:8545"));
        assert!(matches!(
            EthRegistryContract::new(rpc.clone(), "not-an-address"),
            Err(RegistryError::NoBinding)
        ));
        assert!(
            EthRegistryContract::new(rpc, "0x00112233445566778899aabbccddeeff00112233").is_ok()
        );
    }

    #[test]
    fn hex_block_numbers_parse() {
        assert_eq!(parse_hex_u64("0x2a"), Some(42));
        assert_eq!(parse_hex_u64("2a"), Some(42));
        assert_eq!(parse_hex_u64("0xzz"), None);
    }
}
