//! Minimal JSON-RPC 2.0 client over HTTP.
//!
//! Also owns the mapping from raw JSON-RPC failures to the typed error
//! taxonomy, so the gateway and contract modules never inspect error codes
//! themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use registry_core::{RegistryError, SwitchError, WalletError};

/// EIP-1193: user rejected the request.
const CODE_USER_REJECTED: i64 = 4001;
/// EIP-3085/3326: the wallet does not know the requested chain.
const CODE_UNKNOWN_CHAIN: i64 = 4902;
/// JSON-RPC: method not found.
pub(crate) const CODE_METHOD_NOT_FOUND: i64 = -32601;

/// Raw JSON-RPC failure, before classification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Call { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    pub(crate) fn code(&self) -> Option<i64> {
        match self {
            RpcError::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client bound to one endpoint URL.
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one request and decode its result field.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        if let Some(error) = envelope.error {
            tracing::debug!(method, code = error.code, "rpc error: {}", error.message);
            return Err(RpcError::Call {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| RpcError::Malformed(e.to_string()))
    }
}

/// Classify a failure from a wallet-boundary method.
pub(crate) fn wallet_error(error: RpcError) -> WalletError {
    match error {
        RpcError::Call {
            code: CODE_USER_REJECTED,
            ..
        } => WalletError::Rejected,
        RpcError::Transport(message) | RpcError::Malformed(message) => WalletError::Rpc(message),
        RpcError::Call { code, message } => WalletError::Rpc(format!("{code}: {message}")),
    }
}

/// Classify a failure from a chain-switch request.
pub(crate) fn switch_error(error: RpcError) -> SwitchError {
    match error.code() {
        Some(CODE_UNKNOWN_CHAIN) => SwitchError::UnknownChain,
        Some(CODE_USER_REJECTED) => SwitchError::Rejected,
        _ => SwitchError::Wallet(wallet_error(error)),
    }
}

/// Classify a failure from the contract call surface.
pub(crate) fn registry_error(error: RpcError) -> RegistryError {
    match error {
        RpcError::Call {
            code: CODE_USER_REJECTED,
            ..
        } => RegistryError::UserRejected,
        RpcError::Call { message, .. } if message.to_lowercase().contains("revert") => {
            if message.to_lowercase().contains("fee") {
                RegistryError::InsufficientFee
            } else {
                RegistryError::Reverted(message)
            }
        }
        RpcError::Call { code, message } => {
            RegistryError::RpcUnavailable(format!("{code}: {message}"))
        }
        RpcError::Transport(message) => RegistryError::RpcUnavailable(message),
        RpcError::Malformed(message) => RegistryError::Codec(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(code: i64, message: &str) -> RpcError {
        RpcError::Call {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn user_rejection_codes_are_classified() {
        assert_eq!(wallet_error(call(4001, "denied")), WalletError::Rejected);
        assert_eq!(
            registry_error(call(4001, "denied")),
            RegistryError::UserRejected
        );
        assert!(matches!(
            switch_error(call(4902, "unrecognized chain")),
            SwitchError::UnknownChain
        ));
    }

    #[test]
    fn revert_payloads_surface_verbatim_or_as_fee_mismatch() {
        assert_eq!(
            registry_error(call(-32000, "execution reverted: registration fee is 10 ETH")),
            RegistryError::InsufficientFee
        );
        assert_eq!(
            registry_error(call(-32000, "execution reverted: registry is sealed")),
            RegistryError::Reverted("execution reverted: registry is sealed".to_string())
        );
    }

    #[test]
    fn transport_failures_map_to_unavailable_node() {
        assert!(matches!(
            registry_error(RpcError::Transport("connection refused".into())),
            RegistryError::RpcUnavailable(_)
        ));
    }
}
