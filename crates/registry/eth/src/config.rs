//! Ethereum backend configuration.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use registry_core::{ChainDescriptor, ChainId};

/// Key under which deployment tooling records the contract address in its
/// JSON address file.
const ADDRESS_FILE_KEY: &str = "RecordRegistry";

/// Ethereum-specific configuration.
#[derive(Debug, Clone)]
pub struct EthConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Deployed registry contract address. `None` means no binding: reads
    /// and writes both fail fast until deployment configuration appears.
    pub contract_address: Option<String>,

    /// The network the registry lives on, including everything an
    /// add-chain request needs.
    pub chain: ChainDescriptor,

    /// Receipt poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl EthConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REGISTRY_RPC_URL` - JSON-RPC endpoint (default: http://127.0.0.1:8545)
    /// - `REGISTRY_CONTRACT_ADDRESS` - deployed contract address
    /// - `REGISTRY_CONTRACT_ADDRESS_FILE` - JSON file written by deployment
    ///   tooling, consulted when the address variable is unset
    /// - `REGISTRY_CHAIN_ID` - required chain id (default: 1337)
    /// - `REGISTRY_POLL_INTERVAL_MS` - receipt poll interval (default: 500)
    pub fn from_env() -> Result<Self, String> {
        let rpc_url = env::var("REGISTRY_RPC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());

        let contract_address = match env::var("REGISTRY_CONTRACT_ADDRESS") {
            Ok(address) if !address.trim().is_empty() => Some(address),
            _ => match env::var("REGISTRY_CONTRACT_ADDRESS_FILE") {
                Ok(path) => read_address_file(Path::new(&path))?,
                Err(_) => None,
            },
        };

        let chain_id = match env::var("REGISTRY_CHAIN_ID") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("Invalid REGISTRY_CHAIN_ID: {raw}"))?,
            Err(_) => 1337,
        };

        let poll_interval_ms = env::var("REGISTRY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(500);

        let mut chain = ChainDescriptor::local_chain();
        chain.chain_id = ChainId(chain_id);
        chain.rpc_url = rpc_url.clone();

        Ok(Self {
            rpc_url,
            contract_address,
            chain,
            poll_interval_ms,
        })
    }

    /// Validate configuration before wiring anything to it.
    pub fn validate(&self) -> Result<(), String> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(format!("Invalid RPC URL format: {}", self.rpc_url));
        }

        if let Some(ref address) = self.contract_address {
            if registry_core::AccountAddress::parse(address).is_err() {
                return Err(format!("Invalid contract address: {address}"));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Read the deployed contract address from the JSON file deployment tooling
/// writes (`{"RecordRegistry": "0x..."}`). A missing file is not an error:
/// the contract simply is not deployed yet.
pub fn read_address_file(path: &Path) -> Result<Option<String>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read address file {}: {e}", path.display()))?;
    let entries: BTreeMap<String, String> = serde_json::from_str(&contents)
        .map_err(|e| format!("Malformed address file {}: {e}", path.display()))?;

    Ok(entries
        .get(ADDRESS_FILE_KEY)
        .cloned()
        .filter(|address| !address.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> EthConfig {
        EthConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: None,
            chain: ChainDescriptor::local_chain(),
            poll_interval_ms: 500,
        }
    }

    #[test]
    fn validates_rpc_url_scheme_and_address() {
        assert!(base_config().validate().is_ok());

        let mut bad_url = base_config();
        bad_url.rpc_url = "ws://127.0.0.1:8545".to_string();
        assert!(bad_url.validate().is_err());

        let mut bad_address = base_config();
        bad_address.contract_address = Some("0x1234".to_string());
        assert!(bad_address.validate().is_err());

        let mut good_address = base_config();
        good_address.contract_address =
            Some("0x00112233445566778899aabbccddeeff00112233".to_string());
        assert!(good_address.validate().is_ok());
    }

    #[test]
    fn address_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"RecordRegistry": "0x00112233445566778899aabbccddeeff00112233"}}"#
        )
        .unwrap();

        let address = read_address_file(file.path()).unwrap();
        assert_eq!(
            address.as_deref(),
            Some("0x00112233445566778899aabbccddeeff00112233")
        );
    }

    #[test]
    fn missing_address_file_is_no_binding() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_address_file(&dir.path().join("gone.json")).unwrap(), None);
    }
}
