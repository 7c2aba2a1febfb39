//! Common types for registry interactions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Registration fee in whole native-currency units.
///
/// The contract rejects any submission whose value transfer differs from this
/// amount. Defined exactly once; backends convert to their smallest
/// denomination when building the transaction.
pub const REGISTRATION_FEE_UNITS: u64 = 10;

/// Error raised when parsing a hex-encoded identity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex identity: {0}")]
pub struct HexParseError(pub String);

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], HexParseError> {
    let stripped = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(stripped).map_err(|_| HexParseError(text.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| HexParseError(text.to_string()))
}

/// A 20-byte account identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress(pub [u8; 20]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn parse(text: &str) -> Result<Self, HexParseError> {
        decode_fixed(text).map(Self)
    }

    /// Shortened display form for logs: `0x1234...abcd`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Integer identifier of a blockchain network instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Wallet wire form: lowercase hex with `0x` prefix (1337 -> "0x539").
    pub fn as_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self, HexParseError> {
        let stripped = text.strip_prefix("0x").unwrap_or(text);
        u64::from_str_radix(stripped, 16)
            .map(Self)
            .map_err(|_| HexParseError(text.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-byte transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn parse(text: &str) -> Result<Self, HexParseError> {
        decode_fixed(text).map(Self)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// SHA-256 digest of attached file contents.
///
/// Rendered as a lowercase `0x`-prefixed hex string, the form stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn parse(text: &str) -> Result<Self, HexParseError> {
        decode_fixed(text).map(Self)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Opaque write capability bound to one account.
///
/// Only gateways hand these out; holding one means the wallet agreed to sign
/// state-changing calls for the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerRef {
    address: AccountAddress,
}

impl SignerRef {
    pub fn new(address: AccountAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }
}

/// Native currency metadata carried by an add-chain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to register an unknown network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub display_name: String,
    pub rpc_url: String,
    pub currency: NativeCurrency,
}

impl ChainDescriptor {
    /// The local development chain (Ganache/Hardhat on port 8545).
    pub fn local_chain() -> Self {
        Self {
            chain_id: ChainId(1337),
            display_name: "Localhost 8545".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            currency: NativeCurrency {
                name: "Ethereum".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
        }
    }
}

/// Client-side draft of a record pending submission.
///
/// Transient: discarded once the submission confirms, retained for retry when
/// it fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub name: String,
    pub reg_no: String,
    pub college_name: String,
    pub department: String,

    /// Optional file whose digest is stored alongside the record. The file
    /// itself never leaves the client.
    pub file: Option<PathBuf>,
}

impl RecordDraft {
    /// Names of required fields that are empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.reg_no.trim().is_empty() {
            missing.push("reg_no");
        }
        if self.college_name.trim().is_empty() {
            missing.push("college_name");
        }
        if self.department.trim().is_empty() {
            missing.push("department");
        }
        missing
    }
}

/// A record as observed on-chain. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// 1-based position matching on-chain append order.
    pub sequence_index: u64,

    pub name: String,
    pub reg_no: String,
    pub college_name: String,
    pub department: String,

    /// `None` when the on-chain digest field holds the empty sentinel.
    pub file_digest: Option<ContentDigest>,

    /// Seconds since the Unix epoch, as recorded by the chain.
    pub submitted_at: u64,

    pub submitter: AccountAddress,
}

/// Status of a dispatched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Accepted into the node's pool, not yet mined.
    Submitted,
    /// Mined and successful.
    Confirmed,
    /// Mined and reverted, or dropped.
    Failed(String),
}

/// A write in flight. Not persisted beyond the current attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub status: TxStatus,
}

/// Confirmation result for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Discrete state-transition notifications from the wallet boundary.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The authorized account list changed (possibly to empty).
    AccountsChanged(Vec<AccountAddress>),
    /// The wallet's active network changed.
    ChainChanged(ChainId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_hex_round_trip() {
        assert_eq!(ChainId(1337).as_hex(), "0x539");
        assert_eq!(ChainId(1).as_hex(), "0x1");
        assert_eq!(ChainId::from_hex("0x539").unwrap(), ChainId(1337));
        assert_eq!(ChainId::from_hex("539").unwrap(), ChainId(1337));
        assert!(ChainId::from_hex("0xzz").is_err());
    }

    #[test]
    fn address_parse_and_display() {
        let text = "0x00112233445566778899aabbccddeeff00112233";
        let addr = AccountAddress::parse(text).unwrap();
        assert_eq!(addr.to_string(), text);
        assert_eq!(addr.short(), "0x0011...2233");
        assert!(AccountAddress::parse("0x1234").is_err());
    }

    #[test]
    fn digest_display_is_lowercase_prefixed() {
        let digest = ContentDigest::from_bytes([0xAB; 32]);
        let text = digest.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text, text.to_lowercase());
        assert_eq!(ContentDigest::parse(&text).unwrap(), digest);
    }

    #[test]
    fn draft_reports_empty_fields_in_order() {
        let draft = RecordDraft {
            name: String::new(),
            reg_no: "A1".to_string(),
            college_name: "  ".to_string(),
            department: "Physics".to_string(),
            file: None,
        };
        assert_eq!(draft.missing_fields(), vec!["name", "college_name"]);

        let complete = RecordDraft {
            name: "Ada".to_string(),
            reg_no: "A1".to_string(),
            college_name: "X".to_string(),
            department: "Y".to_string(),
            file: None,
        };
        assert!(complete.missing_fields().is_empty());
    }
}
