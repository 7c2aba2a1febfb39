//! ABI encoding for the registry contract call surface.
//!
//! Solidity interface:
//!
//! ```solidity
//! function addRecord(string name, string regNo, string collegeName,
//!                    string department, string fileDigest) external payable;
//! function getAllRecords() external view
//!     returns (Record[] memory); // (string,string,string,string,string,uint256,address)
//! ```

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;
use ethers_core::utils::id;

use registry_core::{AccountAddress, ContentDigest, RecordDraft, RegistryError, RegistryRecord};

pub const ADD_RECORD_SIGNATURE: &str = "addRecord(string,string,string,string,string)";
pub const LIST_RECORDS_SIGNATURE: &str = "getAllRecords()";

/// Calldata for one record write. `None` digest becomes the empty-string
/// sentinel the contract stores.
pub fn encode_add_record(draft: &RecordDraft, digest: Option<&ContentDigest>) -> Vec<u8> {
    let digest_text = digest.map(|d| d.to_string()).unwrap_or_default();
    let mut data = id(ADD_RECORD_SIGNATURE).to_vec();
    data.extend(abi::encode(&[
        Token::String(draft.name.clone()),
        Token::String(draft.reg_no.clone()),
        Token::String(draft.college_name.clone()),
        Token::String(draft.department.clone()),
        Token::String(digest_text),
    ]));
    data
}

/// Calldata for the full-list read.
pub fn encode_list_call() -> Vec<u8> {
    id(LIST_RECORDS_SIGNATURE).to_vec()
}

/// Fee in wei for a whole-unit fee amount (18 decimals).
pub fn fee_in_wei(units: u64) -> U256 {
    U256::from(units) * U256::exp10(18)
}

fn record_param_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::Uint(256),
        ParamType::Address,
    ])
}

/// Decode the return data of `getAllRecords()` into ordered records.
///
/// Sequence indices are 1-based array positions; the chain's append-only
/// storage guarantees the order.
pub fn decode_record_list(raw: &[u8]) -> Result<Vec<RegistryRecord>, RegistryError> {
    let mut tokens = abi::decode(&[ParamType::Array(Box::new(record_param_type()))], raw)
        .map_err(|e| RegistryError::Codec(e.to_string()))?;

    let Some(Token::Array(items)) = tokens.pop() else {
        return Err(RegistryError::Codec("expected record array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| decode_record(position as u64 + 1, item))
        .collect()
}

fn decode_record(sequence_index: u64, token: Token) -> Result<RegistryRecord, RegistryError> {
    let Token::Tuple(fields) = token else {
        return Err(RegistryError::Codec("expected record tuple".to_string()));
    };
    let mut fields = fields.into_iter();

    let name = take_string(fields.next())?;
    let reg_no = take_string(fields.next())?;
    let college_name = take_string(fields.next())?;
    let department = take_string(fields.next())?;
    let digest_text = take_string(fields.next())?;

    let submitted_at = match fields.next() {
        // Epoch seconds fit u64 for any plausible timestamp; anything wider
        // is corrupt data, not precision to preserve.
        Some(Token::Uint(value)) if value <= U256::from(u64::MAX) => value.as_u64(),
        Some(Token::Uint(value)) => {
            return Err(RegistryError::Codec(format!("timestamp out of range: {value}")));
        }
        other => return Err(RegistryError::Codec(format!("expected timestamp, got {other:?}"))),
    };

    let submitter = match fields.next() {
        Some(Token::Address(address)) => AccountAddress::from_bytes(address.0),
        other => return Err(RegistryError::Codec(format!("expected address, got {other:?}"))),
    };

    let file_digest = if digest_text.is_empty() {
        None
    } else {
        Some(
            ContentDigest::parse(&digest_text)
                .map_err(|e| RegistryError::Codec(e.to_string()))?,
        )
    };

    Ok(RegistryRecord {
        sequence_index,
        name,
        reg_no,
        college_name,
        department,
        file_digest,
        submitted_at,
        submitter,
    })
}

fn take_string(token: Option<Token>) -> Result<String, RegistryError> {
    match token {
        Some(Token::String(value)) => Ok(value),
        other => Err(RegistryError::Codec(format!("expected string, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::H160;

    fn sample_draft() -> RecordDraft {
        RecordDraft {
            name: "Ada Lovelace".to_string(),
            reg_no: "REG-042".to_string(),
            college_name: "Analytical College".to_string(),
            department: "Mathematics".to_string(),
            file: None,
        }
    }

    #[test]
    fn add_record_calldata_starts_with_selector() {
        let data = encode_add_record(&sample_draft(), None);
        assert_eq!(&data[..4], id(ADD_RECORD_SIGNATURE).as_slice());
        // Five empty-capable strings still produce head + tail words.
        assert!(data.len() > 4 + 5 * 32);
    }

    #[test]
    fn missing_digest_is_encoded_as_empty_string() {
        let with_none = encode_add_record(&sample_draft(), None);
        let tail = abi::decode(
            &[
                ParamType::String,
                ParamType::String,
                ParamType::String,
                ParamType::String,
                ParamType::String,
            ],
            &with_none[4..],
        )
        .unwrap();
        assert_eq!(tail[4], Token::String(String::new()));
    }

    #[test]
    fn fee_is_ten_whole_units_in_wei() {
        assert_eq!(fee_in_wei(10), U256::exp10(19));
        assert_eq!(fee_in_wei(0), U256::zero());
    }

    #[test]
    fn record_list_round_trips_through_return_encoding() {
        let digest = ContentDigest::from_bytes([0x5a; 32]);
        let submitter = H160::from_low_u64_be(0xbeef);
        let tuple = |name: &str, digest_text: String, ts: u64| {
            Token::Tuple(vec![
                Token::String(name.to_string()),
                Token::String("R1".to_string()),
                Token::String("X".to_string()),
                Token::String("Y".to_string()),
                Token::String(digest_text),
                Token::Uint(U256::from(ts)),
                Token::Address(submitter),
            ])
        };
        let raw = abi::encode(&[Token::Array(vec![
            tuple("first", String::new(), 1_700_000_001),
            tuple("second", digest.to_string(), 1_700_000_002),
        ])]);

        let records = decode_record_list(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_index, 1);
        assert_eq!(records[0].file_digest, None);
        assert_eq!(records[1].sequence_index, 2);
        assert_eq!(records[1].file_digest, Some(digest));
        assert_eq!(records[1].submitted_at, 1_700_000_002);
        assert_eq!(
            records[1].submitter,
            AccountAddress::from_bytes(submitter.0)
        );
    }

    #[test]
    fn truncated_return_data_is_a_codec_error() {
        let raw = abi::encode(&[Token::Array(vec![])]);
        assert!(decode_record_list(&raw).unwrap().is_empty());
        assert!(matches!(
            decode_record_list(&raw[..raw.len() - 1]),
            Err(RegistryError::Codec(_))
        ));
    }
}
