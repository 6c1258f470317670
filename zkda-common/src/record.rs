//! Read-only records produced by the ledger and availability side.

use serde::{Deserialize, Serialize};

use crate::encoding::{base64_bytes, hex_hash};

/// 32-byte state root or program hash.
pub type Hash32 = [u8; 32];

/// One accepted batch in the ledger's history.
///
/// `celestia_height` stays `None` until the proof blob lands on the
/// availability network; once set it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    #[serde(with = "hex_hash")]
    pub root: Hash32,
    pub celestia_height: Option<u64>,
}

/// The full externally-verifiable artifact for one accepted batch,
/// retrieved from the availability network by published height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub sequence: u64,
    #[serde(with = "hex_hash")]
    pub prev_root: Hash32,
    #[serde(with = "hex_hash")]
    pub new_root: Hash32,
    #[serde(with = "base64_bytes")]
    pub public_inputs: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub proof: Vec<u8>,
    pub proof_size_bytes: usize,
    #[serde(with = "hex_hash")]
    pub program_hash: Hash32,
    pub celestia_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_entry_round_trips_with_hex_root() {
        let entry = HistoryEntry {
            sequence: 3,
            root: [0xab; 32],
            celestia_height: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["root"], json!("ab".repeat(32)));
        assert_eq!(value["celestia_height"], json!(null));
        let recovered: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(recovered, entry);
    }

    #[test]
    fn transition_record_parses_service_json() {
        let value = json!({
            "sequence": 5,
            "prev_root": "00".repeat(32),
            "new_root": "11".repeat(32),
            "public_inputs": "cHVibGlj",
            "proof": "AQID",
            "proof_size_bytes": 3,
            "program_hash": "22".repeat(32),
            "celestia_height": 900,
        });
        let record: TransitionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.sequence, 5);
        assert_eq!(record.new_root, [0x11; 32]);
        assert_eq!(record.public_inputs, b"public");
        assert_eq!(record.proof, vec![1, 2, 3]);
        assert_eq!(record.proof_size_bytes, 3);
        assert_eq!(record.celestia_height, 900);
    }

    #[test]
    fn truncated_hash_is_rejected() {
        let value = json!({
            "sequence": 0,
            "root": "abcd",
            "celestia_height": 1,
        });
        assert!(serde_json::from_value::<HistoryEntry>(value).is_err());
    }
}
