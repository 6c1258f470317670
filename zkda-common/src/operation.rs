//! Batch operations and verifiable-operation descriptors.
//!
//! A transition batch carries two parallel views of the same writes: the
//! plain operations the ledger applies, and the descriptors a downstream
//! prover consumes. `witness_index` pins each descriptor to the
//! positional witness slot the proving circuit expects; that ordering is
//! a contract with the prover, not a presentation detail.

use serde::{Deserialize, Serialize};

use crate::encoding::{base64_bytes, base64_bytes_opt};

/// Plain state write submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Insert {
        key: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
    },
    Delete {
        key: String,
    },
}

/// What a write means to the proving circuit.
///
/// Externally tagged on the wire: `"Set"`,
/// `{"CreateAccount":{"initial_balance":N}}`,
/// `{"Transfer":{"from":..,"to":..,"amount":N}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Raw write with no business-logic constraints.
    Set,
    /// Materialize an account with an initial balance.
    CreateAccount { initial_balance: u64 },
    /// Move funds between two accounts.
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
}

/// One write plus everything the prover needs beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableOperation {
    #[serde(rename = "op_type")]
    pub kind: OperationKind,
    /// The key being written.
    pub key: String,
    /// Value observed before the write; `None` when the key was absent.
    #[serde(with = "base64_bytes_opt")]
    pub old_value: Option<Vec<u8>>,
    /// Value after the write.
    #[serde(with = "base64_bytes_opt")]
    pub new_value: Option<Vec<u8>>,
    /// Positional witness slot in the circuit's expected input ordering.
    pub witness_index: usize,
}

/// One atomic set of writes, submitted and proven together.
///
/// Batches built by the encoder keep `operations` and
/// `verifiable_operations` at equal cardinality, with witness indices
/// running `0..n` in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionBatch {
    pub operations: Vec<Operation>,
    #[serde(default, with = "base64_bytes")]
    pub public_inputs: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub private_inputs: Vec<u8>,
    pub verifiable_operations: Vec<VerifiableOperation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_operation_wire_shape() {
        let op = Operation::Insert {
            key: "account:alice".into(),
            value: b"hello".to_vec(),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({ "type": "insert", "key": "account:alice", "value": "aGVsbG8=" })
        );
    }

    #[test]
    fn operation_kind_is_externally_tagged() {
        assert_eq!(serde_json::to_value(OperationKind::Set).unwrap(), json!("Set"));
        assert_eq!(
            serde_json::to_value(OperationKind::CreateAccount { initial_balance: 9 }).unwrap(),
            json!({ "CreateAccount": { "initial_balance": 9 } })
        );
        assert_eq!(
            serde_json::to_value(OperationKind::Transfer {
                from: "account:a".into(),
                to: "account:b".into(),
                amount: 5,
            })
            .unwrap(),
            json!({ "Transfer": { "from": "account:a", "to": "account:b", "amount": 5 } })
        );
    }

    #[test]
    fn descriptor_serializes_absent_old_value_as_null() {
        let descriptor = VerifiableOperation {
            kind: OperationKind::Set,
            key: "k".into(),
            old_value: None,
            new_value: Some(vec![1, 2]),
            witness_index: 0,
        };
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["op_type"], json!("Set"));
        assert_eq!(value["old_value"], json!(null));
        assert_eq!(value["new_value"], json!("AQI="));
        assert_eq!(value["witness_index"], json!(0));
    }

    #[test]
    fn batch_round_trips_through_json() {
        let batch = TransitionBatch {
            operations: vec![Operation::Insert {
                key: "k".into(),
                value: vec![0xff],
            }],
            public_inputs: b"public".to_vec(),
            private_inputs: vec![],
            verifiable_operations: vec![VerifiableOperation {
                kind: OperationKind::CreateAccount { initial_balance: 1 },
                key: "k".into(),
                old_value: None,
                new_value: Some(vec![0xff]),
                witness_index: 0,
            }],
        };
        let json = serde_json::to_string(&batch).unwrap();
        let recovered: TransitionBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, batch);
    }
}
