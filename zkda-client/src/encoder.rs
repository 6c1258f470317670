//! Transition encoding: user intents to canonical operation batches.
//!
//! The encoder owns the witness-ordering contract so callers never have
//! to: every batch pairs each plain write with a descriptor whose
//! `witness_index` is the slot the proving circuit expects. For
//! transfers that ordering is fixed as sender-then-recipient regardless
//! of how the account names compare lexically.

use async_trait::async_trait;
use tracing::debug;

use zkda_common::{
    account_key, Account, Operation, OperationKind, TransitionBatch, VerifiableOperation,
};

use crate::error::LedgerError;

/// Read seam for the current proven state of a key.
///
/// Implemented by [`crate::LedgerClient`]; tests substitute an in-memory
/// map.
#[async_trait]
pub trait StateReader {
    /// Current value under `key`, `None` when the key is absent.
    async fn proven_value(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;
}

/// Build the batch materializing a new account.
///
/// One insert of the encoded account at nonce zero, one
/// `CreateAccount` descriptor at witness slot 0.
pub fn build_create_account(
    name: &str,
    initial_balance: u64,
) -> Result<TransitionBatch, LedgerError> {
    if name.is_empty() {
        return Err(LedgerError::InvalidInput("account name is empty".into()));
    }

    let key = account_key(name);
    let value = Account::created(initial_balance).encode().to_vec();

    Ok(TransitionBatch {
        operations: vec![Operation::Insert {
            key: key.clone(),
            value: value.clone(),
        }],
        public_inputs: format!("create_account:{name}:{initial_balance}").into_bytes(),
        private_inputs: vec![],
        verifiable_operations: vec![VerifiableOperation {
            kind: OperationKind::CreateAccount { initial_balance },
            key,
            old_value: None,
            new_value: Some(value),
            witness_index: 0,
        }],
    })
}

/// Build a transfer batch, fetching the two accounts through `reader`.
///
/// Inputs are validated before any lookup is issued. The two point
/// lookups are independent requests joined before any write is derived;
/// there is no cross-key snapshot guarantee between them and no
/// compare-and-swap at submission time, so a concurrent external write
/// between read and submit goes undetected here.
pub async fn build_transfer<R: StateReader + Sync>(
    reader: &R,
    from: &str,
    to: &str,
    amount: u64,
) -> Result<TransitionBatch, LedgerError> {
    validate_transfer_inputs(from, to, amount)?;

    let from_key = account_key(from);
    let to_key = account_key(to);

    let (observed_from, observed_to) = tokio::try_join!(
        reader.proven_value(&from_key),
        reader.proven_value(&to_key),
    )?;
    debug!(%from, %to, amount, "transfer lookups complete");

    assemble_transfer(
        from,
        observed_from.as_deref(),
        to,
        observed_to.as_deref(),
        amount,
    )
}

/// Assemble a transfer batch from already-observed account values.
///
/// An absent recipient is treated as an implicit zero-balance account
/// that this transfer materializes; an absent (or undecodable) sender is
/// an error. The sender's descriptor always sits at witness slot 0 and
/// the recipient's at slot 1.
pub fn assemble_transfer(
    from: &str,
    observed_from: Option<&[u8]>,
    to: &str,
    observed_to: Option<&[u8]>,
    amount: u64,
) -> Result<TransitionBatch, LedgerError> {
    validate_transfer_inputs(from, to, amount)?;

    let sender = observed_from
        .and_then(Account::decode)
        .ok_or_else(|| LedgerError::AccountNotFound(from.to_string()))?;

    if sender.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            balance: sender.balance,
            requested: amount,
        });
    }

    let recipient = observed_to.and_then(Account::decode).unwrap_or_default();
    let new_recipient_balance = recipient.balance.checked_add(amount).ok_or_else(|| {
        LedgerError::InvalidInput(format!("recipient balance would overflow: {to}"))
    })?;

    let new_sender = Account::new(sender.balance - amount, sender.nonce + 1);
    let new_recipient = Account::new(new_recipient_balance, recipient.nonce);

    let from_key = account_key(from);
    let to_key = account_key(to);
    let kind = OperationKind::Transfer {
        from: from_key.clone(),
        to: to_key.clone(),
        amount,
    };

    Ok(TransitionBatch {
        operations: vec![
            Operation::Insert {
                key: from_key.clone(),
                value: new_sender.encode().to_vec(),
            },
            Operation::Insert {
                key: to_key.clone(),
                value: new_recipient.encode().to_vec(),
            },
        ],
        public_inputs: format!("transfer:{from}:{to}:{amount}").into_bytes(),
        private_inputs: vec![],
        verifiable_operations: vec![
            VerifiableOperation {
                kind: kind.clone(),
                key: from_key,
                old_value: observed_from.map(|v| v.to_vec()),
                new_value: Some(new_sender.encode().to_vec()),
                witness_index: 0,
            },
            VerifiableOperation {
                kind,
                key: to_key,
                old_value: observed_to.map(|v| v.to_vec()),
                new_value: Some(new_recipient.encode().to_vec()),
                witness_index: 1,
            },
        ],
    })
}

fn validate_transfer_inputs(from: &str, to: &str, amount: u64) -> Result<(), LedgerError> {
    if from.is_empty() || to.is_empty() {
        return Err(LedgerError::InvalidInput("account name is empty".into()));
    }
    if amount == 0 {
        return Err(LedgerError::InvalidInput(
            "transfer amount must be positive".into(),
        ));
    }
    // A self-transfer would burn a nonce and a proof on a no-op and
    // write the same key twice within one batch.
    if from == to {
        return Err(LedgerError::InvalidInput(format!(
            "cannot transfer from {from} to itself"
        )));
    }
    Ok(())
}
