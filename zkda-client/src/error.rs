//! Error types for the ledger client.

use thiserror::Error;

/// Aggregated error type for encoding, submission, and retrieval.
///
/// The first three variants are logical precondition failures: they abort
/// batch construction before any write is derived and are never retried,
/// since retrying cannot change them. [`LedgerError::NotYetAvailable`] is
/// the one recoverable class; it drives the retriever's backoff machine.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed intent, rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Sender key absent or not yet an account.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Sender balance below the requested amount.
    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: u64, requested: u64 },

    /// The availability network has no record at this height yet.
    #[error("no transition at height {height} yet")]
    NotYetAvailable { height: u64 },

    /// Non-2xx from the ledger service, with its own message when present.
    #[error("ledger service error: {0}")]
    Remote(String),

    /// Transport-level failure reaching the service.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Response payload that does not match the wire contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
