//! Shared domain types for zkda clients.
//!
//! Everything here is wire-neutral in the sense of carrying no I/O: the
//! account codec, the operation batch shapes submitted to the ledger
//! service, and the read-only record types the ledger and availability
//! side produce. Serde derives on these types emit the service's JSON
//! wire format directly (base64 byte fields, hex root hashes,
//! externally tagged operation kinds).

mod account;
mod encoding;
mod operation;
mod record;

pub use account::{account_key, Account, ACCOUNT_ENCODED_LEN};
pub use operation::{Operation, OperationKind, TransitionBatch, VerifiableOperation};
pub use record::{Hash32, HistoryEntry, TransitionRecord};
