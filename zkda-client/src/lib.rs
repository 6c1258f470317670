//! Client for the zkda ledger service.
//!
//! Two independent components share the service's wire contract:
//!
//! - The **transition encoder** ([`encoder`]) turns user intents into
//!   canonical operation batches plus the verifiable-operation
//!   descriptors a downstream prover consumes, preserving the fixed
//!   witness-slot ordering the proving circuit expects.
//! - The **consistency retriever** ([`retriever`]) fetches published
//!   transition records by availability-network height, absorbing the
//!   window where the ledger has accepted a batch but the proof blob has
//!   not yet propagated to Celestia.
//!
//! [`LedgerClient`] is the HTTP surface both sit on; writes flow encoder
//! → ledger service, reads flow retriever ← availability network (via the
//! service's proxy endpoints), and the two never share in-flight state.

pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod retriever;

pub use client::{
    LedgerClient, MerkleProofData, ProvenValue, RootInfo, SyncStatus, TransitionReceipt,
};
pub use config::ClientConfig;
pub use encoder::{assemble_transfer, build_create_account, build_transfer, StateReader};
pub use error::LedgerError;
pub use retriever::{RetrieveState, RetryPolicy, TransitionRetriever, TransitionSource};
