//! HTTP client for the ledger service API.
//!
//! All byte-valued fields travel base64-encoded; roots and hashes travel
//! as hex. Non-2xx responses carry `{ "error": string }` and the
//! service's own message is surfaced verbatim.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use zkda_common::{Hash32, HistoryEntry, TransitionBatch, TransitionRecord};

use crate::config::ClientConfig;
use crate::encoder::StateReader;
use crate::error::LedgerError;
use crate::retriever::TransitionSource;

/// HTTP client for the ledger service.
#[derive(Clone)]
pub struct LedgerClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl LedgerClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        Ok(Self { config, http })
    }

    /// Create a client for a specific URL, defaults elsewhere.
    pub fn with_url(base_url: impl Into<String>) -> Result<Self, LedgerError> {
        Self::new(ClientConfig::with_url(base_url))
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check if the service is healthy.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Get the latest state root.
    pub async fn latest_root(&self) -> Result<RootInfo, LedgerError> {
        let data: RootResponse = self.get_json("/root/latest", &[]).await?;
        Ok(RootInfo {
            root: parse_hash(&data.root)?,
            transition_index: data.transition_index,
            celestia_height: data.celestia_height,
        })
    }

    /// Get the service's sync status.
    pub async fn sync_status(&self) -> Result<SyncStatus, LedgerError> {
        let data: SyncStatusResponse = self.get_json("/sync/status", &[]).await?;
        Ok(SyncStatus {
            transition_index: data.transition_index,
            latest_root: parse_hash(&data.latest_root)?,
            celestia_enabled: data.celestia_enabled,
            last_celestia_height: data.last_celestia_height,
        })
    }

    /// Point lookup: the current value under a key, if any.
    pub async fn value(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.value_with_proof(key).await?.value)
    }

    /// Point lookup with the inclusion proof and the root it binds to.
    pub async fn value_with_proof(&self, key: &str) -> Result<ProvenValue, LedgerError> {
        let query = [("key", key.to_string()), ("encoding", "utf8".to_string())];
        let data: ValueResponse = self.get_json("/value", &query).await?;

        Ok(ProvenValue {
            value: data.value.map(|v| decode_base64(&v)).transpose()?,
            root: parse_hash(&data.root)?,
            proof: MerkleProofData {
                key_hash: parse_hash(&data.proof.key_hash)?,
                value: data.proof.value.map(|v| decode_base64(&v)).transpose()?,
                siblings: data
                    .proof
                    .siblings
                    .iter()
                    .map(|s| parse_hash(s))
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    /// Full batch history, ascending by sequence.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, LedgerError> {
        let data: HistoryResponse = self.get_json("/history", &[]).await?;
        Ok(data.entries)
    }

    /// Submit a transition batch for application and proving.
    pub async fn submit_transition(
        &self,
        batch: &TransitionBatch,
    ) -> Result<TransitionReceipt, LedgerError> {
        let url = format!("{}/transition", self.config.base_url);
        debug!(operations = batch.operations.len(), "submitting transition batch");

        let response = self
            .http
            .post(&url)
            .json(batch)
            .send()
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        let response = check_status(response).await?;
        let data: ApplyTransitionResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        Ok(TransitionReceipt {
            sequence: data.sequence,
            prev_root: parse_hash(&data.prev_root)?,
            new_root: parse_hash(&data.new_root)?,
            celestia_height: data.celestia_height,
            proof_size_bytes: data.proof_size_bytes,
        })
    }

    /// Fetch the published transition record at an availability height.
    ///
    /// A 404 means the blob has not propagated yet and maps to
    /// [`LedgerError::NotYetAvailable`]; callers wanting the bounded
    /// retry behavior go through [`crate::TransitionRetriever`].
    pub async fn transition_at(&self, height: u64) -> Result<TransitionRecord, LedgerError> {
        let url = format!("{}/celestia/transition", self.config.base_url);
        debug!(height, "fetching published transition");

        let response = self
            .http
            .get(&url)
            .query(&[("height", height)])
            .send()
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Err(LedgerError::NotYetAvailable { height });
        }

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    /// Fetch all published transition records in a height range.
    pub async fn transitions_in_range(
        &self,
        from_height: u64,
        to_height: u64,
    ) -> Result<Vec<TransitionRecord>, LedgerError> {
        let query = [
            ("from_height", from_height.to_string()),
            ("to_height", to_height.to_string()),
        ];
        let data: TransitionsResponse = self.get_json("/celestia/transitions", &query).await?;
        Ok(data.transitions)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LedgerError> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StateReader for LedgerClient {
    async fn proven_value(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.value(key).await
    }
}

#[async_trait]
impl TransitionSource for LedgerClient {
    async fn transition_at(&self, height: u64) -> Result<TransitionRecord, LedgerError> {
        LedgerClient::transition_at(self, height).await
    }
}

// Wire response types matching the API.

#[derive(Deserialize)]
struct RootResponse {
    root: String,
    transition_index: u64,
    celestia_height: Option<u64>,
}

#[derive(Deserialize)]
struct SyncStatusResponse {
    transition_index: u64,
    latest_root: String,
    celestia_enabled: bool,
    last_celestia_height: Option<u64>,
}

#[derive(Deserialize)]
struct ValueResponse {
    value: Option<String>,
    root: String,
    proof: MerkleProofResponse,
}

#[derive(Deserialize)]
struct MerkleProofResponse {
    key_hash: String,
    value: Option<String>,
    siblings: Vec<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct ApplyTransitionResponse {
    sequence: u64,
    prev_root: String,
    new_root: String,
    celestia_height: Option<u64>,
    proof_size_bytes: usize,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    transitions: Vec<TransitionRecord>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// Public result types.

/// Latest root as reported by the service.
#[derive(Debug, Clone)]
pub struct RootInfo {
    pub root: Hash32,
    pub transition_index: u64,
    pub celestia_height: Option<u64>,
}

/// Sync status of the service against the availability network.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub transition_index: u64,
    pub latest_root: Hash32,
    pub celestia_enabled: bool,
    pub last_celestia_height: Option<u64>,
}

/// Value plus the inclusion proof that binds it to a root.
#[derive(Debug, Clone)]
pub struct ProvenValue {
    pub value: Option<Vec<u8>>,
    pub root: Hash32,
    pub proof: MerkleProofData,
}

/// Inclusion proof data as served by the ledger.
#[derive(Debug, Clone)]
pub struct MerkleProofData {
    pub key_hash: Hash32,
    pub value: Option<Vec<u8>>,
    pub siblings: Vec<Hash32>,
}

/// Result of an accepted transition submission.
#[derive(Debug, Clone)]
pub struct TransitionReceipt {
    pub sequence: u64,
    pub prev_root: Hash32,
    pub new_root: Hash32,
    /// `None` until the proof blob is published to the availability network.
    pub celestia_height: Option<u64>,
    pub proof_size_bytes: usize,
}

// Helpers.

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
        return Err(LedgerError::Remote(err.error));
    }
    Err(LedgerError::Remote(format!("HTTP {status}: {body}")))
}

fn parse_hash(encoded: &str) -> Result<Hash32, LedgerError> {
    let bytes = hex::decode(encoded).map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidResponse("expected a 32-byte hash".to_string()))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, LedgerError> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    BASE64
        .decode(encoded)
        .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
}
