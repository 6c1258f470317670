//! Bounded-retry retrieval of published transition records.
//!
//! The availability network propagates asynchronously: the ledger can
//! report a publication height before the blob is fetchable there. The
//! retriever absorbs that window with a fixed attempt budget and
//! exponential backoff, so callers observe either a complete record or a
//! terminal, recoverable failure, never an indefinite hang.
//!
//! Per selected height the machine runs
//! `Idle → Fetching → {Success | BackoffWait → Fetching | Failed}`;
//! `Failed` is only left through an explicit manual retry. Selecting a
//! different height supersedes the in-flight machine: no cancellation is
//! sent to an outstanding lookup, its completion is simply dropped when
//! it reports against a stale generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use zkda_common::TransitionRecord;

use crate::error::LedgerError;

/// Lookup seam for published transition records.
///
/// Implemented by [`crate::LedgerClient`]; tests script it.
#[async_trait]
pub trait TransitionSource {
    async fn transition_at(&self, height: u64) -> Result<TransitionRecord, LedgerError>;
}

/// Retry schedule: a fixed attempt budget with exponential backoff.
///
/// The defaults allow 5 attempts with waits of 1s, 2s, 4s and 8s between
/// them, roughly 15s of waiting before the failure is reported. The
/// budget is the timeout; there is no separate wall-clock deadline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Single-attempt policy: fail straight to `Failed` on the first miss.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Wait to schedule after a failed `attempt` (zero-based), or `None`
    /// once the budget is exhausted.
    pub fn backoff_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        Some(self.base_delay * 2u32.pow(attempt))
    }
}

/// Observable state of one height selection.
#[derive(Debug, Clone)]
pub enum RetrieveState {
    Idle,
    Fetching { attempt: u32 },
    BackoffWait { attempt: u32, delay: Duration },
    Success(Box<TransitionRecord>),
    Failed { message: String },
}

struct RetrieverInner {
    /// Bumped on every (re)selection; in-flight machines carry the value
    /// they were started with and drop completions that no longer match.
    generation: u64,
    selection: Option<u64>,
    state: RetrieveState,
}

/// Driver for retrieving one transition record at a time.
///
/// Cloneable handle over shared state; clones observe the same machine.
pub struct TransitionRetriever<S> {
    source: Arc<S>,
    policy: RetryPolicy,
    inner: Arc<Mutex<RetrieverInner>>,
}

impl<S> Clone for TransitionRetriever<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            policy: self.policy.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TransitionSource + Send + Sync> TransitionRetriever<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self {
            source: Arc::new(source),
            policy,
            inner: Arc::new(Mutex::new(RetrieverInner {
                generation: 0,
                selection: None,
                state: RetrieveState::Idle,
            })),
        }
    }

    /// Select a height and drive the machine until it is terminal.
    ///
    /// Any machine already in flight is superseded immediately, whatever
    /// state it was in.
    pub async fn select(&self, height: u64) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.selection = Some(height);
            inner.state = RetrieveState::Fetching { attempt: 0 };
            inner.generation
        };
        self.run(height, generation).await;
    }

    /// Manual retry from `Failed`: resets the attempt counter, clears
    /// the failure message, and re-enters `Fetching` for the current
    /// selection. A no-op in every other state.
    pub async fn retry(&self) {
        let (height, generation) = {
            let mut inner = self.inner.lock().await;
            let height = match (&inner.state, inner.selection) {
                (RetrieveState::Failed { .. }, Some(height)) => height,
                _ => return,
            };
            inner.generation += 1;
            inner.state = RetrieveState::Fetching { attempt: 0 };
            (height, inner.generation)
        };
        self.run(height, generation).await;
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> RetrieveState {
        self.inner.lock().await.state.clone()
    }

    /// Height currently selected, if any.
    pub async fn selection(&self) -> Option<u64> {
        self.inner.lock().await.selection
    }

    /// The retrieved record, once the machine reached `Success`.
    pub async fn record(&self) -> Option<TransitionRecord> {
        match &self.inner.lock().await.state {
            RetrieveState::Success(record) => Some((**record).clone()),
            _ => None,
        }
    }

    async fn run(&self, height: u64, generation: u64) {
        let mut attempt = 0;
        loop {
            let result = self.source.transition_at(height).await;

            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                // Superseded while the lookup was in flight.
                return;
            }

            match result {
                Ok(record) => {
                    debug!(height, attempt, "transition record retrieved");
                    inner.state = RetrieveState::Success(Box::new(record));
                    return;
                }
                Err(err) => match self.policy.backoff_delay(attempt) {
                    Some(delay) => {
                        debug!(height, attempt, error = %err, "lookup failed, backing off");
                        inner.state = RetrieveState::BackoffWait { attempt, delay };
                        drop(inner);

                        tokio::time::sleep(delay).await;

                        let mut inner = self.inner.lock().await;
                        if inner.generation != generation {
                            return;
                        }
                        attempt += 1;
                        inner.state = RetrieveState::Fetching { attempt };
                    }
                    None => {
                        warn!(height, attempts = self.policy.max_attempts, error = %err,
                            "giving up on transition lookup");
                        inner.state = RetrieveState::Failed {
                            message: format!(
                                "no transition record at height {height} after {} attempts; \
                                 the record may still be propagating",
                                self.policy.max_attempts
                            ),
                        };
                        return;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    fn record(height: u64) -> TransitionRecord {
        TransitionRecord {
            sequence: height,
            prev_root: [0; 32],
            new_root: [1; 32],
            public_inputs: vec![],
            proof: vec![0xaa],
            proof_size_bytes: 1,
            program_hash: [2; 32],
            celestia_height: height,
        }
    }

    /// Fails the first `fail_before` lookups, then succeeds, recording
    /// when each lookup arrived.
    struct ScriptedSource {
        fail_before: u32,
        calls: AtomicU32,
        call_times: StdMutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn failing(fail_before: u32) -> Self {
            Self {
                fail_before,
                calls: AtomicU32::new(0),
                call_times: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TransitionSource for ScriptedSource {
        async fn transition_at(&self, height: u64) -> Result<TransitionRecord, LedgerError> {
            self.call_times.lock().unwrap().push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_before {
                Err(LedgerError::NotYetAvailable { height })
            } else {
                Ok(record(height))
            }
        }
    }

    /// Succeeds immediately for height 2, never for anything else.
    struct PerHeightSource;

    #[async_trait]
    impl TransitionSource for PerHeightSource {
        async fn transition_at(&self, height: u64) -> Result<TransitionRecord, LedgerError> {
            if height == 2 {
                Ok(record(2))
            } else {
                Err(LedgerError::NotYetAvailable { height })
            }
        }
    }

    #[test]
    fn backoff_delays_double_then_stop() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Some(Duration::from_millis(1000)));
        assert_eq!(policy.backoff_delay(1), Some(Duration::from_millis(2000)));
        assert_eq!(policy.backoff_delay(2), Some(Duration::from_millis(4000)));
        assert_eq!(policy.backoff_delay(3), Some(Duration::from_millis(8000)));
        assert_eq!(policy.backoff_delay(4), None);
    }

    #[test]
    fn no_retry_policy_has_no_waits() {
        assert_eq!(RetryPolicy::no_retry().backoff_delay(0), None);
    }

    #[tokio::test]
    async fn starts_idle_with_no_selection() {
        let retriever = TransitionRetriever::new(PerHeightSource, RetryPolicy::default());
        assert!(matches!(retriever.state().await, RetrieveState::Idle));
        assert_eq!(retriever.selection().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_fifth_attempt_after_full_backoff() {
        let retriever =
            TransitionRetriever::new(ScriptedSource::failing(4), RetryPolicy::default());
        let started = Instant::now();

        retriever.select(42).await;

        // Four waits: 1s + 2s + 4s + 8s.
        assert_eq!(started.elapsed(), Duration::from_millis(15_000));

        let gaps: Vec<Duration> = {
            let times = retriever.source.call_times.lock().unwrap();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        };
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(8000),
            ]
        );

        match retriever.state().await {
            RetrieveState::Success(record) => assert_eq!(record.celestia_height, 42),
            other => panic!("expected success, got {other:?}"),
        }
        assert!(retriever.record().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_fails_then_manual_retry_succeeds() {
        let retriever =
            TransitionRetriever::new(ScriptedSource::failing(5), RetryPolicy::default());

        retriever.select(7).await;
        match retriever.state().await {
            RetrieveState::Failed { message } => {
                assert!(!message.is_empty());
                assert!(message.contains("height 7"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        // The sixth lookup succeeds; manual retry goes straight to success.
        retriever.retry().await;
        match retriever.state().await {
            RetrieveState::Success(record) => assert_eq!(record.celestia_height, 7),
            other => panic!("expected success after retry, got {other:?}"),
        }
        assert_eq!(retriever.source.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn retry_outside_failed_state_is_a_no_op() {
        let retriever = TransitionRetriever::new(PerHeightSource, RetryPolicy::default());
        retriever.retry().await;
        assert!(matches!(retriever.state().await, RetrieveState::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_fails_without_waiting() {
        let retriever =
            TransitionRetriever::new(ScriptedSource::failing(1), RetryPolicy::no_retry());
        let started = Instant::now();

        retriever.select(3).await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(retriever.state().await, RetrieveState::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_new_height_supersedes_the_old_machine() {
        let retriever = TransitionRetriever::new(PerHeightSource, RetryPolicy::default());

        // Height 1 never resolves; park it in its first backoff wait.
        let stale = {
            let retriever = retriever.clone();
            tokio::spawn(async move { retriever.select(1).await })
        };
        tokio::task::yield_now().await;
        assert!(matches!(
            retriever.state().await,
            RetrieveState::BackoffWait { attempt: 0, .. }
        ));

        // Height 2 resolves immediately and takes over the machine.
        retriever.select(2).await;
        match retriever.state().await {
            RetrieveState::Success(record) => assert_eq!(record.celestia_height, 2),
            other => panic!("expected success for height 2, got {other:?}"),
        }

        // Let the stale machine wake from its wait; it must observe the
        // newer generation and exit without touching the state.
        stale.await.unwrap();
        match retriever.state().await {
            RetrieveState::Success(record) => assert_eq!(record.celestia_height, 2),
            other => panic!("stale machine clobbered the state: {other:?}"),
        }
        assert_eq!(retriever.selection().await, Some(2));
    }
}
