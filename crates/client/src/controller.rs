//! Submission orchestration.
//!
//! One end-to-end pipeline per attempt:
//! Idle -> Validating -> Hashing (iff file) -> Submitting ->
//! AwaitingConfirmation -> Confirmed | Failed.
//!
//! At most one submission is in flight per controller; the guard is a state
//! flag checked and flipped under a lock that is never held across a
//! suspension point.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use registry_core::hasher;
use registry_core::{Receipt, RecordDraft, RegistryError, TxHash};

use crate::registry::RegistryClient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// A prior submission has not reached a terminal state yet. The prior
    /// attempt is unaffected; this one was never started.
    #[error("a submission is already in flight")]
    InProgress,

    /// Required fields are empty. Raised before any network activity.
    #[error("required fields are empty: {0:?}")]
    Validation(Vec<&'static str>),

    /// The attached file could not be hashed.
    #[error("attached file could not be read: {0}")]
    UnreadableInput(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Hashing,
    Submitting,
    AwaitingConfirmation,
}

#[derive(Debug, Default)]
struct Retained {
    /// Draft of the last failed attempt, kept so the user can retry without
    /// re-entering fields.
    draft: Option<RecordDraft>,
    /// Last transaction hash assigned by the node, kept for inspection even
    /// when the confirmation wait fails.
    last_tx: Option<TxHash>,
}

pub struct SubmissionController {
    client: Mutex<Option<Arc<RegistryClient>>>,
    phase: Mutex<SubmissionPhase>,
    retained: Mutex<Retained>,
    refresh: watch::Sender<u64>,
}

impl SubmissionController {
    pub fn new() -> Self {
        let (refresh, _) = watch::channel(0);
        Self {
            client: Mutex::new(None),
            phase: Mutex::new(SubmissionPhase::Idle),
            retained: Mutex::new(Retained::default()),
            refresh,
        }
    }

    /// Install (or clear) the registry binding used by subsequent attempts.
    /// An attempt already in flight keeps the binding it captured.
    pub fn set_client(&self, client: Option<Arc<RegistryClient>>) {
        *self.client.lock().unwrap() = client;
    }

    /// Monotonic counter bumped exactly once per confirmed submission.
    /// `RecordListView` re-reads the registry on every change.
    pub fn refresh_signal(&self) -> watch::Receiver<u64> {
        self.refresh.subscribe()
    }

    pub fn refresh_count(&self) -> u64 {
        *self.refresh.borrow()
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.lock().unwrap()
    }

    pub fn retained_draft(&self) -> Option<RecordDraft> {
        self.retained.lock().unwrap().draft.clone()
    }

    pub fn last_tx_hash(&self) -> Option<TxHash> {
        self.retained.lock().unwrap().last_tx
    }

    /// Run one submission attempt to a terminal state.
    pub async fn submit(&self, draft: RecordDraft) -> Result<Receipt, SubmitError> {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase != SubmissionPhase::Idle {
                return Err(SubmitError::InProgress);
            }
            *phase = SubmissionPhase::Validating;
        }

        let result = self.run_pipeline(&draft).await;

        match &result {
            Ok(receipt) => {
                {
                    let mut retained = self.retained.lock().unwrap();
                    retained.draft = None;
                    retained.last_tx = Some(receipt.tx_hash);
                }
                self.refresh.send_modify(|count| *count += 1);
                tracing::info!(tx = %receipt.tx_hash, "record submission confirmed");
            }
            Err(error) => {
                self.retained.lock().unwrap().draft = Some(draft);
                tracing::warn!("record submission failed: {error}");
            }
        }

        *self.phase.lock().unwrap() = SubmissionPhase::Idle;
        result
    }

    async fn run_pipeline(&self, draft: &RecordDraft) -> Result<Receipt, SubmitError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(SubmitError::Validation(missing));
        }

        let digest = match &draft.file {
            Some(path) => {
                self.set_phase(SubmissionPhase::Hashing);
                let digest = hasher::digest_file(path)
                    .await
                    .map_err(|e| SubmitError::UnreadableInput(e.to_string()))?;
                tracing::debug!(digest = %digest, "attached file hashed");
                Some(digest)
            }
            None => None,
        };

        let client = self
            .client
            .lock()
            .unwrap()
            .clone()
            .ok_or(SubmitError::Registry(RegistryError::NoBinding))?;

        self.set_phase(SubmissionPhase::Submitting);
        let pending = client.submit(draft, digest.as_ref()).await?;
        self.retained.lock().unwrap().last_tx = Some(pending.tx_hash);
        tracing::info!(tx = %pending.tx_hash, "transaction accepted by node");

        self.set_phase(SubmissionPhase::AwaitingConfirmation);
        let receipt = client.await_confirmation(&pending).await?;
        Ok(receipt)
    }

    fn set_phase(&self, phase: SubmissionPhase) {
        *self.phase.lock().unwrap() = phase;
    }
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new()
    }
}
