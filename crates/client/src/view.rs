//! Record list view state.
//!
//! The registry provides no change feed, so every refresh is a full re-read
//! and the whole ordered set replaces the view state atomically; partial
//! results are never shown. Overlapping fetches are ordered by a request
//! sequence number: only the response matching the latest issued request is
//! applied, so a slow early read can never overwrite a fresher one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use registry_core::{RegistryError, RegistryRecord};

use crate::registry::RegistryClient;

#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Last fully-fetched record set, ascending by sequence index.
    pub records: Vec<RegistryRecord>,
    /// Present after a failed fetch; the view offers an explicit retry
    /// rather than a silent empty state.
    pub error: Option<RegistryError>,
    pub loading: bool,
}

pub struct RecordListView {
    client: Mutex<Option<Arc<RegistryClient>>>,
    state: Mutex<ListState>,
    issued: AtomicU64,
}

impl RecordListView {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
            state: Mutex::new(ListState::default()),
            issued: AtomicU64::new(0),
        }
    }

    pub fn set_client(&self, client: Option<Arc<RegistryClient>>) {
        *self.client.lock().unwrap() = client;
    }

    pub fn state(&self) -> ListState {
        self.state.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<RegistryRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// Whether the last fetch failed and a retry should be offered.
    pub fn can_retry(&self) -> bool {
        self.state.lock().unwrap().error.is_some()
    }

    /// Issue one full re-read of the record set.
    pub async fn refresh(&self) {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let client = self.client.lock().unwrap().clone();
        let Some(client) = client else {
            let mut state = self.state.lock().unwrap();
            state.loading = false;
            state.error = Some(RegistryError::NoBinding);
            return;
        };

        self.state.lock().unwrap().loading = true;
        let result = client.list_all().await;

        if self.issued.load(Ordering::SeqCst) != sequence {
            tracing::debug!(sequence, "discarding superseded list response");
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(records) => {
                tracing::debug!(count = records.len(), "record list refreshed");
                state.records = records;
                state.error = None;
            }
            Err(error) => {
                tracing::warn!("record list fetch failed: {error}");
                state.error = Some(error);
            }
        }
    }

    /// The explicit retry affordance: exactly one new fetch.
    pub async fn retry(&self) {
        self.refresh().await;
    }

    /// Signal-driven loop: one full re-read per refresh-counter change.
    pub async fn run(&self, mut refresh: watch::Receiver<u64>) {
        while refresh.changed().await.is_ok() {
            self.refresh().await;
        }
    }
}

impl Default for RecordListView {
    fn default() -> Self {
        Self::new()
    }
}
