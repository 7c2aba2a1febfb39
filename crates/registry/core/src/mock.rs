//! Mock wallet and contract for testing without a node.
//!
//! Both doubles are scriptable: tests flip accounts, chains and failure modes
//! and observe the exact requests the client issued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{RegistryError, SwitchError, WalletError};
use crate::traits::{RegistryContract, WalletGateway};
use crate::types::{
    AccountAddress, ChainDescriptor, ChainId, ContentDigest, REGISTRATION_FEE_UNITS, Receipt,
    RecordDraft, RegistryRecord, SignerRef, TxHash, WalletEvent,
};

/// Deterministic throwaway address for tests: `index` repeated.
pub fn test_address(index: u8) -> AccountAddress {
    AccountAddress::from_bytes([index; 20])
}

// ============================================================================
// MockWallet
// ============================================================================

#[derive(Debug)]
struct WalletState {
    available: bool,
    accounts: Vec<AccountAddress>,
    chain: ChainId,
    signer_enabled: bool,
    reject_requests: bool,
    known_chains: HashSet<u64>,
    /// Whether a switch request takes effect immediately (emitting the
    /// chain-changed notification) or stays pending.
    auto_switch: bool,
    switch_requests: Vec<ChainId>,
    added_chains: Vec<ChainDescriptor>,
}

/// In-memory wallet extension double.
#[derive(Clone)]
pub struct MockWallet {
    state: Arc<Mutex<WalletState>>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    pub fn new(chain: ChainId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(Mutex::new(WalletState {
                available: true,
                accounts: vec![test_address(1)],
                chain,
                signer_enabled: true,
                reject_requests: false,
                known_chains: HashSet::from([chain.0]),
                auto_switch: true,
                switch_requests: Vec::new(),
                added_chains: Vec::new(),
            })),
            events,
        }
    }

    /// Simulate a missing wallet extension.
    pub fn set_available(&self, available: bool) {
        self.state.lock().unwrap().available = available;
    }

    /// Replace the account list and notify subscribers, as the extension
    /// does when the user switches or revokes accounts.
    pub fn set_accounts(&self, accounts: Vec<AccountAddress>) {
        self.state.lock().unwrap().accounts = accounts.clone();
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    /// Change the active chain and notify subscribers.
    pub fn set_chain(&self, chain: ChainId) {
        self.state.lock().unwrap().chain = chain;
        let _ = self.events.send(WalletEvent::ChainChanged(chain));
    }

    pub fn set_signer_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().signer_enabled = enabled;
    }

    /// Make every interactive request fail as a user rejection.
    pub fn set_reject_requests(&self, reject: bool) {
        self.state.lock().unwrap().reject_requests = reject;
    }

    pub fn add_known_chain(&self, chain: ChainId) {
        self.state.lock().unwrap().known_chains.insert(chain.0);
    }

    /// When disabled, switch requests are recorded but never take effect,
    /// modelling a user who leaves the wallet prompt unanswered.
    pub fn set_auto_switch(&self, auto: bool) {
        self.state.lock().unwrap().auto_switch = auto;
    }

    /// All chain ids the client asked to switch to, in request order.
    pub fn switch_requests(&self) -> Vec<ChainId> {
        self.state.lock().unwrap().switch_requests.clone()
    }

    pub fn added_chains(&self) -> Vec<ChainDescriptor> {
        self.state.lock().unwrap().added_chains.clone()
    }
}

#[async_trait]
impl WalletGateway for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, WalletError> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        if state.reject_requests {
            return Err(WalletError::Rejected);
        }
        Ok(state.accounts.clone())
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, WalletError> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        Ok(state.accounts.clone())
    }

    async fn active_chain_id(&self) -> Result<ChainId, WalletError> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        Ok(state.chain)
    }

    async fn signer_for(&self, address: &AccountAddress) -> Result<SignerRef, WalletError> {
        let state = self.state.lock().unwrap();
        if !state.signer_enabled || !state.accounts.contains(address) {
            return Err(WalletError::Unauthorized(*address));
        }
        Ok(SignerRef::new(*address))
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), SwitchError> {
        let (known, auto) = {
            let mut state = self.state.lock().unwrap();
            state.switch_requests.push(chain_id);
            if state.reject_requests {
                return Err(SwitchError::Rejected);
            }
            (state.known_chains.contains(&chain_id.0), state.auto_switch)
        };
        if !known {
            return Err(SwitchError::UnknownChain);
        }
        if auto {
            self.set_chain(chain_id);
        }
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), WalletError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_requests {
            return Err(WalletError::Rejected);
        }
        state.known_chains.insert(chain.chain_id.0);
        state.added_chains.push(chain.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// MockRegistry
// ============================================================================

#[derive(Debug, Clone)]
struct PendingWrite {
    draft: RecordDraft,
    digest: Option<ContentDigest>,
    submitter: AccountAddress,
}

#[derive(Debug, Default)]
struct RegistryState {
    records: Vec<RegistryRecord>,
    pending: Vec<(TxHash, PendingWrite)>,
    tx_counter: u64,
    clock: u64,
    submit_calls: u64,
    list_calls: u64,
    last_fee_units: Option<u64>,
    last_digest_text: Option<String>,
    fail_submit: Option<RegistryError>,
    fail_confirmation: Option<RegistryError>,
    fail_list: Option<RegistryError>,
    hold_confirmations: bool,
    list_delay: Option<Duration>,
}

/// In-memory registry contract double.
///
/// Confirmed writes append to an ordered record list with gap-free 1-based
/// sequence indices, matching the on-chain append rule.
#[derive(Clone)]
pub struct MockRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                clock: 1_700_000_000,
                ..RegistryState::default()
            })),
        }
    }

    pub fn submit_calls(&self) -> u64 {
        self.state.lock().unwrap().submit_calls
    }

    pub fn list_calls(&self) -> u64 {
        self.state.lock().unwrap().list_calls
    }

    /// Value transfer carried by the most recent submission.
    pub fn last_fee_units(&self) -> Option<u64> {
        self.state.lock().unwrap().last_fee_units
    }

    /// Digest string carried by the most recent submission (empty sentinel
    /// included), exactly as it would appear in calldata.
    pub fn last_digest_text(&self) -> Option<String> {
        self.state.lock().unwrap().last_digest_text.clone()
    }

    pub fn record_count(&self) -> u64 {
        self.state.lock().unwrap().records.len() as u64
    }

    pub fn fail_next_submit(&self, error: RegistryError) {
        self.state.lock().unwrap().fail_submit = Some(error);
    }

    pub fn fail_next_confirmation(&self, error: RegistryError) {
        self.state.lock().unwrap().fail_confirmation = Some(error);
    }

    pub fn fail_next_list(&self, error: RegistryError) {
        self.state.lock().unwrap().fail_list = Some(error);
    }

    /// Park confirmation waits until [`release_confirmations`] is called.
    ///
    /// [`release_confirmations`]: MockRegistry::release_confirmations
    pub fn hold_confirmations(&self, hold: bool) {
        self.state.lock().unwrap().hold_confirmations = hold;
    }

    pub fn release_confirmations(&self) {
        self.state.lock().unwrap().hold_confirmations = false;
    }

    /// Delay the next list read, for exercising stale-response suppression.
    pub fn delay_next_list(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = Some(delay);
    }

    /// Append a record directly, bypassing the submission pipeline.
    pub fn seed_record(&self, draft: &RecordDraft, submitter: AccountAddress) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let timestamp = state.clock;
        append_record(&mut state.records, draft, None, submitter, timestamp);
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn append_record(
    records: &mut Vec<RegistryRecord>,
    draft: &RecordDraft,
    digest: Option<ContentDigest>,
    submitter: AccountAddress,
    timestamp: u64,
) {
    let sequence_index = records.len() as u64 + 1;
    records.push(RegistryRecord {
        sequence_index,
        name: draft.name.clone(),
        reg_no: draft.reg_no.clone(),
        college_name: draft.college_name.clone(),
        department: draft.department.clone(),
        file_digest: digest,
        submitted_at: timestamp,
        submitter,
    });
}

#[async_trait]
impl RegistryContract for MockRegistry {
    async fn submit_record(
        &self,
        signer: &SignerRef,
        draft: &RecordDraft,
        digest: Option<&ContentDigest>,
        fee_units: u64,
    ) -> Result<TxHash, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;
        state.last_fee_units = Some(fee_units);
        state.last_digest_text = Some(digest.map(|d| d.to_string()).unwrap_or_default());

        if let Some(error) = state.fail_submit.take() {
            return Err(error);
        }
        if fee_units != REGISTRATION_FEE_UNITS {
            return Err(RegistryError::InsufficientFee);
        }

        state.tx_counter += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&state.tx_counter.to_be_bytes());
        let tx_hash = TxHash::from_bytes(bytes);

        state.pending.push((
            tx_hash,
            PendingWrite {
                draft: draft.clone(),
                digest: digest.copied(),
                submitter: *signer.address(),
            },
        ));
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, RegistryError> {
        while self.state.lock().unwrap().hold_confirmations {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_confirmation.take() {
            return Err(error);
        }

        let position = state
            .pending
            .iter()
            .position(|(hash, _)| hash == tx_hash)
            .ok_or_else(|| RegistryError::Codec(format!("unknown transaction {tx_hash}")))?;
        let (_, write) = state.pending.remove(position);

        state.clock += 1;
        let timestamp = state.clock;
        append_record(
            &mut state.records,
            &write.draft,
            write.digest,
            write.submitter,
            timestamp,
        );

        Ok(Receipt {
            tx_hash: *tx_hash,
            block_number: Some(state.records.len() as u64),
        })
    }

    async fn list_records(&self) -> Result<Vec<RegistryRecord>, RegistryError> {
        // Snapshot at request time; an artificial delay then models this
        // response arriving after fresher reads completed.
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            let result = match state.fail_list.take() {
                Some(error) => Err(error),
                None => Ok(state.records.clone()),
            };
            (state.list_delay.take(), result)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> RecordDraft {
        RecordDraft {
            name: name.to_string(),
            reg_no: "R1".to_string(),
            college_name: "X".to_string(),
            department: "Y".to_string(),
            file: None,
        }
    }

    #[tokio::test]
    async fn submit_then_confirm_appends_in_order() {
        let registry = MockRegistry::new();
        let signer = SignerRef::new(test_address(1));

        for name in ["a", "b", "c"] {
            let tx = registry
                .submit_record(&signer, &draft(name), None, REGISTRATION_FEE_UNITS)
                .await
                .unwrap();
            registry.await_confirmation(&tx).await.unwrap();
        }

        let records = registry.list_records().await.unwrap();
        let indices: Vec<u64> = records.iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(records.windows(2).all(|w| w[0].submitted_at <= w[1].submitted_at));
    }

    #[tokio::test]
    async fn short_fee_is_rejected() {
        let registry = MockRegistry::new();
        let signer = SignerRef::new(test_address(1));

        let result = registry
            .submit_record(&signer, &draft("a"), None, REGISTRATION_FEE_UNITS - 1)
            .await;
        assert_eq!(result, Err(RegistryError::InsufficientFee));
        assert_eq!(registry.record_count(), 0);
    }

    #[tokio::test]
    async fn wallet_switch_to_unknown_chain_fails_until_added() {
        let wallet = MockWallet::new(ChainId(1));

        let result = wallet.switch_chain(ChainId(1337)).await;
        assert!(matches!(result, Err(SwitchError::UnknownChain)));

        wallet
            .add_chain(&ChainDescriptor::local_chain())
            .await
            .unwrap();

        let mut events = wallet.subscribe();
        wallet.switch_chain(ChainId(1337)).await.unwrap();
        assert_eq!(wallet.active_chain_id().await.unwrap(), ChainId(1337));
        assert!(matches!(
            events.recv().await.unwrap(),
            WalletEvent::ChainChanged(ChainId(1337))
        ));
    }
}
