//! End-to-end submission pipeline: validation, hashing, fee, confirmation,
//! non-reentrancy, retry, and stale-session handling.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use registry_client::{
    DisconnectPreference, RegistryClient, SubmissionController, SubmissionPhase, SubmitError,
    WalletSession,
};
use registry_core::mock::{MockRegistry, MockWallet, test_address};
use registry_core::{ChainId, RecordDraft, RegistryContract, RegistryError};

const REQUIRED: ChainId = ChainId(1337);

const EMPTY_SHA256: &str =
    "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

struct Harness {
    wallet: MockWallet,
    registry: MockRegistry,
    session: Arc<WalletSession>,
    controller: Arc<SubmissionController>,
    _dir: tempfile::TempDir,
}

async fn connected_harness() -> Harness {
    let wallet = MockWallet::new(REQUIRED);
    let registry = MockRegistry::new();
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(WalletSession::new(
        Arc::new(wallet.clone()),
        REQUIRED,
        DisconnectPreference::at(dir.path().join("flag")),
    ));
    session.clone().spawn_watcher();
    session.connect().await.unwrap();

    let client = RegistryClient::bind(Some(Arc::new(registry.clone())), &session).unwrap();
    let controller = Arc::new(SubmissionController::new());
    controller.set_client(Some(Arc::new(client)));

    Harness {
        wallet,
        registry,
        session,
        controller,
        _dir: dir,
    }
}

fn valid_draft() -> RecordDraft {
    RecordDraft {
        name: "Ada Lovelace".to_string(),
        reg_no: "REG-042".to_string(),
        college_name: "Analytical College".to_string(),
        department: "Mathematics".to_string(),
        file: None,
    }
}

#[tokio::test]
async fn empty_field_fails_before_any_network_call() {
    let harness = connected_harness().await;
    let draft = RecordDraft {
        name: String::new(),
        reg_no: "A1".to_string(),
        college_name: "X".to_string(),
        department: "Y".to_string(),
        file: None,
    };

    let error = harness.controller.submit(draft.clone()).await.unwrap_err();
    assert_eq!(error, SubmitError::Validation(vec!["name"]));

    assert_eq!(harness.registry.submit_calls(), 0);
    assert_eq!(harness.controller.refresh_count(), 0);
    assert_eq!(harness.controller.retained_draft(), Some(draft));
}

#[tokio::test]
async fn zero_byte_file_yields_well_known_digest_and_exact_fee() {
    let harness = connected_harness().await;

    let file = tempfile::NamedTempFile::new().unwrap();
    let mut draft = valid_draft();
    draft.file = Some(file.path().to_path_buf());

    harness.controller.submit(draft).await.unwrap();

    assert_eq!(harness.registry.last_digest_text().as_deref(), Some(EMPTY_SHA256));
    assert_eq!(harness.registry.last_fee_units(), Some(10));

    let records = harness.registry.list_records().await.unwrap();
    assert_eq!(records[0].file_digest.unwrap().to_string(), EMPTY_SHA256);
}

#[tokio::test]
async fn missing_file_sends_empty_digest_sentinel() {
    let harness = connected_harness().await;
    harness.controller.submit(valid_draft()).await.unwrap();

    assert_eq!(harness.registry.last_digest_text().as_deref(), Some(""));
    let records = harness.registry.list_records().await.unwrap();
    assert_eq!(records[0].file_digest, None);
}

#[tokio::test]
async fn unreadable_file_blocks_submission() {
    let harness = connected_harness().await;
    let dir = tempfile::tempdir().unwrap();

    let mut draft = valid_draft();
    draft.file = Some(dir.path().join("vanished.pdf"));

    let error = harness.controller.submit(draft).await.unwrap_err();
    assert!(matches!(error, SubmitError::UnreadableInput(_)));
    assert_eq!(harness.registry.submit_calls(), 0);
}

#[tokio::test]
async fn confirmed_submission_clears_draft_and_signals_once() {
    let harness = connected_harness().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"degree certificate").unwrap();
    let mut draft = valid_draft();
    draft.file = Some(file.path().to_path_buf());

    assert_eq!(harness.controller.refresh_count(), 0);
    harness.controller.submit(draft).await.unwrap();

    assert_eq!(harness.controller.phase(), SubmissionPhase::Idle);
    assert_eq!(harness.controller.retained_draft(), None);
    assert!(harness.controller.last_tx_hash().is_some());
    // The refresh signal strictly increases exactly once per confirmation.
    assert_eq!(harness.controller.refresh_count(), 1);

    harness.controller.submit(valid_draft()).await.unwrap();
    assert_eq!(harness.controller.refresh_count(), 2);
}

#[tokio::test]
async fn submission_is_non_reentrant() {
    let harness = connected_harness().await;
    harness.registry.hold_confirmations(true);

    let controller = harness.controller.clone();
    let first = tokio::spawn(async move { controller.submit(valid_draft()).await });

    // Let the first attempt reach the confirmation wait.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        harness.controller.phase(),
        SubmissionPhase::AwaitingConfirmation
    );

    let second = harness.controller.submit(valid_draft()).await;
    assert_eq!(second.unwrap_err(), SubmitError::InProgress);

    // The prior attempt is unaffected and completes once released.
    harness.registry.release_confirmations();
    first.await.unwrap().unwrap();
    assert_eq!(harness.controller.refresh_count(), 1);
    assert_eq!(harness.registry.record_count(), 1);
}

#[tokio::test]
async fn failed_submission_preserves_draft_for_retry() {
    let harness = connected_harness().await;
    harness
        .registry
        .fail_next_submit(RegistryError::Reverted("registry is sealed".to_string()));

    let draft = valid_draft();
    let error = harness.controller.submit(draft.clone()).await.unwrap_err();
    assert_eq!(
        error,
        SubmitError::Registry(RegistryError::Reverted("registry is sealed".to_string()))
    );
    assert_eq!(harness.controller.retained_draft(), Some(draft.clone()));
    assert_eq!(harness.controller.refresh_count(), 0);

    // Fields were not cleared; the same draft goes straight back through.
    harness.controller.submit(draft).await.unwrap();
    assert_eq!(harness.controller.refresh_count(), 1);
}

#[tokio::test]
async fn confirmation_failure_keeps_last_tx_hash_for_inspection() {
    let harness = connected_harness().await;
    harness
        .registry
        .fail_next_confirmation(RegistryError::Reverted("out of gas".to_string()));

    let error = harness.controller.submit(valid_draft()).await.unwrap_err();
    assert!(matches!(error, SubmitError::Registry(RegistryError::Reverted(_))));
    assert!(harness.controller.last_tx_hash().is_some());
    assert!(harness.controller.retained_draft().is_some());
}

#[tokio::test]
async fn insufficient_fee_surfaces_from_the_contract() {
    let harness = connected_harness().await;
    harness
        .registry
        .fail_next_submit(RegistryError::InsufficientFee);

    let error = harness.controller.submit(valid_draft()).await.unwrap_err();
    assert_eq!(error, SubmitError::Registry(RegistryError::InsufficientFee));
}

#[tokio::test]
async fn submission_without_binding_fails_fast() {
    let controller = SubmissionController::new();
    let error = controller.submit(valid_draft()).await.unwrap_err();
    assert_eq!(error, SubmitError::Registry(RegistryError::NoBinding));
}

#[tokio::test]
async fn cancelled_confirmation_wait_leaves_chain_outcome_untouched() {
    let harness = connected_harness().await;
    harness.registry.hold_confirmations(true);

    let client =
        RegistryClient::bind(Some(Arc::new(harness.registry.clone())), &harness.session).unwrap();
    let pending = client.submit(&valid_draft(), None).await.unwrap();

    // The caller imposes its own timeout; the wait itself never expires.
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), client.await_confirmation(&pending)).await;
    assert!(cancelled.is_err());

    // The chain is the authority: the transaction still confirms.
    harness.registry.release_confirmations();
    client.await_confirmation(&pending).await.unwrap();
    assert_eq!(harness.registry.record_count(), 1);
}

#[tokio::test]
async fn superseded_session_discards_in_flight_submission() {
    let harness = connected_harness().await;
    harness.registry.hold_confirmations(true);

    let controller = harness.controller.clone();
    let in_flight = tokio::spawn(async move { controller.submit(valid_draft()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Account swap replaces the session; the binding captured generation 1.
    harness.wallet.set_accounts(vec![test_address(2)]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ne!(harness.session.current_generation(), Some(1));

    harness.registry.release_confirmations();
    let error = in_flight.await.unwrap().unwrap_err();
    assert_eq!(error, SubmitError::Registry(RegistryError::StaleSession));

    // Only the client-side result is discarded; the chain kept its outcome.
    assert_eq!(harness.registry.record_count(), 1);
}
