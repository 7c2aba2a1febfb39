//! App composition: binding rebuilds on session transitions and the
//! view/controller wiring through the background loops.

use std::time::Duration;

use registry_client::{App, DisconnectPreference, SessionView};
use registry_core::mock::{MockRegistry, MockWallet, test_address};
use registry_core::{ChainDescriptor, ChainId, RecordDraft};

fn draft(name: &str) -> RecordDraft {
    RecordDraft {
        name: name.to_string(),
        reg_no: "R1".to_string(),
        college_name: "X".to_string(),
        department: "Y".to_string(),
        file: None,
    }
}

fn build_app(
    wallet: &MockWallet,
    registry: &MockRegistry,
    dir: &tempfile::TempDir,
) -> App {
    App::builder()
        .gateway(wallet.clone())
        .contract(registry.clone())
        .chain(ChainDescriptor::local_chain())
        .prefs(DisconnectPreference::at(dir.path().join("flag")))
        .build()
        .unwrap()
}

#[tokio::test]
async fn connect_binds_registry_and_loads_the_list() {
    let wallet = MockWallet::new(ChainId(1337));
    let registry = MockRegistry::new();
    registry.seed_record(&draft("ada"), test_address(1));
    let dir = tempfile::tempdir().unwrap();

    let app = build_app(&wallet, &registry, &dir);
    app.start();

    app.session().connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The Established event rebuilt the binding and triggered the
    // first-binding refresh.
    assert_eq!(app.view().record_count(), 1);

    // A confirmed write bumps the refresh signal; the loop re-reads.
    app.controller().submit(draft("grace")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.view().record_count(), 2);

    app.shutdown();
}

#[tokio::test]
async fn chain_change_rebuilds_binding_and_rereads() {
    let wallet = MockWallet::new(ChainId(1337));
    wallet.add_known_chain(ChainId(31337));
    let registry = MockRegistry::new();
    let dir = tempfile::tempdir().unwrap();

    let app = build_app(&wallet, &registry, &dir);
    app.start();

    app.session().connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let first_generation = app.session().current_generation();

    registry.seed_record(&draft("ada"), test_address(1));
    wallet.set_chain(ChainId(31337));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Session was replaced (fresh generation) and the view re-read the list
    // through the rebuilt binding.
    assert_ne!(app.session().current_generation(), first_generation);
    assert!(matches!(
        app.session().view(),
        SessionView::WrongNetwork { .. }
    ));
    assert_eq!(app.view().record_count(), 1);

    app.shutdown();
}

#[tokio::test]
async fn session_end_clears_bindings() {
    let wallet = MockWallet::new(ChainId(1337));
    let registry = MockRegistry::new();
    let dir = tempfile::tempdir().unwrap();

    let app = build_app(&wallet, &registry, &dir);
    app.start();

    app.session().connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    wallet.set_accounts(vec![]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(app.session().view(), SessionView::Disconnected);
    let error = app.controller().submit(draft("ada")).await.unwrap_err();
    assert_eq!(
        error,
        registry_client::SubmitError::Registry(registry_core::RegistryError::NoBinding)
    );

    app.shutdown();
}
