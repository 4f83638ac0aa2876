//! Test utilities & fixtures.
//!
//! Each test binary compiles this module separately and uses its own subset,
//! so the whole module is exempt from dead-code warnings.
#![allow(dead_code)]

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::timeout;

use hammerkit::cosmetics::{CosmeticsService, Palette};
use hammerkit::game::HammerModel;
use hammerkit::storage::SettingsStore;
use hammerkit::store::{
    start_store, EntitlementSet, ProductCatalog, SandboxCommerce, SandboxController, StoreEvent,
    StoreHandle,
};

/// A full stack over one temporary settings database: the running store
/// service, the sandbox controls, and the customization service.
pub struct Fixture {
    pub dir: TempDir,
    pub settings: SettingsStore,
    pub store: StoreHandle,
    pub controller: SandboxController,
    pub service: CosmeticsService,
}

/// Fresh stack with nothing owned platform-side.
pub async fn fixture() -> Fixture {
    fixture_with_owned(EntitlementSet::new()).await
}

/// Fresh stack where the sandbox already considers `owned` purchased.
pub async fn fixture_with_owned(owned: EntitlementSet) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    open_stack(dir, owned).await
}

/// Tear the stack down and bring it back up over the same settings
/// directory, as if the game was restarted. The sandbox platform side is
/// re-seeded from the persisted entitlement cache, the way the binary does.
pub async fn restart(fx: Fixture) -> Fixture {
    let Fixture {
        dir,
        settings,
        store,
        controller,
        service,
    } = fx;
    store.shutdown().await.expect("store shutdown");
    drop(service);
    drop(controller);
    drop(settings);
    drop(store);
    open_stack(dir, EntitlementSet::new()).await
}

async fn open_stack(dir: TempDir, extra_owned: EntitlementSet) -> Fixture {
    let settings = SettingsStore::open(dir.path().join("settings")).expect("open settings");
    let mut platform: EntitlementSet = settings
        .load_entitlements()
        .expect("read entitlement cache")
        .unwrap_or_default();
    platform.extend(extra_owned);

    let catalog = ProductCatalog::standard();
    let provider = SandboxCommerce::with_owned(&catalog, platform);
    let controller = provider.controller();
    let store = start_store(provider, settings.clone(), catalog.clone());
    let owned = store.entitlements().await.expect("entitlements");
    let service = CosmeticsService::new(Palette::standard(), catalog, settings.clone(), owned);
    Fixture {
        dir,
        settings,
        store,
        controller,
        service,
    }
}

/// A live hammer already painted with the service's committed colors.
pub fn live_model(service: &CosmeticsService) -> HammerModel {
    let resolved = service.resolved_colors();
    HammerModel::new(resolved.head, resolved.handle)
}

/// Wait for a change notification, failing the test after two seconds.
pub async fn expect_change(rx: &mut broadcast::Receiver<StoreEvent>) {
    match timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Ok(StoreEvent::EntitlementsChanged)) => {}
        Ok(Err(err)) => panic!("event stream failed: {err}"),
        Err(_) => panic!("timed out waiting for a change notification"),
    }
}

/// Assert that no notification shows up within 200ms.
pub async fn expect_no_change(rx: &mut broadcast::Receiver<StoreEvent>) {
    if let Ok(event) = timeout(Duration::from_millis(200), rx.recv()).await {
        panic!("expected no change notification, got {event:?}");
    }
}
