//! The store service: entitlements, purchases, and change notifications.
//!
//! One background task owns the entitlement state for the whole process.
//! Commands arrive on an mpsc channel, platform-pushed transaction updates
//! on the provider's feed, and the task drains both in a single
//! `tokio::select!` loop, so every change is applied to completion (snapshot,
//! persisted cache, published event) before the next one is looked at.
//! Cross-channel arrival order is whatever the select picks; within each
//! channel, order is preserved.
//!
//! Change notifications carry no payload. Subscribers re-query
//! [`StoreHandle::entitlements`] and recompute, which stays correct under
//! duplicate or lagged delivery; events published while nobody is subscribed
//! are dropped.
//!
//! ## Lifecycle
//!
//! [`start_store`] seeds the owned set from the persisted cache, fetches
//! product metadata (failure tolerated, retried on demand), refreshes
//! entitlements from the provider (failure keeps the cached set), then
//! serves until [`StoreHandle::shutdown`] is acknowledged or every handle is
//! dropped.

pub mod catalog;
pub mod provider;
pub mod sandbox;

pub use catalog::{CatalogEntry, ProductCatalog};
pub use provider::{
    CommerceError, CommerceProvider, ProductInfo, PurchaseResult, Receipt, TransactionUpdate,
};
pub use sandbox::{PurchaseScript, SandboxCommerce, SandboxController};

use std::collections::HashSet;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::storage::SettingsStore;

/// Product identifiers the user currently owns.
pub type EntitlementSet = HashSet<String>;

const EVENT_BUFFER: usize = 32;

/// Store-side failures surfaced to callers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown product id: {0}")]
    UnknownProduct(String),
    #[error("transaction for {product_id} failed verification: {reason}")]
    Unverified { product_id: String, reason: String },
    #[error("commerce provider error: {0}")]
    Provider(#[from] CommerceError),
    #[error("store service is not running")]
    Unavailable,
}

/// Published whenever the owned set actually changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    EntitlementsChanged,
}

/// Result of a purchase attempt that did not error.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// Verified and granted; the entitlement is owned as of this receipt.
    Granted(Receipt),
    /// The user backed out; nothing changed.
    Cancelled,
    /// Deferred; a grant may still arrive through the transaction feed.
    Pending,
    /// The provider reported an outcome this version does not know.
    Unknown,
}

enum StoreCommand {
    Entitlements(oneshot::Sender<EntitlementSet>),
    Products(oneshot::Sender<Result<Vec<ProductInfo>, StoreError>>),
    Purchase {
        product_id: String,
        resp: oneshot::Sender<Result<PurchaseOutcome, StoreError>>,
    },
    Refresh(oneshot::Sender<Result<bool, StoreError>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap cloneable handle to the store service task.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
    events: broadcast::Sender<StoreEvent>,
}

impl StoreHandle {
    /// Snapshot of the owned product ids.
    pub async fn entitlements(&self) -> Result<EntitlementSet, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Entitlements(tx))
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)
    }

    /// Product metadata for the catalog, fetched lazily and then cached.
    pub async fn products(&self) -> Result<Vec<ProductInfo>, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Products(tx))
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Runs the purchase flow for one product.
    ///
    /// A verified transaction grants the entitlement before this returns;
    /// anything else leaves the owned set untouched.
    pub async fn purchase(&self, product_id: &str) -> Result<PurchaseOutcome, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Purchase {
                product_id: product_id.to_string(),
                resp: tx,
            })
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Re-queries the provider for current entitlements. `Ok(true)` when the
    /// owned set changed. On provider failure the last-known set stays in
    /// effect and the error comes back.
    pub async fn refresh(&self) -> Result<bool, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Refresh(tx))
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Subscribes to change events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Stops the service task once the command in hand finishes.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Shutdown(tx))
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)
    }
}

/// Spawns the store service task and returns its handle.
///
/// All handles are clones of the returned one; the task also stops on its
/// own when every handle is dropped.
pub fn start_store<P: CommerceProvider + Sync>(
    mut provider: P,
    settings: SettingsStore,
    catalog: ProductCatalog,
) -> StoreHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let handle = StoreHandle {
        tx,
        events: events.clone(),
    };
    let feed = provider.transaction_feed();
    tokio::spawn(run_store(provider, feed, rx, events, settings, catalog));
    handle
}

async fn run_store<P: CommerceProvider>(
    provider: P,
    mut feed: mpsc::UnboundedReceiver<TransactionUpdate>,
    mut rx: mpsc::UnboundedReceiver<StoreCommand>,
    events: broadcast::Sender<StoreEvent>,
    settings: SettingsStore,
    catalog: ProductCatalog,
) {
    let mut owned = match settings.load_entitlements() {
        Ok(Some(cached)) => {
            debug!("loaded {} cached entitlements", cached.len());
            cached
        }
        Ok(None) => EntitlementSet::new(),
        Err(err) => {
            warn!("entitlement cache unreadable, starting empty: {err}");
            EntitlementSet::new()
        }
    };
    let mut products: Vec<ProductInfo> = Vec::new();
    let mut products_loaded = false;
    let ids = catalog.product_ids();

    match provider.fetch_products(&ids).await {
        Ok(list) => {
            debug!("fetched metadata for {} products", list.len());
            products = list;
            products_loaded = true;
        }
        Err(err) => warn!("product metadata fetch failed, will retry on demand: {err}"),
    }
    match provider.current_entitlements().await {
        Ok(current) => {
            if current != owned {
                owned = current;
                persist_owned(&settings, &owned);
                let _ = events.send(StoreEvent::EntitlementsChanged);
            }
        }
        Err(err) => warn!(
            "entitlement refresh failed, keeping {} known entitlements: {err}",
            owned.len()
        ),
    }

    let mut feed_open = true;
    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("all store handles dropped, stopping");
                    break;
                };
                match cmd {
                    StoreCommand::Entitlements(resp) => {
                        let _ = resp.send(owned.clone());
                    }
                    StoreCommand::Products(resp) => {
                        if !products_loaded {
                            match provider.fetch_products(&ids).await {
                                Ok(list) => {
                                    products = list;
                                    products_loaded = true;
                                }
                                Err(err) => {
                                    let _ = resp.send(Err(err.into()));
                                    continue;
                                }
                            }
                        }
                        let _ = resp.send(Ok(products.clone()));
                    }
                    StoreCommand::Purchase { product_id, resp } => {
                        let result = handle_purchase(
                            &provider,
                            &catalog,
                            &settings,
                            &mut owned,
                            &events,
                            &product_id,
                        )
                        .await;
                        let _ = resp.send(result);
                    }
                    StoreCommand::Refresh(resp) => {
                        let result = match provider.current_entitlements().await {
                            Ok(current) => {
                                let changed = current != owned;
                                if changed {
                                    owned = current;
                                    persist_owned(&settings, &owned);
                                    let _ = events.send(StoreEvent::EntitlementsChanged);
                                }
                                Ok(changed)
                            }
                            Err(err) => {
                                warn!(
                                    "entitlement refresh failed, keeping {} known entitlements: {err}",
                                    owned.len()
                                );
                                Err(err.into())
                            }
                        };
                        let _ = resp.send(result);
                    }
                    StoreCommand::Shutdown(done) => {
                        info!("store service stopped");
                        // Release the settings database before acking so the
                        // caller can reopen it immediately.
                        drop(provider);
                        drop(settings);
                        let _ = done.send(());
                        return;
                    }
                }
            }
            update = feed.recv(), if feed_open => {
                match update {
                    Some(TransactionUpdate::Granted { product_id }) => {
                        if owned.insert(product_id.clone()) {
                            info!("entitlement granted: {product_id}");
                            persist_owned(&settings, &owned);
                            let _ = events.send(StoreEvent::EntitlementsChanged);
                        }
                    }
                    Some(TransactionUpdate::Revoked { product_id }) => {
                        if owned.remove(&product_id) {
                            info!("entitlement revoked: {product_id}");
                            persist_owned(&settings, &owned);
                            let _ = events.send(StoreEvent::EntitlementsChanged);
                        }
                    }
                    None => {
                        debug!("transaction feed closed");
                        feed_open = false;
                    }
                }
            }
        }
    }
}

async fn handle_purchase<P: CommerceProvider>(
    provider: &P,
    catalog: &ProductCatalog,
    settings: &SettingsStore,
    owned: &mut EntitlementSet,
    events: &broadcast::Sender<StoreEvent>,
    product_id: &str,
) -> Result<PurchaseOutcome, StoreError> {
    if !catalog.contains(product_id) {
        return Err(StoreError::UnknownProduct(product_id.to_string()));
    }
    match provider.purchase(product_id).await? {
        PurchaseResult::Verified(receipt) => {
            info!(
                "purchase verified: {} (receipt {})",
                receipt.product_id, receipt.transaction_id
            );
            if owned.insert(receipt.product_id.clone()) {
                persist_owned(settings, owned);
                let _ = events.send(StoreEvent::EntitlementsChanged);
            }
            Ok(PurchaseOutcome::Granted(receipt))
        }
        PurchaseResult::Unverified { product_id, reason } => {
            warn!("purchase verification failed for {product_id}: {reason}");
            Err(StoreError::Unverified { product_id, reason })
        }
        PurchaseResult::Cancelled => {
            debug!("purchase cancelled: {product_id}");
            Ok(PurchaseOutcome::Cancelled)
        }
        PurchaseResult::Pending => {
            info!("purchase pending: {product_id}");
            Ok(PurchaseOutcome::Pending)
        }
        PurchaseResult::Unknown => {
            warn!("purchase returned an unrecognized outcome for {product_id}");
            Ok(PurchaseOutcome::Unknown)
        }
    }
}

fn persist_owned(settings: &SettingsStore, owned: &EntitlementSet) {
    if let Err(err) = settings.save_entitlements(owned) {
        warn!("failed to persist the entitlement cache: {err}");
    }
}
