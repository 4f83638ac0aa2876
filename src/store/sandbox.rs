//! In-process storefront for demos and tests.
//!
//! No network, no receipts signed by anyone: the sandbox keeps platform-side
//! state in memory, answers the provider calls instantly, and lets a
//! [`SandboxController`] script purchase outcomes, toggle an outage, and
//! push grants or revocations through the transaction feed the way another
//! device would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Mutex};

use super::catalog::ProductCatalog;
use super::provider::{
    CommerceError, CommerceProvider, ProductInfo, PurchaseResult, Receipt, TransactionUpdate,
};
use super::EntitlementSet;

/// Scripted behavior for a product's purchase attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseScript {
    /// Verify and grant (the default).
    Verify,
    /// Report success but fail verification.
    FailVerification,
    /// The user cancels the payment sheet.
    Cancel,
    /// Defer the purchase; no grant now.
    Defer,
    /// Fail with a network error.
    NetworkError,
}

struct SandboxInner {
    products: Vec<ProductInfo>,
    owned: Mutex<EntitlementSet>,
    scripts: Mutex<HashMap<String, PurchaseScript>>,
    offline: AtomicBool,
    feed_tx: mpsc::UnboundedSender<TransactionUpdate>,
}

impl SandboxInner {
    fn check_online(&self) -> Result<(), CommerceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CommerceError::Network("sandbox is offline".into()));
        }
        Ok(())
    }
}

/// A fake storefront with scriptable outcomes and a steerable transaction
/// feed. State sits behind an [`Arc`], so controllers stay usable after the
/// provider itself moves into the store service.
pub struct SandboxCommerce {
    inner: Arc<SandboxInner>,
    feed_rx: Option<mpsc::UnboundedReceiver<TransactionUpdate>>,
}

impl SandboxCommerce {
    /// Storefront selling the catalog, with nothing owned yet.
    pub fn new(catalog: &ProductCatalog) -> Self {
        Self::with_owned(catalog, EntitlementSet::new())
    }

    /// Storefront that already considers `owned` purchased platform-side.
    pub fn with_owned(catalog: &ProductCatalog, owned: EntitlementSet) -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let products = catalog
            .entries()
            .iter()
            .map(|entry| ProductInfo {
                product_id: entry.product_id.clone(),
                display_name: entry.display_name.clone(),
                description: entry.summary.clone(),
                price: entry.price.clone(),
            })
            .collect();
        SandboxCommerce {
            inner: Arc::new(SandboxInner {
                products,
                owned: Mutex::new(owned),
                scripts: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
                feed_tx,
            }),
            feed_rx: Some(feed_rx),
        }
    }

    /// Handle for steering the sandbox after the provider is handed off.
    pub fn controller(&self) -> SandboxController {
        SandboxController {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CommerceProvider for SandboxCommerce {
    async fn fetch_products(
        &self,
        product_ids: &[String],
    ) -> Result<Vec<ProductInfo>, CommerceError> {
        self.inner.check_online()?;
        Ok(self
            .inner
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.product_id))
            .cloned()
            .collect())
    }

    async fn purchase(&self, product_id: &str) -> Result<PurchaseResult, CommerceError> {
        self.inner.check_online()?;
        let script = self
            .inner
            .scripts
            .lock()
            .await
            .get(product_id)
            .copied()
            .unwrap_or(PurchaseScript::Verify);
        match script {
            PurchaseScript::Verify => {
                self.inner.owned.lock().await.insert(product_id.to_string());
                debug!("sandbox verified a purchase of {product_id}");
                Ok(PurchaseResult::Verified(Receipt::issue(product_id)))
            }
            PurchaseScript::FailVerification => Ok(PurchaseResult::Unverified {
                product_id: product_id.to_string(),
                reason: "sandbox signature check failed".into(),
            }),
            PurchaseScript::Cancel => Ok(PurchaseResult::Cancelled),
            PurchaseScript::Defer => Ok(PurchaseResult::Pending),
            PurchaseScript::NetworkError => Err(CommerceError::Network(
                "sandbox payment endpoint unreachable".into(),
            )),
        }
    }

    async fn current_entitlements(&self) -> Result<EntitlementSet, CommerceError> {
        self.inner.check_online()?;
        Ok(self.inner.owned.lock().await.clone())
    }

    fn transaction_feed(&mut self) -> mpsc::UnboundedReceiver<TransactionUpdate> {
        match self.feed_rx.take() {
            Some(rx) => rx,
            None => {
                // Already taken: hand back a channel that is closed from birth.
                let (tx, rx) = mpsc::unbounded_channel();
                drop(tx);
                rx
            }
        }
    }
}

/// Steers a [`SandboxCommerce`] from outside the store service: platform
/// state, scripted outcomes, outages, and the transaction feed.
#[derive(Clone)]
pub struct SandboxController {
    inner: Arc<SandboxInner>,
}

impl SandboxController {
    /// Marks a product purchased platform-side and pushes a grant through
    /// the feed, like a purchase completed on another device.
    pub async fn grant(&self, product_id: &str) {
        self.inner.owned.lock().await.insert(product_id.to_string());
        let _ = self.inner.feed_tx.send(TransactionUpdate::Granted {
            product_id: product_id.to_string(),
        });
    }

    /// Revokes a product platform-side (a refund) and pushes the revocation
    /// through the feed.
    pub async fn revoke(&self, product_id: &str) {
        self.inner.owned.lock().await.remove(product_id);
        let _ = self.inner.feed_tx.send(TransactionUpdate::Revoked {
            product_id: product_id.to_string(),
        });
    }

    /// Marks a product purchased platform-side without a feed delivery,
    /// simulating a push the device never received. Only a refresh will
    /// pick it up.
    pub async fn grant_quietly(&self, product_id: &str) {
        self.inner.owned.lock().await.insert(product_id.to_string());
    }

    /// Repeats a grant delivery without changing platform state, simulating
    /// the at-least-once feed handing the same transaction over again.
    pub fn redeliver_grant(&self, product_id: &str) {
        let _ = self.inner.feed_tx.send(TransactionUpdate::Granted {
            product_id: product_id.to_string(),
        });
    }

    /// Scripts the outcome of future purchase attempts for one product.
    pub async fn script_purchase(&self, product_id: &str, script: PurchaseScript) {
        self.inner
            .scripts
            .lock()
            .await
            .insert(product_id.to_string(), script);
    }

    /// Simulates losing (or regaining) the network.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of platform-side ownership, for assertions.
    pub async fn owned(&self) -> EntitlementSet {
        self.inner.owned.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> SandboxCommerce {
        SandboxCommerce::new(&ProductCatalog::standard())
    }

    #[tokio::test]
    async fn fetch_returns_only_requested_ids() {
        let sb = sandbox();
        let infos = sb
            .fetch_products(&["ht1".to_string(), "made-up".to_string()])
            .await
            .unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].product_id, "ht1");
    }

    #[tokio::test]
    async fn default_purchase_verifies_and_owns() {
        let sb = sandbox();
        let ctl = sb.controller();
        match sb.purchase("ht1").await.unwrap() {
            PurchaseResult::Verified(receipt) => assert_eq!(receipt.product_id, "ht1"),
            other => panic!("expected a verified purchase, got {other:?}"),
        }
        assert!(ctl.owned().await.contains("ht1"));
    }

    #[tokio::test]
    async fn scripted_outcomes_are_honored() {
        let sb = sandbox();
        let ctl = sb.controller();
        ctl.script_purchase("ho1", PurchaseScript::Cancel).await;
        ctl.script_purchase("hp1", PurchaseScript::Defer).await;
        ctl.script_purchase("hy1", PurchaseScript::FailVerification)
            .await;
        assert!(matches!(
            sb.purchase("ho1").await.unwrap(),
            PurchaseResult::Cancelled
        ));
        assert!(matches!(
            sb.purchase("hp1").await.unwrap(),
            PurchaseResult::Pending
        ));
        assert!(matches!(
            sb.purchase("hy1").await.unwrap(),
            PurchaseResult::Unverified { .. }
        ));
        assert!(ctl.owned().await.is_empty());
    }

    #[tokio::test]
    async fn offline_mode_fails_every_call() {
        let sb = sandbox();
        let ctl = sb.controller();
        ctl.set_offline(true);
        assert!(sb.purchase("ht1").await.is_err());
        assert!(sb.current_entitlements().await.is_err());
        assert!(sb.fetch_products(&["ht1".to_string()]).await.is_err());
        ctl.set_offline(false);
        assert!(sb.current_entitlements().await.is_ok());
    }

    #[tokio::test]
    async fn controller_grants_flow_through_the_feed() {
        let mut sb = sandbox();
        let ctl = sb.controller();
        let mut feed = sb.transaction_feed();
        ctl.grant("hw1").await;
        ctl.revoke("hw1").await;
        assert_eq!(
            feed.recv().await,
            Some(TransactionUpdate::Granted {
                product_id: "hw1".into()
            })
        );
        assert_eq!(
            feed.recv().await,
            Some(TransactionUpdate::Revoked {
                product_id: "hw1".into()
            })
        );
    }

    #[tokio::test]
    async fn second_feed_take_is_closed() {
        let mut sb = sandbox();
        let _first = sb.transaction_feed();
        let mut second = sb.transaction_feed();
        assert!(second.recv().await.is_none());
    }
}
