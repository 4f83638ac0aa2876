//! The commerce-provider seam and its wire types.
//!
//! Everything the store service needs from a platform storefront, expressed
//! as one trait so the sandbox backend and a real billing integration are
//! interchangeable. The service task drives these futures, so they must be
//! `Send`.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::EntitlementSet;

/// Failures at the commerce boundary.
#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("commerce backend rejected the request: {0}")]
    Rejected(String),
}

/// Store-side product metadata, as shown in the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub display_name: String,
    pub description: String,
    /// Localized display price, e.g. `"$0.99"`.
    pub price: String,
}

/// Proof of a verified, completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub product_id: String,
    pub transaction_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

impl Receipt {
    /// Fresh receipt for a product granted now.
    pub fn issue(product_id: impl Into<String>) -> Self {
        Receipt {
            product_id: product_id.into(),
            transaction_id: Uuid::new_v4(),
            granted_at: Utc::now(),
        }
    }
}

/// What a purchase attempt came back as, before any entitlement bookkeeping.
#[derive(Debug, Clone)]
pub enum PurchaseResult {
    /// Payment went through and the transaction verified.
    Verified(Receipt),
    /// Payment reported success but the transaction failed verification.
    /// Treated as a failure: the entitlement must not be granted.
    Unverified { product_id: String, reason: String },
    /// The user backed out of the payment sheet.
    Cancelled,
    /// Waiting on external approval; a grant may arrive later through the
    /// transaction feed.
    Pending,
    /// An outcome this client version does not recognize.
    Unknown,
}

/// An entitlement change pushed by the platform outside any purchase call,
/// e.g. a purchase completed on another device or a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionUpdate {
    Granted { product_id: String },
    Revoked { product_id: String },
}

/// A platform storefront as consumed by the store service.
///
/// Methods return `impl Future + Send` (implementations can simply write
/// `async fn`) so the service task that drives them stays spawnable. The
/// transaction feed is taken once at startup and delivers updates for as
/// long as the provider keeps its sending side alive.
pub trait CommerceProvider: Send + 'static {
    /// Fetches shop metadata for the given product ids. Unknown ids are
    /// omitted from the result rather than reported as errors.
    fn fetch_products(
        &self,
        product_ids: &[String],
    ) -> impl Future<Output = Result<Vec<ProductInfo>, CommerceError>> + Send;

    /// Runs the platform purchase flow for one product.
    fn purchase(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<PurchaseResult, CommerceError>> + Send;

    /// Point-in-time query of everything the user owns.
    fn current_entitlements(
        &self,
    ) -> impl Future<Output = Result<EntitlementSet, CommerceError>> + Send;

    /// Hands over the receiving end of the transaction-update feed.
    /// Called once; later calls may return an already-closed channel.
    fn transaction_feed(&mut self) -> mpsc::UnboundedReceiver<TransactionUpdate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_carry_distinct_transaction_ids() {
        let a = Receipt::issue("ht1");
        let b = Receipt::issue("ht1");
        assert_eq!(a.product_id, "ht1");
        assert_ne!(a.transaction_id, b.transaction_id);
    }
}
