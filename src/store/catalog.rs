//! The purchasable-color catalog.
//!
//! Static configuration compiled into the app: which product ids exist, what
//! color each one unlocks, and the shop copy for it. Catalog order is the
//! append order the options builder uses, so it is as load-bearing as the
//! base palette's order.

use serde::{Deserialize, Serialize};

use crate::cosmetics::Color;

/// One purchasable color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Opaque product identifier, as known to the commerce backend.
    pub product_id: String,
    /// Shop display name.
    pub display_name: String,
    /// One-line shop description.
    pub summary: String,
    /// The color owning this product unlocks.
    pub color: Color,
    /// Display price, e.g. `"$0.99"`.
    pub price: String,
}

impl CatalogEntry {
    pub fn new(
        product_id: impl Into<String>,
        display_name: impl Into<String>,
        summary: impl Into<String>,
        color: Color,
        price: impl Into<String>,
    ) -> Self {
        CatalogEntry {
            product_id: product_id.into(),
            display_name: display_name.into(),
            summary: summary.into(),
            color,
            price: price.into(),
        }
    }
}

/// The ordered product → color map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalog {
    entries: Vec<CatalogEntry>,
}

impl ProductCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        ProductCatalog { entries }
    }

    /// The catalog shipped with the game: eight purchasable finishes.
    pub fn standard() -> Self {
        ProductCatalog::new(vec![
            CatalogEntry::new(
                "ht1",
                "Teal",
                "A cool teal finish for head or handle.",
                Color::rgb(26, 179, 153),
                "$0.99",
            ),
            CatalogEntry::new(
                "ho1",
                "Burnt Orange",
                "A warm burnt-orange finish.",
                Color::rgb(230, 128, 51),
                "$0.99",
            ),
            CatalogEntry::new(
                "hp1",
                "Royal Purple",
                "A muted royal purple.",
                Color::rgb(102, 77, 179),
                "$0.99",
            ),
            CatalogEntry::new(
                "hy1",
                "Sunshine",
                "A bright sunshine yellow.",
                Color::rgb(255, 230, 26),
                "$0.99",
            ),
            CatalogEntry::new(
                "hdb1",
                "Dark Blue",
                "A deep midnight blue.",
                Color::rgb(51, 51, 102),
                "$1.99",
            ),
            CatalogEntry::new(
                "hw1",
                "Watermelon",
                "A juicy watermelon pink.",
                Color::rgb(230, 77, 102),
                "$1.99",
            ),
            CatalogEntry::new(
                "hbs1",
                "Bright Sky",
                "A clear bright-sky blue.",
                Color::rgb(102, 204, 255),
                "$1.99",
            ),
            CatalogEntry::new(
                "hsg1",
                "Soft Gray",
                "A gentle soft gray.",
                Color::rgb(204, 204, 204),
                "$0.99",
            ),
        ])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.product_id == product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.get(product_id).is_some()
    }

    /// Product ids in catalog order, for metadata fetches.
    pub fn product_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.product_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
