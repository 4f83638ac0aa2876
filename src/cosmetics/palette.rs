//! Color values, the base palette, and the available-options builder.
//!
//! The base palette ships with the game and is always selectable; purchased
//! colors are appended after it by [`available_colors`]. Order matters
//! everywhere here: saved selections are positions into the combined list,
//! index 0 is the default head color, and index 1 the default handle color.

use serde::{Deserialize, Serialize};

use crate::store::catalog::ProductCatalog;
use crate::store::EntitlementSet;

use super::CosmeticsError;

/// An opaque RGBA color.
///
/// Colors are only ever compared for equality (deduplication of the option
/// list) and handed to render targets; no color math happens in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// The shipped base palette, in presentation order.
///
/// Index 0 (dark gray) is the default head color and index 1 (brown) the
/// default handle color. Appending here is safe; reordering would silently
/// change what previously saved selections point at.
pub const STANDARD_BASE_COLORS: [Color; 12] = [
    Color::rgb(85, 85, 85),    // dark gray
    Color::rgb(153, 102, 51),  // brown
    Color::rgb(255, 0, 0),     // red
    Color::rgb(0, 0, 255),     // blue
    Color::rgb(0, 255, 0),     // green
    Color::rgb(255, 255, 0),   // yellow
    Color::rgb(128, 0, 128),   // purple
    Color::rgb(255, 128, 0),   // orange
    Color::rgb(0, 0, 0),       // black
    Color::rgb(255, 255, 255), // white
    Color::rgb(48, 176, 199),  // teal
    Color::rgb(255, 0, 255),   // magenta
];

/// A fixed, ordered, non-empty sequence of always-available colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Creates a palette from an ordered color list.
    ///
    /// An empty list is rejected: defaults and the applier's fallback pair
    /// both assume at least one entry exists.
    pub fn new(colors: Vec<Color>) -> Result<Self, CosmeticsError> {
        if colors.is_empty() {
            return Err(CosmeticsError::EmptyPalette);
        }
        Ok(Palette { colors })
    }

    /// The palette shipped with the game.
    pub fn standard() -> Self {
        Palette {
            colors: STANDARD_BASE_COLORS.to_vec(),
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// First base color; the hardcoded head fallback.
    pub fn fallback_head(&self) -> Color {
        self.colors[0]
    }

    /// Second base color when present, else the first; the handle fallback.
    pub fn fallback_handle(&self) -> Color {
        self.colors.get(1).copied().unwrap_or(self.colors[0])
    }
}

/// Builds the customization option list for an entitlement snapshot.
///
/// The result starts with every base color in palette order, followed by the
/// color of each owned catalog product not already present, in catalog
/// order. Owned ids with no catalog entry are skipped. Pure function: same
/// inputs, same list, every time.
pub fn available_colors(
    base: &Palette,
    owned: &EntitlementSet,
    catalog: &ProductCatalog,
) -> Vec<Color> {
    let mut colors: Vec<Color> = base.colors().to_vec();
    for entry in catalog.entries() {
        if owned.contains(entry.product_id.as_str()) && !colors.contains(&entry.color) {
            colors.push(entry.color);
        }
    }
    colors
}
