//! # Hammerkit - Cosmetic Customization Core for a Hammer Game
//!
//! Hammerkit is the customization and entitlement core of a small
//! hammer-and-nails game: players buy extra colors for the hammer's head and
//! handle, pick their favorites, and keep them across restarts and across
//! devices.
//!
//! ## Features
//!
//! - **Palette & Entitlements**: A fixed base palette extended by purchased
//!   colors, in a stable order with duplicates removed.
//! - **Safe Selection**: Out-of-range picks (revoked purchases, old saves)
//!   fall back to defaults instead of panicking mid-render.
//! - **Preview Sessions**: Draft picks paint a preview copy of the hammer;
//!   nothing touches the live model or disk until committed.
//! - **Store Service**: One background task owns entitlement state, serves
//!   purchases, and publishes change notifications over a broadcast channel.
//! - **Sandbox Storefront**: Scriptable purchase outcomes, outages, and
//!   cross-device grants for demos and tests, no network required.
//! - **Persistence**: Sled-backed settings with schema-versioned records,
//!   saved only on explicit commit.
//! - **Async Design**: Built with Tokio; everything else stays synchronous
//!   and easy to call from a frame loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hammerkit::config::Config;
//! use hammerkit::cosmetics::{CosmeticsService, Palette};
//! use hammerkit::game::HammerModel;
//! use hammerkit::storage::SettingsStore;
//! use hammerkit::store::{start_store, ProductCatalog, SandboxCommerce};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration and open the settings database
//!     let config = Config::load("config.toml").await?;
//!     let settings = SettingsStore::open(config.settings_db_path())?;
//!
//!     // Start the store service over the sandbox storefront
//!     let catalog = ProductCatalog::standard();
//!     let provider = SandboxCommerce::new(&catalog);
//!     let store = start_store(provider, settings.clone(), catalog.clone());
//!
//!     // Build the customization service and paint the live hammer
//!     let owned = store.entitlements().await?;
//!     let service = CosmeticsService::new(Palette::standard(), catalog, settings, owned);
//!     let resolved = service.resolved_colors();
//!     let mut hammer = HammerModel::new(resolved.head, resolved.handle);
//!     service.apply_committed(&mut [&mut hammer]);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - The live hammer model and the gameplay event feed
//! - [`cosmetics`] - Option set building, selection validation, sessions, and painting
//! - [`store`] - Store service, commerce provider trait, catalog, and sandbox
//! - [`storage`] - Settings persistence layer
//! - [`config`] - Configuration management
//!
//! ## Architecture
//!
//! Hammerkit uses a modular architecture with clear separation of concerns:
//!
//! ```text
//! ┌─────────────────┐
//! │  Game Session   │ ← live hammer, swing counter
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Cosmetics     │ ← option set, validation, painting
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Store Service  │ ← entitlements, purchases, notifications
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Storage       │ ← settings persistence
//! └─────────────────┘
//! ```

pub mod config;
pub mod cosmetics;
pub mod game;
pub mod storage;
pub mod store;
