//! Hammer cosmetics: option list, selection rules, and the paint pipeline.
//!
//! Everything the customization screen needs, minus the screen itself:
//!
//! ```text
//! entitlements ──► available options ──► validated selection ──► paint
//!      ▲                                                          │
//!      └───────── store events trigger a resync ◄─────────────────┘
//! ```
//!
//! [`CosmeticsService`] owns the pipeline. The pieces stay separately
//! usable: [`available_colors`] builds the option list, [`Selection`]
//! carries the repair rules, [`apply_selection`] paints [`RenderTarget`]s,
//! and [`CustomizationSession`] holds an exploratory draft plus the preview
//! model until the player saves or walks away.

pub mod apply;
pub mod palette;
pub mod selection;
pub mod session;

pub use apply::{apply_selection, ApplyReport, RenderTarget};
pub use palette::{available_colors, Color, Palette, STANDARD_BASE_COLORS};
pub use selection::Selection;
pub use session::CustomizationSession;

use log::{debug, info, warn};
use thiserror::Error;

use crate::game::HammerModel;
use crate::storage::{SettingsStore, StorageError};
use crate::store::catalog::ProductCatalog;
use crate::store::EntitlementSet;

/// Cosmetics-side failures.
#[derive(Error, Debug)]
pub enum CosmeticsError {
    #[error("color index {index} out of range ({available} options available)")]
    IndexOutOfRange { index: usize, available: usize },
    #[error("base palette must contain at least one color")]
    EmptyPalette,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of an entitlement resync.
#[derive(Debug, Clone, Copy)]
pub struct SyncReport {
    /// Whether the option list changed in content or length.
    pub options_changed: bool,
    /// What the live target was painted with.
    pub live: ApplyReport,
}

/// Owns the option list and the committed selection, and keeps every render
/// target consistent with them.
///
/// One instance per process. The committed selection is always valid for the
/// current option list; the only paths that change either are
/// [`sync_entitlements`](Self::sync_entitlements) and
/// [`commit_session`](Self::commit_session), and both re-validate.
pub struct CosmeticsService {
    palette: Palette,
    catalog: ProductCatalog,
    settings: SettingsStore,
    owned: EntitlementSet,
    options: Vec<Color>,
    selection: Selection,
}

impl CosmeticsService {
    /// Builds the service from persisted state and an entitlement snapshot.
    ///
    /// A missing selection record is a first run; an unreadable one is
    /// logged and treated the same. Nothing here touches render targets;
    /// call [`apply_committed`](Self::apply_committed) once the live model
    /// exists.
    pub fn new(
        palette: Palette,
        catalog: ProductCatalog,
        settings: SettingsStore,
        owned: EntitlementSet,
    ) -> Self {
        let options = available_colors(&palette, &owned, &catalog);
        let (head, handle) = match settings.load_selection() {
            Ok(Some(saved)) => (
                usize::try_from(saved.head).ok(),
                usize::try_from(saved.handle).ok(),
            ),
            Ok(None) => (None, None),
            Err(err) => {
                warn!("saved selection unreadable, using defaults: {err}");
                (None, None)
            }
        };
        let selection = Selection::resolve(head, handle, options.len());
        debug!(
            "cosmetics ready: {} options, selection {{head: {}, handle: {}}}",
            options.len(),
            selection.head,
            selection.handle
        );
        CosmeticsService {
            palette,
            catalog,
            settings,
            owned,
            options,
            selection,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The current available options, base palette first.
    pub fn options(&self) -> &[Color] {
        &self.options
    }

    /// The committed selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Last-known entitlement snapshot.
    pub fn entitlements(&self) -> &EntitlementSet {
        &self.owned
    }

    /// The colors the committed selection resolves to right now.
    pub fn resolved_colors(&self) -> ApplyReport {
        apply_selection(self.selection, &self.options, &self.palette, &mut [])
    }

    /// Repaints targets with the committed selection.
    pub fn apply_committed(&self, targets: &mut [&mut dyn RenderTarget]) -> ApplyReport {
        apply_selection(self.selection, &self.options, &self.palette, targets)
    }

    /// Runs the full recompute pipeline for a fresh entitlement snapshot:
    /// rebuild options, re-validate the committed selection, repaint the
    /// live target, and refresh an open customization session when one
    /// exists.
    ///
    /// Runs to completion synchronously. Safe to call repeatedly with the
    /// same snapshot; duplicate store notifications collapse to a repaint
    /// with identical colors.
    pub fn sync_entitlements(
        &mut self,
        owned: EntitlementSet,
        live: &mut dyn RenderTarget,
        session: Option<&mut CustomizationSession>,
    ) -> SyncReport {
        let options = available_colors(&self.palette, &owned, &self.catalog);
        let options_changed = options != self.options;
        self.owned = owned;
        self.options = options;
        self.selection = self.selection.validated(self.options.len());
        let live_report = apply_selection(self.selection, &self.options, &self.palette, &mut [live]);
        if let Some(open) = session {
            open.revalidate(&self.options, &self.palette);
        }
        if options_changed {
            info!("available colors now {}", self.options.len());
        }
        SyncReport {
            options_changed,
            live: live_report,
        }
    }

    /// Opens a customization session around a clone of the live model.
    ///
    /// The preview starts painted with the committed selection, so both
    /// targets agree at open.
    pub fn open_session(&self, live: &HammerModel) -> CustomizationSession {
        let mut session = CustomizationSession::new(self.selection, live.preview_clone());
        session.repaint(&self.options, &self.palette);
        session
    }

    /// Applies a draft head pick. Preview only; the live model is untouched.
    pub fn select_head(
        &self,
        session: &mut CustomizationSession,
        index: usize,
    ) -> Result<ApplyReport, CosmeticsError> {
        self.check_index(index)?;
        session.set_head(index);
        Ok(session.repaint(&self.options, &self.palette))
    }

    /// Applies a draft handle pick. Preview only; the live model is untouched.
    pub fn select_handle(
        &self,
        session: &mut CustomizationSession,
        index: usize,
    ) -> Result<ApplyReport, CosmeticsError> {
        self.check_index(index)?;
        session.set_handle(index);
        Ok(session.repaint(&self.options, &self.palette))
    }

    /// Saves a session: validates the draft, persists the indices, commits
    /// them, and repaints the live target. The session (and its preview)
    /// is consumed.
    pub fn commit_session(
        &mut self,
        session: CustomizationSession,
        live: &mut dyn RenderTarget,
    ) -> Result<ApplyReport, CosmeticsError> {
        let draft = session.into_draft().validated(self.options.len());
        self.settings.save_selection(draft.head, draft.handle)?;
        self.selection = draft;
        info!(
            "customization saved: head {} handle {}",
            draft.head, draft.handle
        );
        Ok(self.apply_committed(&mut [live]))
    }

    fn check_index(&self, index: usize) -> Result<(), CosmeticsError> {
        let available = self.options.len();
        if index >= available {
            return Err(CosmeticsError::IndexOutOfRange { index, available });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::catalog::CatalogEntry;
    use tempfile::TempDir;

    const TEAL: Color = Color::rgb(26, 179, 153);
    const CRIMSON: Color = Color::rgb(180, 20, 40);

    fn test_catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            CatalogEntry::new("teal-id", "Teal", "A teal finish.", TEAL, "$0.99"),
            CatalogEntry::new("crimson-id", "Crimson", "A deep red.", CRIMSON, "$0.99"),
        ])
    }

    fn owned(ids: &[&str]) -> EntitlementSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn service(dir: &TempDir, set: EntitlementSet) -> CosmeticsService {
        let settings = SettingsStore::open(dir.path().join("settings")).unwrap();
        CosmeticsService::new(Palette::standard(), test_catalog(), settings, set)
    }

    fn live_for(service: &CosmeticsService) -> HammerModel {
        let resolved = service.resolved_colors();
        HammerModel::new(resolved.head, resolved.handle)
    }

    #[test]
    fn first_run_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, owned(&[]));
        assert_eq!(svc.options(), Palette::standard().colors());
        assert_eq!(svc.selection(), Selection { head: 0, handle: 1 });
        let resolved = svc.resolved_colors();
        assert_eq!(resolved.head, Color::rgb(85, 85, 85));
        assert_eq!(resolved.handle, Color::rgb(153, 102, 51));
    }

    #[test]
    fn sync_grows_options_and_keeps_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir, owned(&[]));
        let mut live = live_for(&svc);
        let report = svc.sync_entitlements(owned(&["teal-id"]), &mut live, None);
        assert!(report.options_changed);
        assert_eq!(svc.options().len(), 13);
        assert_eq!(svc.selection(), Selection { head: 0, handle: 1 });
        assert_eq!(live.head_color(), Color::rgb(85, 85, 85));
    }

    #[test]
    fn duplicate_sync_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir, owned(&["teal-id"]));
        let mut live = live_for(&svc);
        let report = svc.sync_entitlements(owned(&["teal-id"]), &mut live, None);
        assert!(!report.options_changed);
        assert_eq!(svc.options().len(), 13);
    }

    #[test]
    fn revocation_repairs_selection_and_repaints_live() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir, owned(&["teal-id"]));
        let mut live = live_for(&svc);
        let mut session = svc.open_session(&live);
        svc.select_head(&mut session, 12).unwrap();
        svc.commit_session(session, &mut live).unwrap();
        assert_eq!(live.head_color(), TEAL);

        let report = svc.sync_entitlements(owned(&[]), &mut live, None);
        assert!(report.options_changed);
        assert_eq!(svc.selection(), Selection { head: 0, handle: 1 });
        assert_eq!(live.head_color(), Color::rgb(85, 85, 85));
    }

    #[test]
    fn session_picks_paint_preview_only() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, owned(&[]));
        let live = live_for(&svc);
        let mut session = svc.open_session(&live);
        assert_eq!(session.preview().head_color(), live.head_color());

        let report = svc.select_head(&mut session, 2).unwrap();
        assert!(!report.fallback);
        assert_eq!(session.preview().head_color(), Color::rgb(255, 0, 0));
        assert_eq!(session.draft(), Selection { head: 2, handle: 1 });
        // The live model keeps the committed colors.
        assert_eq!(live.head_color(), Color::rgb(85, 85, 85));
    }

    #[test]
    fn select_rejects_out_of_range_indices() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, owned(&[]));
        let live = live_for(&svc);
        let mut session = svc.open_session(&live);
        let err = svc.select_head(&mut session, 12).unwrap_err();
        assert!(matches!(
            err,
            CosmeticsError::IndexOutOfRange { index: 12, available: 12 }
        ));
        assert_eq!(session.draft(), Selection { head: 0, handle: 1 });
    }

    #[test]
    fn commit_persists_and_paints_live() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut svc = service(&dir, owned(&[]));
            let mut live = live_for(&svc);
            let mut session = svc.open_session(&live);
            svc.select_head(&mut session, 2).unwrap();
            svc.select_handle(&mut session, 3).unwrap();
            let report = svc.commit_session(session, &mut live).unwrap();
            assert_eq!(report.head, Color::rgb(255, 0, 0));
            assert_eq!(live.handle_color(), Color::rgb(0, 0, 255));
            assert_eq!(svc.selection(), Selection { head: 2, handle: 3 });
        }
        // A fresh service over the same storage sees the saved selection.
        let svc = service(&dir, owned(&[]));
        assert_eq!(svc.selection(), Selection { head: 2, handle: 3 });
    }

    #[test]
    fn dropping_a_session_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, owned(&[]));
        let live = live_for(&svc);
        {
            let mut session = svc.open_session(&live);
            svc.select_head(&mut session, 5).unwrap();
        }
        assert_eq!(svc.selection(), Selection { head: 0, handle: 1 });
        assert_eq!(live.head_color(), Color::rgb(85, 85, 85));
        drop(svc);
        let reopened = service(&dir, owned(&[]));
        assert_eq!(reopened.selection(), Selection { head: 0, handle: 1 });
    }

    #[test]
    fn open_session_while_options_shrink_revalidates_draft() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir, owned(&["teal-id"]));
        let mut live = live_for(&svc);
        let mut session = svc.open_session(&live);
        svc.select_head(&mut session, 12).unwrap();
        assert_eq!(session.preview().head_color(), TEAL);

        svc.sync_entitlements(owned(&[]), &mut live, Some(&mut session));
        assert_eq!(session.draft(), Selection { head: 0, handle: 1 });
        assert_eq!(session.preview().head_color(), Color::rgb(85, 85, 85));
    }

    #[test]
    fn three_color_walkthrough() {
        let palette = Palette::new(vec![
            Color::rgb(85, 85, 85),
            Color::rgb(153, 102, 51),
            Color::rgb(255, 0, 0),
        ])
        .unwrap();
        let catalog = ProductCatalog::new(vec![CatalogEntry::new(
            "teal-id", "Teal", "A teal finish.", TEAL, "$0.99",
        )]);
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::open(dir.path().join("settings")).unwrap();

        let mut svc = CosmeticsService::new(
            palette.clone(),
            catalog.clone(),
            settings.clone(),
            owned(&[]),
        );
        assert_eq!(svc.options(), palette.colors());
        assert_eq!(svc.selection(), Selection { head: 0, handle: 1 });

        let mut live = live_for(&svc);
        assert_eq!(live.head_color(), Color::rgb(85, 85, 85));
        assert_eq!(live.handle_color(), Color::rgb(153, 102, 51));

        svc.sync_entitlements(owned(&["teal-id"]), &mut live, None);
        assert_eq!(svc.options().len(), 4);
        let mut session = svc.open_session(&live);
        svc.select_head(&mut session, 3).unwrap();
        svc.commit_session(session, &mut live).unwrap();
        assert_eq!(live.head_color(), TEAL);
        drop(svc);

        let svc = CosmeticsService::new(palette, catalog, settings, owned(&["teal-id"]));
        assert_eq!(svc.selection(), Selection { head: 3, handle: 1 });
        let resolved = svc.resolved_colors();
        assert_eq!(resolved.head, TEAL);
        assert_eq!(resolved.handle, Color::rgb(153, 102, 51));
    }
}
