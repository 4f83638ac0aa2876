//! The customization screen's state: a draft selection and a preview model.

use log::debug;

use crate::game::HammerModel;

use super::apply::{apply_selection, ApplyReport};
use super::palette::{Color, Palette};
use super::selection::Selection;

/// An open customization screen.
///
/// Owns the ephemeral preview hammer (cloned from the live model on open)
/// and a draft selection seeded from the committed one. Picks repaint the
/// preview only; nothing touches the live model or storage until the session
/// is committed through
/// [`CosmeticsService::commit_session`](super::CosmeticsService::commit_session).
/// Dropping the session discards both the draft and the preview.
#[derive(Debug)]
pub struct CustomizationSession {
    draft: Selection,
    preview: HammerModel,
}

impl CustomizationSession {
    pub(super) fn new(draft: Selection, preview: HammerModel) -> Self {
        CustomizationSession { draft, preview }
    }

    /// Current draft selection.
    pub fn draft(&self) -> Selection {
        self.draft
    }

    /// The preview model, for inspection.
    pub fn preview(&self) -> &HammerModel {
        &self.preview
    }

    pub(super) fn set_head(&mut self, index: usize) {
        self.draft.head = index;
        debug!("draft head index -> {index}");
    }

    pub(super) fn set_handle(&mut self, index: usize) {
        self.draft.handle = index;
        debug!("draft handle index -> {index}");
    }

    /// Repaints the preview from the draft.
    pub(super) fn repaint(&mut self, options: &[Color], base: &Palette) -> ApplyReport {
        apply_selection(self.draft, options, base, &mut [&mut self.preview])
    }

    /// Re-validates the draft against a changed option list and repaints.
    /// Called by the service during an entitlement resync.
    pub(super) fn revalidate(&mut self, options: &[Color], base: &Palette) -> ApplyReport {
        self.draft = self.draft.validated(options.len());
        self.repaint(options, base)
    }

    pub(super) fn into_draft(self) -> Selection {
        self.draft
    }
}
