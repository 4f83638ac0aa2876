//! Pushing a selection onto render targets.
//!
//! The applier is the one place indices become concrete colors. It never
//! panics on bad input: a selection that escaped validation paints the base
//! fallback pair instead, so no target is ever left showing stale state.

use log::warn;

use super::palette::{Color, Palette};
use super::selection::Selection;

/// Anything that can take a head color and a handle color and redraw.
///
/// `paint` must finish the redraw before returning; callers inspect targets
/// immediately after applying. Implementations live with their owners: the
/// live model belongs to the game session, the preview to the customization
/// session.
pub trait RenderTarget {
    fn paint(&mut self, head: Color, handle: Color);
}

/// What an apply pass painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub head: Color,
    pub handle: Color,
    /// True when the fallback pair was painted instead of the selection.
    pub fallback: bool,
}

/// Paints every target with the selected colors, or with the fallback pair
/// `(base[0], base[1] or base[0])` when the selection does not fit the
/// options.
///
/// All targets receive the same pair in one pass; live and preview can not
/// diverge through this path.
pub fn apply_selection(
    selection: Selection,
    options: &[Color],
    base: &Palette,
    targets: &mut [&mut dyn RenderTarget],
) -> ApplyReport {
    let report = if selection.is_valid(options.len()) {
        ApplyReport {
            head: options[selection.head],
            handle: options[selection.handle],
            fallback: false,
        }
    } else {
        warn!(
            "selection {{head: {}, handle: {}}} invalid for {} options, painting fallback pair",
            selection.head,
            selection.handle,
            options.len()
        );
        ApplyReport {
            head: base.fallback_head(),
            handle: base.fallback_handle(),
            fallback: true,
        }
    };
    for target in targets.iter_mut() {
        target.paint(report.head, report.handle);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        head: Option<Color>,
        handle: Option<Color>,
        paints: usize,
    }

    impl RenderTarget for Probe {
        fn paint(&mut self, head: Color, handle: Color) {
            self.head = Some(head);
            self.handle = Some(handle);
            self.paints += 1;
        }
    }

    fn base() -> Palette {
        Palette::new(vec![
            Color::rgb(85, 85, 85),
            Color::rgb(153, 102, 51),
            Color::rgb(255, 0, 0),
        ])
        .unwrap()
    }

    #[test]
    fn valid_selection_paints_every_target_identically() {
        let palette = base();
        let options = palette.colors().to_vec();
        let mut live = Probe::default();
        let mut preview = Probe::default();
        let report = apply_selection(
            Selection { head: 2, handle: 1 },
            &options,
            &palette,
            &mut [&mut live, &mut preview],
        );
        assert!(!report.fallback);
        assert_eq!(report.head, Color::rgb(255, 0, 0));
        assert_eq!(report.handle, Color::rgb(153, 102, 51));
        for probe in [&live, &preview] {
            assert_eq!(probe.head, Some(report.head));
            assert_eq!(probe.handle, Some(report.handle));
            assert_eq!(probe.paints, 1);
        }
    }

    #[test]
    fn invalid_selection_paints_the_fallback_pair() {
        let palette = base();
        let options = palette.colors().to_vec();
        let mut live = Probe::default();
        let report = apply_selection(
            Selection { head: 99, handle: 1 },
            &options,
            &palette,
            &mut [&mut live],
        );
        assert!(report.fallback);
        assert_eq!(live.head, Some(Color::rgb(85, 85, 85)));
        assert_eq!(live.handle, Some(Color::rgb(153, 102, 51)));
        assert_eq!(live.paints, 1, "target must not be left untouched");
    }

    #[test]
    fn empty_options_paint_the_fallback_pair() {
        let palette = base();
        let mut live = Probe::default();
        let report = apply_selection(
            Selection { head: 0, handle: 0 },
            &[],
            &palette,
            &mut [&mut live],
        );
        assert!(report.fallback);
        assert_eq!(live.head, Some(palette.fallback_head()));
        assert_eq!(live.handle, Some(palette.fallback_handle()));
    }

    #[test]
    fn single_color_palette_falls_back_to_that_color_twice() {
        let palette = Palette::new(vec![Color::rgb(9, 9, 9)]).unwrap();
        let mut live = Probe::default();
        let report = apply_selection(
            Selection { head: 5, handle: 5 },
            palette.colors(),
            &palette,
            &mut [&mut live],
        );
        assert!(report.fallback);
        assert_eq!(report.head, Color::rgb(9, 9, 9));
        assert_eq!(report.handle, Color::rgb(9, 9, 9));
    }

    #[test]
    fn no_targets_still_reports_the_resolved_pair() {
        let palette = base();
        let options = palette.colors().to_vec();
        let report = apply_selection(Selection { head: 0, handle: 1 }, &options, &palette, &mut []);
        assert_eq!(report.head, options[0]);
        assert_eq!(report.handle, options[1]);
    }
}
