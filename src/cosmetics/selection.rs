//! Selection indices for the head and handle, and their repair rules.

/// The two customization choices, as positions into the current
/// available-options list.
///
/// Selections are positional. Growing the option list never disturbs a valid
/// selection; shrinking it past an index resets that index to its default.
/// [`Selection::resolve`] is the single place those rules live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub head: usize,
    pub handle: usize,
}

impl Selection {
    /// Default head index when nothing valid is stored.
    pub const DEFAULT_HEAD: usize = 0;
    /// Preferred default handle index, clamped to the option count.
    pub const DEFAULT_HANDLE: usize = 1;

    /// Resolves possibly-absent, possibly-stale stored indices against the
    /// current option count.
    ///
    /// With zero options the selection collapses to `{0, 0}`; customization
    /// is unusable in that state and the applier paints the fallback pair.
    /// Otherwise each index is kept when in range and replaced with its
    /// positional default when absent or out of range: `0` for the head,
    /// `min(1, count - 1)` for the handle.
    pub fn resolve(head: Option<usize>, handle: Option<usize>, option_count: usize) -> Selection {
        if option_count == 0 {
            return Selection { head: 0, handle: 0 };
        }
        let head = match head {
            Some(i) if i < option_count => i,
            _ => Self::DEFAULT_HEAD,
        };
        let handle = match handle {
            Some(i) if i < option_count => i,
            _ => Self::DEFAULT_HANDLE.min(option_count - 1),
        };
        Selection { head, handle }
    }

    /// Re-validates this selection against a new option count.
    pub fn validated(self, option_count: usize) -> Selection {
        Self::resolve(Some(self.head), Some(self.handle), option_count)
    }

    /// True when both indices land inside `option_count` options.
    pub fn is_valid(self, option_count: usize) -> bool {
        self.head < option_count && self.handle < option_count
    }
}
