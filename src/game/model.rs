use crate::cosmetics::{Color, RenderTarget};

/// One paintable piece of the hammer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPart {
    color: Color,
}

impl ModelPart {
    pub fn color(&self) -> Color {
        self.color
    }
}

/// The hammer as the renderer sees it: two parts, each with a current color.
///
/// The parts are plain fields, so painting never goes through a lookup that
/// could miss. The live model belongs to the game session; preview copies
/// come from [`HammerModel::preview_clone`].
#[derive(Debug, Clone)]
pub struct HammerModel {
    head: ModelPart,
    handle: ModelPart,
    repaints: u64,
}

impl HammerModel {
    pub fn new(head: Color, handle: Color) -> Self {
        Self {
            head: ModelPart { color: head },
            handle: ModelPart { color: handle },
            repaints: 0,
        }
    }

    /// A detached copy for a customization preview, with a fresh repaint
    /// counter so tests can watch it being driven.
    pub fn preview_clone(&self) -> Self {
        Self {
            head: self.head,
            handle: self.handle,
            repaints: 0,
        }
    }

    pub fn head_color(&self) -> Color {
        self.head.color
    }

    pub fn handle_color(&self) -> Color {
        self.handle.color
    }

    /// How many times this model has been painted since creation.
    pub fn repaints(&self) -> u64 {
        self.repaints
    }
}

impl RenderTarget for HammerModel {
    fn paint(&mut self, head: Color, handle: Color) {
        self.head.color = head;
        self.handle.color = handle;
        self.repaints += 1;
    }
}
