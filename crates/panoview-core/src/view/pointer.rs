use crate::coords::{ImagePoint, WindowPoint};
use crate::selection::{CursorHint, PixelRect, SelectionResponse};

use super::ViewState;

/// Result of routing a pointer event through the view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerResponse {
    pub redraw: bool,
    pub cursor: CursorHint,
    /// Hover description for the status line, when it changed.
    pub status: Option<String>,
}

impl PointerResponse {
    fn from_selection(r: SelectionResponse) -> Self {
        Self {
            redraw: r.redraw,
            cursor: r.cursor.unwrap_or_default(),
            status: None,
        }
    }
}

impl ViewState {
    /// Oriented pixel under the pointer, clamped to the image.
    fn selection_point(&self, p: WindowPoint) -> ImagePoint {
        let size = self.image_size();
        let q = self.oriented_for_window(p);
        ImagePoint::new(q.x.clamp(0.0, size.width), q.y.clamp(0.0, size.height))
    }

    /// Start a selection; with a point, that point is the first corner.
    /// Panoramas have no selection.
    pub fn begin_selection(&mut self, at: Option<WindowPoint>) {
        if self.is_360() {
            return;
        }
        let first = at.map(|p| self.selection_point(p));
        self.selection.begin(first);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Take the finished selection for cropping; the selection is cleared.
    pub fn commit_selection(&mut self) -> Option<PixelRect> {
        self.selection.commit()
    }

    pub fn pointer_pressed(&mut self, p: WindowPoint) -> PointerResponse {
        if !self.is_360() {
            let q = self.selection_point(p);
            let hover = self.hover_threshold();
            let r = self.selection.pointer_pressed(q, hover);
            if r.consumed {
                return PointerResponse::from_selection(r);
            }
        }
        self.drag_anchor = Some(p);
        PointerResponse {
            redraw: false,
            cursor: CursorHint::Grabbing,
            status: None,
        }
    }

    pub fn pointer_moved(&mut self, p: WindowPoint) -> PointerResponse {
        let mut cursor = CursorHint::Default;
        if !self.is_360() {
            let q = self.selection_point(p);
            let hover = self.hover_threshold();
            let r = self.selection.pointer_moved(q, hover);
            if r.consumed {
                return PointerResponse::from_selection(r);
            }
            cursor = r.cursor.unwrap_or_default();
        }
        if let Some(prev) = self.drag_anchor {
            self.drag_relative(prev, p);
            self.drag_anchor = Some(p);
            return PointerResponse {
                redraw: true,
                cursor: CursorHint::Grabbing,
                status: None,
            };
        }
        PointerResponse {
            redraw: false,
            cursor,
            status: Some(self.status_text(p)),
        }
    }

    pub fn pointer_released(&mut self, p: WindowPoint) -> PointerResponse {
        let was_dragging = self.drag_anchor.take().is_some();
        if !self.is_360() {
            let q = self.selection_point(p);
            let r = self.selection.pointer_released(q);
            if r.consumed {
                return PointerResponse::from_selection(r);
            }
        }
        PointerResponse {
            redraw: was_dragging,
            cursor: CursorHint::Default,
            status: None,
        }
    }
}
