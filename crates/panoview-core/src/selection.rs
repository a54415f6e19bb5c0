//! Interactive rectangle selection in oriented image pixels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::ImagePoint;

/// Half-open rectangle `[left, right) × [top, bottom)` in oriented pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        let mut rect = Self { left, top, right, bottom };
        rect.sort();
        rect
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, p: ImagePoint) -> bool {
        p.x >= f64::from(self.left)
            && p.x < f64::from(self.right)
            && p.y >= f64::from(self.top)
            && p.y < f64::from(self.bottom)
    }

    fn sort(&mut self) {
        if self.left > self.right {
            std::mem::swap(&mut self.left, &mut self.right);
        }
        if self.top > self.bottom {
            std::mem::swap(&mut self.top, &mut self.bottom);
        }
    }
}

impl fmt::Display for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] - [{}, {}] ({}x{})",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Inactive,
    FindingFirstPoint,
    FindingSecondPoint,
    Complete,
}

/// Edge or corner being dragged while a selection is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjustHandle {
    #[default]
    None,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl AdjustHandle {
    fn moves_left(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }

    fn mirrored_horizontally(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::TopLeft => Self::TopRight,
            Self::TopRight => Self::TopLeft,
            Self::BottomLeft => Self::BottomRight,
            Self::BottomRight => Self::BottomLeft,
            other => other,
        }
    }

    fn mirrored_vertically(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::TopLeft => Self::BottomLeft,
            Self::BottomLeft => Self::TopLeft,
            Self::TopRight => Self::BottomRight,
            Self::BottomRight => Self::TopRight,
            other => other,
        }
    }

    pub fn cursor(self) -> CursorHint {
        match self {
            Self::None => CursorHint::Default,
            Self::Left | Self::Right => CursorHint::ResizeHorizontal,
            Self::Top | Self::Bottom => CursorHint::ResizeVertical,
            Self::TopLeft | Self::BottomRight => CursorHint::ResizeNwSe,
            Self::TopRight | Self::BottomLeft => CursorHint::ResizeNeSw,
        }
    }
}

/// Pointer shape the shell should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    ResizeHorizontal,
    ResizeVertical,
    ResizeNwSe,
    ResizeNeSw,
    Grabbing,
}

/// What a pointer event did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionResponse {
    /// The selection handled the event; the view should not pan.
    pub consumed: bool,
    pub redraw: bool,
    pub cursor: Option<CursorHint>,
}

/// Round to the nearest pixel, saturating at zero.
fn pixel(v: f64) -> u32 {
    (v + 0.5).max(0.0) as u32
}

#[derive(Debug, Clone, Default)]
pub struct SelectionBox {
    bounds: PixelRect,
    first: (u32, u32),
    state: SelectionState,
    adjusting: AdjustHandle,
}

impl SelectionBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    pub fn adjusting(&self) -> AdjustHandle {
        self.adjusting
    }

    /// True while there is a rectangle worth drawing.
    pub fn is_visible(&self) -> bool {
        matches!(
            self.state,
            SelectionState::FindingSecondPoint | SelectionState::Complete
        )
    }

    pub fn begin(&mut self, point: Option<ImagePoint>) {
        self.adjusting = AdjustHandle::None;
        match point {
            None => {
                self.bounds = PixelRect::default();
                self.state = SelectionState::FindingFirstPoint;
            }
            Some(p) => {
                self.set_first(p);
                self.state = SelectionState::FindingSecondPoint;
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Hand out a finished, non-empty selection and reset.
    pub fn commit(&mut self) -> Option<PixelRect> {
        let rect = (self.state == SelectionState::Complete && !self.bounds.is_empty())
            .then_some(self.bounds);
        self.clear();
        rect
    }

    fn set_first(&mut self, p: ImagePoint) {
        self.first = (pixel(p.x), pixel(p.y));
        self.bounds = PixelRect::new(self.first.0, self.first.1, self.first.0, self.first.1);
    }

    fn set_second(&mut self, p: ImagePoint) {
        self.bounds = PixelRect::new(self.first.0, self.first.1, pixel(p.x), pixel(p.y));
    }

    /// Classify a point against the edges of a complete selection. `hover`
    /// is the grab distance in image pixels.
    pub fn hit_test(&self, p: ImagePoint, hover: f64) -> AdjustHandle {
        if self.state != SelectionState::Complete {
            return AdjustHandle::None;
        }
        let b = &self.bounds;
        let d_left = (p.x - f64::from(b.left)).abs();
        let d_right = (p.x - f64::from(b.right)).abs();
        let d_top = (p.y - f64::from(b.top)).abs();
        let d_bottom = (p.y - f64::from(b.bottom)).abs();

        let mut nearest = (AdjustHandle::Left, d_left);
        for candidate in [
            (AdjustHandle::Right, d_right),
            (AdjustHandle::Top, d_top),
            (AdjustHandle::Bottom, d_bottom),
        ] {
            if candidate.1 < nearest.1 {
                nearest = candidate;
            }
        }
        if nearest.1 > hover {
            return AdjustHandle::None;
        }

        match nearest.0 {
            AdjustHandle::Left | AdjustHandle::Right => {
                let left = nearest.0 == AdjustHandle::Left;
                let vertical = if d_top <= d_bottom {
                    (d_top, true)
                } else {
                    (d_bottom, false)
                };
                match (vertical.0 <= hover, left, vertical.1) {
                    (false, _, _) => nearest.0,
                    (true, true, true) => AdjustHandle::TopLeft,
                    (true, true, false) => AdjustHandle::BottomLeft,
                    (true, false, true) => AdjustHandle::TopRight,
                    (true, false, false) => AdjustHandle::BottomRight,
                }
            }
            _ => {
                let top = nearest.0 == AdjustHandle::Top;
                let horizontal = if d_left <= d_right {
                    (d_left, true)
                } else {
                    (d_right, false)
                };
                match (horizontal.0 <= hover, top, horizontal.1) {
                    (false, _, _) => nearest.0,
                    (true, true, true) => AdjustHandle::TopLeft,
                    (true, true, false) => AdjustHandle::TopRight,
                    (true, false, true) => AdjustHandle::BottomLeft,
                    (true, false, false) => AdjustHandle::BottomRight,
                }
            }
        }
    }

    pub fn pointer_pressed(&mut self, p: ImagePoint, hover: f64) -> SelectionResponse {
        match self.state {
            SelectionState::Inactive => SelectionResponse::default(),
            SelectionState::FindingFirstPoint => {
                self.set_first(p);
                self.state = SelectionState::FindingSecondPoint;
                SelectionResponse {
                    consumed: true,
                    redraw: true,
                    cursor: Some(CursorHint::Crosshair),
                }
            }
            SelectionState::FindingSecondPoint => {
                self.set_second(p);
                self.state = SelectionState::Complete;
                SelectionResponse {
                    consumed: true,
                    redraw: true,
                    cursor: Some(CursorHint::Default),
                }
            }
            SelectionState::Complete => {
                self.adjusting = self.hit_test(p, hover);
                SelectionResponse {
                    consumed: self.adjusting != AdjustHandle::None,
                    redraw: false,
                    cursor: Some(self.adjusting.cursor()),
                }
            }
        }
    }

    pub fn pointer_moved(&mut self, p: ImagePoint, hover: f64) -> SelectionResponse {
        match self.state {
            SelectionState::Inactive => SelectionResponse::default(),
            SelectionState::FindingFirstPoint => SelectionResponse {
                consumed: false,
                redraw: false,
                cursor: Some(CursorHint::Crosshair),
            },
            SelectionState::FindingSecondPoint => {
                self.set_second(p);
                SelectionResponse {
                    consumed: true,
                    redraw: true,
                    cursor: Some(CursorHint::Crosshair),
                }
            }
            SelectionState::Complete if self.adjusting != AdjustHandle::None => {
                self.adjust(p);
                SelectionResponse {
                    consumed: true,
                    redraw: true,
                    cursor: Some(self.adjusting.cursor()),
                }
            }
            SelectionState::Complete => SelectionResponse {
                consumed: false,
                redraw: false,
                cursor: Some(self.hit_test(p, hover).cursor()),
            },
        }
    }

    /// Releasing away from the first corner finishes a press-drag gesture.
    pub fn pointer_released(&mut self, p: ImagePoint) -> SelectionResponse {
        if self.state == SelectionState::FindingSecondPoint
            && (pixel(p.x), pixel(p.y)) != self.first
        {
            self.set_second(p);
            self.state = SelectionState::Complete;
            return SelectionResponse {
                consumed: true,
                redraw: true,
                cursor: Some(CursorHint::Default),
            };
        }
        if self.adjusting != AdjustHandle::None {
            self.adjusting = AdjustHandle::None;
            return SelectionResponse {
                consumed: true,
                redraw: true,
                cursor: None,
            };
        }
        SelectionResponse::default()
    }

    fn adjust(&mut self, p: ImagePoint) {
        let (x, y) = (pixel(p.x), pixel(p.y));
        let handle = self.adjusting;
        if handle.moves_left() {
            self.bounds.left = x;
        }
        if handle.moves_right() {
            self.bounds.right = x;
        }
        if handle.moves_top() {
            self.bounds.top = y;
        }
        if handle.moves_bottom() {
            self.bounds.bottom = y;
        }
        if self.bounds.left > self.bounds.right {
            self.adjusting = self.adjusting.mirrored_horizontally();
        }
        if self.bounds.top > self.bounds.bottom {
            self.adjusting = self.adjusting.mirrored_vertically();
        }
        self.bounds.sort();
    }
}
