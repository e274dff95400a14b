//! Overlay placement geometry.
//!
//! Pure math: given a target's bounds, the viewport and the step's preferred
//! side, choose where an overlay of a fixed size is anchored so that it stays
//! inside the viewport.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Side of the target an overlay is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Sides to try, in order, when `self` is preferred: preferred,
    /// opposite, then the two perpendicular sides.
    pub fn fallback_order(self) -> [Side; 4] {
        match self {
            Side::Top | Side::Bottom => [self, self.opposite(), Side::Left, Side::Right],
            Side::Left | Side::Right => [self, self.opposite(), Side::Top, Side::Bottom],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "side")]
pub enum Anchor {
    Side(Side),
    Centered,
}

/// Computed overlay position. `x`/`y` are the overlay's top-left corner in
/// viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub anchor: Anchor,
    pub x: f64,
    pub y: f64,
    /// False when the step is shown without a resolved target.
    pub highlighted: bool,
}

impl Placement {
    pub fn side(&self) -> Option<Side> {
        match self.anchor {
            Anchor::Side(side) => Some(side),
            Anchor::Centered => None,
        }
    }
}

/// Places overlays of a fixed size around targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Positioner {
    overlay: Size,
    gap: f64,
}

impl Positioner {
    pub fn new(overlay: Size, gap: f64) -> Self {
        Self { overlay, gap }
    }

    pub fn overlay(&self) -> Size {
        self.overlay
    }

    /// Anchor the overlay to `element`, falling back through
    /// [`Side::fallback_order`] and finally centring it in the viewport.
    pub fn compute(&self, element: Rect, viewport: Size, preferred: Side) -> Placement {
        for side in preferred.fallback_order() {
            if let Some((x, y)) = self.try_side(side, element, viewport) {
                return Placement {
                    anchor: Anchor::Side(side),
                    x,
                    y,
                    highlighted: true,
                };
            }
        }

        tracing::debug!(?preferred, "no side fits overlay, centring in viewport");
        Placement {
            highlighted: true,
            ..self.centered(viewport)
        }
    }

    /// Generic placement used when the target could not be resolved.
    pub fn unanchored(&self, viewport: Size) -> Placement {
        Placement {
            highlighted: false,
            ..self.centered(viewport)
        }
    }

    fn centered(&self, viewport: Size) -> Placement {
        Placement {
            anchor: Anchor::Centered,
            x: ((viewport.width - self.overlay.width) / 2.0).max(0.0),
            y: ((viewport.height - self.overlay.height) / 2.0).max(0.0),
            highlighted: false,
        }
    }

    fn try_side(&self, side: Side, element: Rect, viewport: Size) -> Option<(f64, f64)> {
        let Size { width, height } = self.overlay;
        match side {
            Side::Top | Side::Bottom => {
                if width > viewport.width {
                    return None;
                }
                let y = if side == Side::Top {
                    element.y - self.gap - height
                } else {
                    element.bottom() + self.gap
                };
                if y < 0.0 || y + height > viewport.height {
                    return None;
                }
                let x = clamp(element.center_x() - width / 2.0, viewport.width - width);
                Some((x, y))
            }
            Side::Left | Side::Right => {
                if height > viewport.height {
                    return None;
                }
                let x = if side == Side::Left {
                    element.x - self.gap - width
                } else {
                    element.right() + self.gap
                };
                if x < 0.0 || x + width > viewport.width {
                    return None;
                }
                let y = clamp(element.center_y() - height / 2.0, viewport.height - height);
                Some((x, y))
            }
        }
    }
}

fn clamp(value: f64, max: f64) -> f64 {
    value.min(max).max(0.0)
}
