//! Rectangle and perimeter geometry shared by classification, hover
//! detection and the border sweep animator.

/// Axis-aligned rectangle in viewport pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// Maps any point to a position on the rectangle's boundary, expressed as a
/// fraction of total perimeter length in `[0,1)` measured clockwise from the
/// top-left corner. Points off the boundary are projected to their nearest
/// edge first, so pointer coordinates slightly inside or outside a card still
/// yield a sensible crossing position.
pub fn perimeter_pos(rect: &Rect, px: f64, py: f64) -> f64 {
    let total = 2.0 * (rect.width + rect.height);
    if total <= 0.0 {
        return 0.0;
    }
    let cx = px.clamp(rect.x, rect.right());
    let cy = py.clamp(rect.y, rect.bottom());

    // Distance to each edge after clamping into the rectangle.
    let d_top = cy - rect.y;
    let d_right = rect.right() - cx;
    let d_bottom = rect.bottom() - cy;
    let d_left = cx - rect.x;
    let nearest = d_top.min(d_right).min(d_bottom).min(d_left);

    let along = if nearest == d_top {
        cx - rect.x
    } else if nearest == d_right {
        rect.width + (cy - rect.y)
    } else if nearest == d_bottom {
        rect.width + rect.height + (rect.right() - cx)
    } else {
        2.0 * rect.width + rect.height + (rect.bottom() - cy)
    };
    (along / total).rem_euclid(1.0)
}

/// Wrap-around distance between two perimeter positions. Never exceeds 0.5:
/// the two walk directions around the loop always offer a path of at most
/// half the perimeter.
pub fn wrap_dist(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(1.0);
    d.min(1.0 - d)
}
