use glam::DVec2;

/// Axis-aligned box in surface coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    /// Box with its top-left corner at `(x, y)`
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min: DVec2::new(x, y),
            max: DVec2::new(x + w, y + h),
        }
    }

    pub fn left(&self) -> f64 {
        self.min.x
    }

    pub fn right(&self) -> f64 {
        self.max.x
    }

    pub fn top(&self) -> f64 {
        self.min.y
    }

    pub fn bottom(&self) -> f64 {
        self.max.y
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    /// Move the box so its top-left corner sits at `corner`, keeping its size
    pub fn place_at(&mut self, corner: DVec2) {
        let size = self.size();
        self.min = corner;
        self.max = corner + size;
    }
}

/// Edge of the fixed box that a moving box was pushed out through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Strict overlap test. Boxes that only share an edge do not overlap.
pub fn overlaps(a: &Aabb, b: &Aabb) -> bool {
    a.right() > b.left() && a.left() < b.right() && a.bottom() > b.top() && a.top() < b.bottom()
}

/// Push `moving` out of `fixed` along the axis of least penetration.
///
/// Ties resolve in the order left, right, top, bottom. Only the position of
/// `moving` changes, and only along one axis. Returns `None` when no depth
/// is positive.
pub fn resolve(moving: &mut Aabb, fixed: &Aabb) -> Option<Side> {
    let depths = [
        (Side::Left, moving.right() - fixed.left()),
        (Side::Right, fixed.right() - moving.left()),
        (Side::Top, moving.bottom() - fixed.top()),
        (Side::Bottom, fixed.bottom() - moving.top()),
    ];

    let (side, _) = depths
        .into_iter()
        .filter(|(_, depth)| *depth > 0.0)
        .fold(None::<(Side, f64)>, |best, candidate| match best {
            Some((_, depth)) if depth <= candidate.1 => best,
            _ => Some(candidate),
        })?;

    let size = moving.size();
    let corner = match side {
        Side::Left => DVec2::new(fixed.left() - size.x, moving.top()),
        Side::Right => DVec2::new(fixed.right(), moving.top()),
        Side::Top => DVec2::new(moving.left(), fixed.top() - size.y),
        Side::Bottom => DVec2::new(moving.left(), fixed.bottom()),
    };
    moving.place_at(corner);
    Some(side)
}
