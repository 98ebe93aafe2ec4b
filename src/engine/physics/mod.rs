// Collision system: axis-aligned boxes, overlap tests and push-out resolution

mod collision;

pub use collision::{overlaps, resolve, Aabb, Side};
