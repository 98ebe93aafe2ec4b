// Software rendering onto an RGBA surface

mod color;
mod surface;

pub use color::{Color, ColorError};
pub use surface::Surface;
