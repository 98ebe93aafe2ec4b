//! markup-arcade: a small 2D game runtime driven by declarative markup.
//!
//! A `<game>` document declares objects, sprites, sounds and scripted
//! methods. [`Game`] builds a session from it, runs a fixed-order frame loop
//! (update, collision, render) and draws onto an offscreen [`Surface`].

pub mod core;
pub mod engine;
pub mod game;
pub mod markup;
pub mod object;
pub mod script;

pub use engine::assets::{AssetError, BatchPolicy, ResourceRegistry};
pub use engine::input::Event;
pub use engine::renderer::{Color, Surface};
pub use game::{Game, GameConfig, GameError};
pub use markup::{Document, Element};
pub use object::{GameObject, Value};
