// Game session: facade, configuration, host and strategies

pub mod config;
pub mod facade;
pub mod hooks;
pub mod host;
pub mod session;

pub use config::GameConfig;
pub use facade::{Game, Handler};
pub use hooks::{AttributeRender, ObjectMut, Render, RenderTarget, ScriptedUpdate, Update};
pub use host::{HeadlessHost, Host};
pub use session::{SessionState, Snapshot, SurfaceInfo};

use crate::engine::assets::AssetError;
use crate::markup::MarkupError;
use crate::script::ScriptError;

/// Errors surfaced by session operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("markup has no <game> root element")]
    MissingRoot,

    #[error("invalid object type {0:?}")]
    InvalidObjectType(String),

    #[error("game is not initialized; call init first")]
    NotInitialized,

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    /// An update, render or listener callback failed
    #[error("callback failed: {0:#}")]
    Callback(anyhow::Error),
}
