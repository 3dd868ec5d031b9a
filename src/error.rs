//! Failure modes of the interaction core.
//!
//! None of these are fatal. Callers log them with `warn!` and carry on as if the
//! requested feature simply did not activate.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    /// The node has not been loaded yet, or was removed from the scene.
    #[error("node `{name}` is not loaded")]
    NotLoaded { name: String },
    /// The node exists but is not tagged as a camera rig.
    #[error("node `{name}` is not a camera rig")]
    NotACameraRig { name: String },
    #[error("node `{target}` carries no animation clips")]
    MissingClipLibrary { target: String },
    #[error("clip `{clip}` not found on `{target}`")]
    MissingClip { target: String, clip: String },
    #[error("no interactive camera in the scene")]
    NoCamera,
}

impl InteractionError {
    /// True for errors caused by assets that are still loading.
    pub const fn is_not_loaded(&self) -> bool { matches!(self, Self::NotLoaded { .. }) }
}
