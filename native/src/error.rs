//! Error types for the rendering core.
//!
//! Style application and layout never fail; they degrade silently. The
//! variants here cover tree API misuse, patch batches that must fall back to
//! a full rebuild, and terminal setup.

use crate::tree::NodeHandle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LotusError {
    #[error("Invalid handle: {0}")]
    InvalidHandle(NodeHandle),

    #[error("Node {0} is a leaf and cannot have children")]
    LeafNode(NodeHandle),

    #[error("Appending {child} under {parent} would create a cycle")]
    Cycle { parent: NodeHandle, child: NodeHandle },

    #[error("Patch target not found: {0:?}")]
    PatchTargetNotFound(String),

    #[error("Patch batch contains a structural patch ({0}); full rebuild required")]
    StructuralPatch(&'static str),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Event loop channel disconnected")]
    Disconnected,
}

impl LotusError {
    /// Whether the render context should answer this error with a full
    /// rebuild instead of surfacing it.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Self::PatchTargetNotFound(_) | Self::StructuralPatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LotusError>;
