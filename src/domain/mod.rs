//! Domain types for snactor.
//!
//! Actor definitions as loaded from `_actor.yaml` files.

pub mod definition;

// Re-export commonly used types
pub use definition::{
    ChannelDecl, Definition, ExecuteSpec, OutputProcessor, RemoteSpec, TypeRef,
    DEFAULT_REMOTE_HOST, DEFAULT_REMOTE_USER, DEFAULT_TYPE_VERSION,
};
