//! Storage-layer error types.

use crate::component::ComponentId;
use crate::entity::Entity;
use crate::world::WorldId;

/// Errors returned by the mutating operations of the storage core.
///
/// The convenience surface in [`crate::context`] folds every variant into the
/// zero-id sentinel or an absent return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity is not mapped in the world's entity table.
    #[error("unknown entity: {0}")]
    UnknownEntity(Entity),

    /// The component type is not registered in the world.
    #[error("unknown component type: {0}")]
    UnknownComponent(ComponentId),

    /// The world does not exist or has already been torn down.
    #[error("unknown world: {0}")]
    UnknownWorld(WorldId),

    /// Component types must have a positive byte size.
    #[error("component types must have a non-zero byte size")]
    ZeroSizedComponent,

    /// Initial component bytes did not match the registered size.
    #[error("component size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Growing a component store failed. The store is left as it was.
    #[error("failed to grow storage of {component} to {requested} instances")]
    AllocationFailed {
        component: ComponentId,
        requested: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcsError>;
