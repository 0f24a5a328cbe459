//! Error taxonomy for the world core.
//!
//! Every fallible operation returns an [`EcsError`]. Each variant maps to
//! exactly one boundary [`ErrorCode`] through [`EcsError::code`].

use crate::entity::Entity;

/// Numeric status reported across the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Success.
    Ok = 0,
    /// A null pointer was passed where a value was required.
    NullPointer = 1,
    /// A dead or unknown entity/world handle.
    InvalidHandle = 2,
    /// Allocation exhaustion.
    OutOfMemory = 3,
    /// Malformed input, rejected before any mutation.
    InvalidArgument = 4,
    /// A logic failure localised to one subsystem.
    OperationFailed = 5,
    /// An internal invariant was violated.
    Panic = 6,
}

/// Errors that can occur inside the world core.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is not alive (never created, or already destroyed).
    #[error("invalid entity handle {0}")]
    InvalidHandle(Entity),

    /// The entity is alive but does not carry the requested component.
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        /// The entity that was addressed.
        entity: Entity,
        /// Name of the missing component kind.
        component: &'static str,
    },

    /// A store operation addressed a kind that was never registered.
    #[error("component kind `{0}` is not registered")]
    Unregistered(String),

    /// Malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failed while growing a table or store.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Registration attempted after the registry was locked by the first update.
    #[error("registry is locked; `{0}` cannot be registered after the first update")]
    RegistryLocked(String),

    /// A persisted kind disagrees with the loader's registration.
    #[error("incompatible component kind `{name}`: {reason}")]
    Incompatible {
        /// Name of the kind found in the stream.
        name: String,
        /// What differed.
        reason: String,
    },

    /// Generic subsystem failure.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Failed to encode a value to MessagePack.
    #[error("failed to encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a value from MessagePack.
    #[error("failed to decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Snapshot file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant no longer holds. The instance should be discarded.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EcsError {
    /// The boundary code this error is reported as.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidHandle(_) | Self::MissingComponent { .. } => ErrorCode::InvalidHandle,
            Self::Unregistered(_) | Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::OutOfMemory(_) => ErrorCode::OutOfMemory,
            Self::RegistryLocked(_)
            | Self::Incompatible { .. }
            | Self::OperationFailed(_)
            | Self::Encode(_)
            | Self::Decode(_)
            | Self::Io(_) => ErrorCode::OperationFailed,
            Self::Invariant(_) => ErrorCode::Panic,
        }
    }

    /// Shorthand for [`EcsError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`EcsError::OperationFailed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }
}

/// Convenience alias used throughout the workspace.
pub type EcsResult<T> = Result<T, EcsError>;
