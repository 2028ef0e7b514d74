//! Runtime and registry errors
//!
//! [`InvokeError`] is what a member call returns when it fails. Forwarding layers
//! hand these back unchanged, so a failure raised deep inside a chain reaches the
//! caller with its original cause intact.

use crate::types::TypeKey;
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error cause
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error returned by a member invocation
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// The receiver has no member with this name
    #[error("'{member}' is not a member of {type_key}")]
    UnknownMember { type_key: TypeKey, member: String },

    /// An interceptor neither computed a result for nor forwarded this member
    #[error("interceptor neither handled nor forwarded '{member}'")]
    UnhandledMember { member: String },

    /// Wrong number of arguments
    #[error("'{member}' expects {expected} argument(s), got {found}")]
    ArgumentMismatch {
        member: String,
        /// Number of arguments the member takes
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },

    /// An argument or result had the wrong type
    #[error("'{member}' expected a value of type {expected}, found {found}")]
    TypeMismatch {
        member: String,
        expected: TypeKey,
        found: TypeKey,
    },

    /// A layer read a state slot that was never filled
    #[error("'{member}' read state slot '{slot}', which holds no value")]
    MissingSlot { member: String, slot: String },

    /// The member implementation raised a failure
    #[error("'{member}' raised: {source}")]
    Raised {
        member: String,
        #[source]
        source: SharedError,
    },
}

impl InvokeError {
    /// Create an unknown member error
    pub fn unknown_member(type_key: &TypeKey, member: impl Into<String>) -> Self {
        Self::UnknownMember {
            type_key: type_key.clone(),
            member: member.into(),
        }
    }

    /// Create an unhandled member error
    pub fn unhandled(member: impl Into<String>) -> Self {
        Self::UnhandledMember {
            member: member.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(member: impl Into<String>, expected: TypeKey, found: TypeKey) -> Self {
        Self::TypeMismatch {
            member: member.into(),
            expected,
            found,
        }
    }

    /// Create a missing slot error
    pub fn missing_slot(member: impl Into<String>, slot: impl Into<String>) -> Self {
        Self::MissingSlot {
            member: member.into(),
            slot: slot.into(),
        }
    }

    /// Wrap a failure raised by a member implementation
    pub fn raised(
        member: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Raised {
            member: member.into(),
            source: Arc::new(source),
        }
    }

    /// Name of the member the error belongs to
    pub fn member(&self) -> &str {
        match self {
            Self::UnknownMember { member, .. }
            | Self::UnhandledMember { member }
            | Self::ArgumentMismatch { member, .. }
            | Self::TypeMismatch { member, .. }
            | Self::MissingSlot { member, .. }
            | Self::Raised { member, .. } => member,
        }
    }
}

/// Error type for type registry operations
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A contract with the same key is already registered
    #[error("contract {key} is already registered")]
    DuplicateContract { key: TypeKey },

    /// The key does not name a registered contract
    #[error("contract {key} is not registered")]
    UnknownContract { key: TypeKey },

    /// A primitive type cannot be redeclared
    #[error("primitive type {key} cannot be redeclared")]
    PrimitiveRedeclared { key: TypeKey },
}

/// Result alias for member invocations
pub type InvokeResult<T> = std::result::Result<T, InvokeError>;
