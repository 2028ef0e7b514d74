//! Build-time composition errors
//!
//! Every variant is fatal to the `build` call that produced it: no partially
//! assembled composite is ever returned.

use crate::resolver::InjectionCategory;
use strata_core::{RegistryError, TypeKey};
use thiserror::Error;

/// Error type for chain assembly
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The layer offers no site through which the delegate can be supplied
    #[error("{layer} has no injection point for a delegate of type {delegate}")]
    NoInjectionPoint {
        /// Partial type being resolved
        layer: TypeKey,
        /// Type of the delegate it was asked to wrap
        delegate: TypeKey,
    },

    /// More than one site in the same category accepts the delegate
    #[error("{layer} has ambiguous {category} injection points for {delegate}: {candidates:?}")]
    AmbiguousInjectionPoint {
        layer: TypeKey,
        delegate: TypeKey,
        /// Category in which the tie occurred
        category: InjectionCategory,
        /// Human-readable description of each competing site
        candidates: Vec<String>,
    },

    /// The extra constructor arguments do not line up with any constructor
    #[error("no constructor of {layer} accepts extra arguments {extras:?}")]
    ConstructorArityMismatch {
        layer: TypeKey,
        /// Types the extra arguments were matched by
        extras: Vec<TypeKey>,
    },

    /// A layer constructor failed
    #[error("failed to instantiate {layer}")]
    InstantiationFailure {
        layer: TypeKey,
        /// Error returned by the constructor factory
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The finished composite does not satisfy the requested output type
    #[error("composite of type {actual} does not satisfy {expected} (missing {missing:?})")]
    IncompatibleOutputType {
        /// Requested output type
        expected: TypeKey,
        /// Type the outermost layer reports
        actual: TypeKey,
        /// Members of `expected` the composite does not respond to
        missing: Vec<String>,
    },

    /// A contract member is neither implemented by a layer nor served by its delegate
    #[error("{layer} neither implements '{member}' of {contract} nor has a delegate serving it")]
    UnresolvedMember {
        layer: TypeKey,
        /// Contract that declares the member
        contract: TypeKey,
        member: String,
    },

    /// The chain declares more layers than the configured limit
    #[error("chain declares {declared} layers, limit is {limit}")]
    TooManyLayers {
        /// Layers the chain declares
        declared: usize,
        /// Configured `max_layers`
        limit: usize,
    },

    /// The chain's contract is not known to the registry
    #[error("contract lookup failed")]
    Registry(#[from] RegistryError),
}

impl ComposeError {
    /// Create an instantiation failure preserving the constructor's error
    pub fn instantiation_failed(
        layer: &TypeKey,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::InstantiationFailure {
            layer: layer.clone(),
            source: source.into(),
        }
    }

    /// Create an arity mismatch for the given extra argument types
    pub fn arity_mismatch(layer: &TypeKey, extras: &[TypeKey]) -> Self {
        Self::ConstructorArityMismatch {
            layer: layer.clone(),
            extras: extras.to_vec(),
        }
    }
}

/// Result alias for chain assembly
pub type Result<T> = std::result::Result<T, ComposeError>;
