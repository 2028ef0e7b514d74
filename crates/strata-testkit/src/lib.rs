//! Strata Testing Infrastructure
//!
//! Shared fixtures for composition tests: a mutable sequence base object and the
//! contracts it satisfies, sample partial layers covering every injection
//! category, call-order recorders, and tracing setup for test binaries.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,ignore
//! use strata_testkit::*;
//!
//! #[test]
//! fn doubles_adds() {
//!     let registry = sequence_registry();
//!     let view: SequenceView = ChainBuilder::new(&registry, SEQUENCE)
//!         .layer(doubling_add())
//!         .build_view(SequenceObject::shared())
//!         .unwrap();
//!     view.add(5).unwrap();
//!     assert_eq!(view.get(0).unwrap(), Value::from(10));
//! }
//! ```

pub mod layers;
pub mod logging;
pub mod recording;
pub mod sequence;

pub use layers::*;
pub use logging::init_tracing;
pub use recording::*;
pub use sequence::*;

// Re-export commonly used engine types for convenience
pub use strata_composition::{ChainBuilder, ComposeError, Composite, ContractView};
pub use strata_core::{ComposeConfig, InvokeError, Object, ObjectRef, TypeKey, TypeRegistry, Value};
