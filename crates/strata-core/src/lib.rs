#![deny(clippy::await_holding_lock)]
//! # Strata Core - Object Model
//!
//! The reflection-equivalent facility the composition engine works against:
//! type keys and their assignability, dynamic values, contracts with member
//! signatures, the [`Object`] invocation interface, and engine configuration.

pub mod config;
pub mod contract;
pub mod errors;
pub mod object;
pub mod registry;
pub mod types;
pub mod value;

pub use config::{ComposeConfig, ConfigError};
pub use contract::{Contract, MemberSig};
pub use errors::{InvokeError, InvokeResult, RegistryError, SharedError};
pub use object::{arg, check_arity, Object, ObjectRef};
pub use registry::TypeRegistry;
pub use types::TypeKey;
pub use value::Value;
