//! Type keys
//!
//! Every participant in a composition (contracts, partial layer types, concrete
//! base objects, primitive argument types) is named by a [`TypeKey`]. Keys are
//! compared by name; assignability between them is answered by the
//! [`TypeRegistry`](crate::registry::TypeRegistry).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of a type taking part in composition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Top type: every other type is assignable to it
    pub const ANY: &'static str = "any";
    /// Result type of members that return nothing
    pub const UNIT: &'static str = "unit";
    /// Boolean primitive
    pub const BOOL: &'static str = "bool";
    /// 64-bit signed integer primitive
    pub const INT: &'static str = "int";
    /// 64-bit float primitive
    pub const FLOAT: &'static str = "float";
    /// UTF-8 string primitive
    pub const STRING: &'static str = "string";
    /// Heterogeneous list of values
    pub const LIST: &'static str = "list";

    /// Create a key from a type name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn any() -> Self {
        Self::new(Self::ANY)
    }

    pub fn unit() -> Self {
        Self::new(Self::UNIT)
    }

    pub fn bool() -> Self {
        Self::new(Self::BOOL)
    }

    pub fn int() -> Self {
        Self::new(Self::INT)
    }

    pub fn float() -> Self {
        Self::new(Self::FLOAT)
    }

    pub fn string() -> Self {
        Self::new(Self::STRING)
    }

    pub fn list() -> Self {
        Self::new(Self::LIST)
    }

    /// The type name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the top type
    pub fn is_any(&self) -> bool {
        &*self.0 == Self::ANY
    }

    /// Whether this names one of the built-in primitive types
    pub fn is_primitive(&self) -> bool {
        matches!(
            &*self.0,
            Self::ANY | Self::UNIT | Self::BOOL | Self::INT | Self::FLOAT | Self::STRING | Self::LIST
        )
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&TypeKey> for TypeKey {
    fn from(key: &TypeKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
