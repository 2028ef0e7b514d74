//! The invocation interface shared by base objects, layers and composites
//!
//! Composition happens over type-erased objects: every base object, every
//! synthesized layer wrapper and every finished composite implements [`Object`]
//! and is addressed through member names. Dispatch is by name so that a layer can
//! forward any member it does not implement without knowing the member set at
//! compile time.

use crate::errors::InvokeError;
use crate::types::TypeKey;
use crate::value::Value;
use std::sync::Arc;

/// Primary interface for all composable objects
///
/// Implementations must be `Send + Sync`; objects with mutable state use
/// interior mutability. The engine never adds locking of its own.
pub trait Object: Send + Sync {
    /// Declared type of this object
    fn type_key(&self) -> TypeKey;

    /// Whether a call to `member` can be served by this object
    fn responds_to(&self, member: &str) -> bool;

    /// Invoke `member` with `args`
    fn invoke(&self, member: &str, args: &[Value]) -> Result<Value, InvokeError>;
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.type_key())
    }
}

/// Shared handle to a composable object
pub type ObjectRef = Arc<dyn Object>;

/// Check that a call received exactly `expected` arguments
pub fn check_arity(member: &str, args: &[Value], expected: usize) -> Result<(), InvokeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(InvokeError::ArgumentMismatch {
            member: member.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Fetch argument `index`, reporting a missing argument as an arity mismatch
pub fn arg<'a>(member: &str, args: &'a [Value], index: usize) -> Result<&'a Value, InvokeError> {
    args.get(index).ok_or_else(|| InvokeError::ArgumentMismatch {
        member: member.to_string(),
        expected: index + 1,
        found: args.len(),
    })
}
