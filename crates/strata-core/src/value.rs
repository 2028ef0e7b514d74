//! Dynamic values passed to and returned from member calls

use crate::errors::InvokeError;
use crate::object::ObjectRef;
use crate::types::TypeKey;
use std::fmt;
use std::sync::Arc;

/// A dynamically typed argument or result
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Reference to another composable object (typically a delegate)
    Object(ObjectRef),
}

impl Value {
    /// Runtime type of the value
    pub fn type_key(&self) -> TypeKey {
        match self {
            Self::Unit => TypeKey::unit(),
            Self::Bool(_) => TypeKey::bool(),
            Self::Int(_) => TypeKey::int(),
            Self::Float(_) => TypeKey::float(),
            Self::Str(_) => TypeKey::string(),
            Self::List(_) => TypeKey::list(),
            Self::Object(obj) => obj.type_key(),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Integer payload, or a type mismatch attributed to `member`
    pub fn expect_int(&self, member: &str) -> Result<i64, InvokeError> {
        self.as_int()
            .ok_or_else(|| InvokeError::type_mismatch(member, TypeKey::int(), self.type_key()))
    }

    /// Boolean payload, or a type mismatch attributed to `member`
    pub fn expect_bool(&self, member: &str) -> Result<bool, InvokeError> {
        self.as_bool()
            .ok_or_else(|| InvokeError::type_mismatch(member, TypeKey::bool(), self.type_key()))
    }

    /// String payload, or a type mismatch attributed to `member`
    pub fn expect_str(&self, member: &str) -> Result<&str, InvokeError> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(InvokeError::type_mismatch(
                member,
                TypeKey::string(),
                other.type_key(),
            )),
        }
    }

    /// List payload, or a type mismatch attributed to `member`
    pub fn expect_list(&self, member: &str) -> Result<&[Value], InvokeError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(InvokeError::type_mismatch(
                member,
                TypeKey::list(),
                other.type_key(),
            )),
        }
    }

    /// Object payload, or a type mismatch attributed to `member`
    pub fn expect_object(&self, member: &str) -> Result<ObjectRef, InvokeError> {
        match self {
            Self::Object(obj) => Ok(Arc::clone(obj)),
            other => Err(InvokeError::type_mismatch(
                member,
                TypeKey::any(),
                other.type_key(),
            )),
        }
    }

    /// Convert a data value to JSON. Object references have no JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Unit => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Self::Object(_) => return None,
        })
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = InvokeError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match json {
            serde_json::Value::Null => Self::Unit,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            serde_json::Value::Object(_) => {
                return Err(InvokeError::type_mismatch(
                    "from_json",
                    TypeKey::any(),
                    TypeKey::new("json-object"),
                ))
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Objects have identity, not structure
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Object(obj) => write!(f, "Object(<{}>)", obj.type_key()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(obj) => write!(f, "<{}>", obj.type_key()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}
