//! Mutable sequence base object and the contracts it satisfies

use parking_lot::RwLock;
use std::sync::Arc;
use strata_composition::ContractView;
use strata_core::{
    arg, check_arity, Contract, InvokeError, InvokeResult, MemberSig, Object, ObjectRef,
    RegistryError, TypeKey, TypeRegistry, Value,
};
use thiserror::Error;

/// Read-only collection contract
pub const COLLECTION: &str = "Collection";
/// Mutable sequence contract, extends [`COLLECTION`]
pub const SEQUENCE: &str = "Sequence";
/// Type of [`SequenceObject`]
pub const ARRAY_SEQUENCE: &str = "ArraySequence";

/// Failures raised by [`SequenceObject`] and the sample layers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("index {index} out of range for sequence of length {len}")]
    OutOfRange { index: i64, len: usize },

    #[error("integer overflow in '{member}'")]
    Overflow { member: String },
}

impl SequenceError {
    pub fn overflow(member: impl Into<String>) -> Self {
        Self::Overflow {
            member: member.into(),
        }
    }
}

pub fn collection_contract() -> Contract {
    Contract::new(COLLECTION)
        .member(MemberSig::accessor("size", "int"))
        .method("contains", ["any"], "bool")
        .member(MemberSig::accessor("items", "list"))
}

pub fn sequence_contract() -> Contract {
    Contract::new(SEQUENCE)
        .extends(COLLECTION)
        .method("add", ["any"], "unit")
        .method("get", ["int"], "any")
        .member(MemberSig::accessor("clear", "unit"))
}

/// Register both contracts and declare [`ARRAY_SEQUENCE`] as a sequence
pub fn register_sequence(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register_contract(collection_contract())?;
    registry.register_contract(sequence_contract())?;
    registry.declare_type(ARRAY_SEQUENCE, [SEQUENCE])
}

/// Fresh registry with the sequence contracts
pub fn sequence_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_sequence(&mut registry).expect("sequence contracts register cleanly");
    registry
}

/// Growable list of values
#[derive(Debug, Default)]
pub struct SequenceObject {
    items: RwLock<Vec<Value>>,
}

impl SequenceObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(Into::into).collect()),
        }
    }

    /// A new empty sequence behind a shared handle
    pub fn shared() -> ObjectRef {
        Arc::new(Self::new())
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.items.read().clone()
    }
}

impl Object for SequenceObject {
    fn type_key(&self) -> TypeKey {
        TypeKey::new(ARRAY_SEQUENCE)
    }

    fn responds_to(&self, member: &str) -> bool {
        matches!(
            member,
            "add" | "get" | "size" | "contains" | "clear" | "items"
        )
    }

    fn invoke(&self, member: &str, args: &[Value]) -> InvokeResult<Value> {
        match member {
            "add" => {
                check_arity(member, args, 1)?;
                self.items.write().push(args[0].clone());
                Ok(Value::Unit)
            }
            "get" => {
                check_arity(member, args, 1)?;
                let index = arg(member, args, 0)?.expect_int(member)?;
                let items = self.items.read();
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        InvokeError::raised(
                            member,
                            SequenceError::OutOfRange {
                                index,
                                len: items.len(),
                            },
                        )
                    })
            }
            "size" => {
                check_arity(member, args, 0)?;
                Ok(Value::from(self.items.read().len()))
            }
            "contains" => {
                check_arity(member, args, 1)?;
                Ok(Value::from(self.items.read().contains(&args[0])))
            }
            "clear" => {
                check_arity(member, args, 0)?;
                self.items.write().clear();
                Ok(Value::Unit)
            }
            "items" => {
                check_arity(member, args, 0)?;
                Ok(Value::List(self.snapshot()))
            }
            _ => Err(InvokeError::unknown_member(&self.type_key(), member)),
        }
    }
}

/// Typed view over any object satisfying [`SEQUENCE`]
#[derive(Clone, Debug)]
pub struct SequenceView {
    object: ObjectRef,
}

impl SequenceView {
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn add(&self, value: impl Into<Value>) -> InvokeResult<()> {
        self.object.invoke("add", &[value.into()]).map(|_| ())
    }

    pub fn get(&self, index: i64) -> InvokeResult<Value> {
        self.object.invoke("get", &[Value::from(index)])
    }

    pub fn size(&self) -> InvokeResult<i64> {
        self.object.invoke("size", &[])?.expect_int("size")
    }

    pub fn contains(&self, value: impl Into<Value>) -> InvokeResult<bool> {
        self.object
            .invoke("contains", &[value.into()])?
            .expect_bool("contains")
    }

    pub fn clear(&self) -> InvokeResult<()> {
        self.object.invoke("clear", &[]).map(|_| ())
    }

    pub fn items(&self) -> InvokeResult<Vec<Value>> {
        Ok(self.object.invoke("items", &[])?.expect_list("items")?.to_vec())
    }
}

impl ContractView for SequenceView {
    fn contract() -> TypeKey {
        TypeKey::new(SEQUENCE)
    }

    fn from_object(object: ObjectRef) -> Self {
        Self { object }
    }
}
