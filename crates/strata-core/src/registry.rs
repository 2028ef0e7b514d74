//! Type registry for contract lookup and assignability
//!
//! The registry is the reflection-equivalent facility the composition engine
//! queries: it knows which keys are contracts, what members they carry
//! (including inherited ones), and which types declare which supertypes.

use crate::contract::{Contract, MemberSig};
use crate::errors::RegistryError;
use crate::types::TypeKey;
use indexmap::IndexSet;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Registry of contracts and declared supertypes
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    /// Registered contracts by key
    contracts: HashMap<TypeKey, Arc<Contract>>,
    /// Declared direct supertypes by type
    supertypes: HashMap<TypeKey, IndexSet<TypeKey>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract; its parents become its declared supertypes
    ///
    /// # Errors
    ///
    /// Returns an error if a contract with the same key is already registered or
    /// the key names a primitive type.
    pub fn register_contract(&mut self, contract: Contract) -> Result<Arc<Contract>, RegistryError> {
        let key = contract.key().clone();
        if key.is_primitive() {
            return Err(RegistryError::PrimitiveRedeclared { key });
        }
        if self.contracts.contains_key(&key) {
            return Err(RegistryError::DuplicateContract { key });
        }

        self.declare_type(key.clone(), contract.parents().iter().cloned())?;
        let contract = Arc::new(contract);
        self.contracts.insert(key.clone(), Arc::clone(&contract));
        tracing::debug!(contract = %key, members = contract.len(), "registered contract");
        Ok(contract)
    }

    /// Declare that `key` is assignable to each of `supertypes`
    ///
    /// Declarations accumulate; redeclaring a type adds supertypes.
    pub fn declare_type(
        &mut self,
        key: impl Into<TypeKey>,
        supertypes: impl IntoIterator<Item = impl Into<TypeKey>>,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if key.is_primitive() {
            return Err(RegistryError::PrimitiveRedeclared { key });
        }
        let entry = self.supertypes.entry(key.clone()).or_default();
        for parent in supertypes {
            let parent = parent.into();
            if parent != key {
                entry.insert(parent);
            }
        }
        Ok(())
    }

    /// Look up a registered contract
    pub fn contract(&self, key: &TypeKey) -> Option<Arc<Contract>> {
        self.contracts.get(key).cloned()
    }

    /// Look up a registered contract, failing if absent
    pub fn require_contract(&self, key: &TypeKey) -> Result<Arc<Contract>, RegistryError> {
        self.contract(key)
            .ok_or_else(|| RegistryError::UnknownContract { key: key.clone() })
    }

    pub fn is_contract(&self, key: &TypeKey) -> bool {
        self.contracts.contains_key(key)
    }

    /// Whether `key` has been declared (as a contract or any other type)
    pub fn is_declared(&self, key: &TypeKey) -> bool {
        self.supertypes.contains_key(key)
    }

    /// Whether a value of type `source` may be bound where `target` is expected
    ///
    /// True when the keys are equal, when `target` is the top type, or when
    /// `target` is reachable from `source` through declared supertypes.
    pub fn is_assignable(&self, target: &TypeKey, source: &TypeKey) -> bool {
        if target == source || target.is_any() {
            return true;
        }
        self.ancestors(source).contains(target)
    }

    /// All transitive supertypes of `key`, nearest first
    pub fn ancestors(&self, key: &TypeKey) -> IndexSet<TypeKey> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::from([key.clone()]);
        while let Some(current) = queue.pop_front() {
            if let Some(parents) = self.supertypes.get(&current) {
                for parent in parents {
                    if parent != key && seen.insert(parent.clone()) {
                        queue.push_back(parent.clone());
                    }
                }
            }
        }
        seen
    }

    /// Every member of a contract, including inherited members
    ///
    /// Members declared closer to `key` shadow inherited members with the same
    /// name. Unregistered keys have no members.
    pub fn all_members(&self, key: &TypeKey) -> Vec<MemberSig> {
        let mut members: Vec<MemberSig> = Vec::new();
        let mut names = IndexSet::new();
        let lineage = std::iter::once(key.clone()).chain(self.ancestors(key));
        for contract in lineage.filter_map(|k| self.contract(&k)) {
            for sig in contract.members() {
                if names.insert(sig.name.clone()) {
                    members.push(sig.clone());
                }
            }
        }
        members
    }

    /// Registered contract keys, sorted for stable output
    pub fn contract_keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.contracts.keys().cloned().collect();
        keys.sort();
        keys
    }
}
