//! Contracts and member signatures
//!
//! A [`Contract`] is the interface-like type a composite must satisfy: an ordered
//! set of named members, optionally extending other contracts. Contracts are plain
//! data and can be declared in code or loaded from JSON/TOML.

use crate::types::TypeKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Signature of a single member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberSig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeKey>,
    #[serde(default = "TypeKey::unit")]
    pub returns: TypeKey,
}

impl MemberSig {
    /// Create a member signature
    pub fn new(
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<TypeKey>>,
        returns: impl Into<TypeKey>,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            returns: returns.into(),
        }
    }

    /// A zero-parameter member returning `returns`
    pub fn accessor(name: impl Into<String>, returns: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: returns.into(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Interface-like type a composite must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    key: TypeKey,
    #[serde(default)]
    extends: Vec<TypeKey>,
    #[serde(default, with = "members_as_list")]
    members: IndexMap<String, MemberSig>,
}

impl Contract {
    /// Create an empty contract
    pub fn new(key: impl Into<TypeKey>) -> Self {
        Self {
            key: key.into(),
            extends: Vec::new(),
            members: IndexMap::new(),
        }
    }

    /// Declare a super-contract
    pub fn extends(mut self, parent: impl Into<TypeKey>) -> Self {
        let parent = parent.into();
        if !self.extends.contains(&parent) {
            self.extends.push(parent);
        }
        self
    }

    /// Add a member; a later member with the same name replaces the earlier one
    pub fn member(mut self, sig: MemberSig) -> Self {
        self.members.insert(sig.name.clone(), sig);
        self
    }

    /// Shorthand for [`Contract::member`] with an inline signature
    pub fn method(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<TypeKey>>,
        returns: impl Into<TypeKey>,
    ) -> Self {
        self.member(MemberSig::new(name, params, returns))
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn parents(&self) -> &[TypeKey] {
        &self.extends
    }

    /// Members declared directly on this contract, in declaration order
    pub fn members(&self) -> impl Iterator<Item = &MemberSig> {
        self.members.values()
    }

    pub fn get(&self, name: &str) -> Option<&MemberSig> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Members are written as a list of signatures rather than a name-keyed map
mod members_as_list {
    use super::MemberSig;
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        members: &IndexMap<String, MemberSig>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&MemberSig> = members.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, MemberSig>, D::Error> {
        let list = Vec::<MemberSig>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|sig| (sig.name.clone(), sig))
            .collect())
    }
}
