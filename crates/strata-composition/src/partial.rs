//! Partial layer types
//!
//! A [`PartialType`] is the explicit metadata the engine introspects in place of
//! runtime reflection: the contracts the layer claims to implement, its
//! constructors, its fields (optionally marked for injection), the members it
//! implements, and the members it declares but leaves abstract.
//!
//! # Example
//!
//! ```ignore
//! let doubling = PartialType::builder("DoublingAdd")
//!     .implements("Sequence")
//!     .constructor(ConstructorSpec::storing([("inner", "Sequence")]))
//!     .method(MemberSig::new("add", ["int"], "unit"), |call, args| {
//!         let x = arg("add", args, 0)?.expect_int("add")?;
//!         call.inner("inner")?.invoke("add", &[Value::from(x * 2)])
//!     })
//!     .build();
//! ```

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use strata_core::{InvokeError, MemberSig, Object, ObjectRef, TypeKey, Value};

/// Boxed error returned by layer constructors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Constructor factory: receives arguments in declared parameter order
pub type ConstructorFn = Arc<dyn Fn(&[Value]) -> Result<LayerState, BoxError> + Send + Sync>;

/// Implementation of a member on a partial layer
pub type MethodBody =
    Arc<dyn Fn(&LayerCall<'_>, &[Value]) -> Result<Value, InvokeError> + Send + Sync>;

/// Per-instance state of a partial layer: named slots holding values
#[derive(Default)]
pub struct LayerState {
    slots: RwLock<IndexMap<String, Value>>,
}

impl LayerState {
    /// Empty state with no slots
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style slot initialisation
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.slots.write().insert(name.into(), value.into());
        self
    }

    /// Copy of the value in slot `name`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slots.read().get(name).cloned()
    }

    /// Store `value` in slot `name`, replacing any previous value
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots.write().insert(name.into(), value.into());
    }

    /// Whether slot `name` has been filled
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Object held in `slot`, read on behalf of `member`
    ///
    /// An empty slot is a [`InvokeError::MissingSlot`]; a slot holding a
    /// non-object value is a type mismatch attributed to `member`.
    pub fn object(&self, member: &str, slot: &str) -> Result<ObjectRef, InvokeError> {
        match self.slots.read().get(slot) {
            Some(value) => value.expect_object(member),
            None => Err(InvokeError::missing_slot(member, slot)),
        }
    }

    /// Apply `f` to the slot under the write lock and store its result
    pub fn update(&self, name: &str, f: impl FnOnce(&Value) -> Value) -> Value {
        let mut slots = self.slots.write();
        let current = slots.get(name).cloned().unwrap_or_default();
        let next = f(&current);
        slots.insert(name.to_string(), next.clone());
        next
    }

    /// Slot names in insertion order
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }
}

impl fmt::Debug for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slots.read().iter()).finish()
    }
}

/// A constructor: parameter types plus a fallible factory
#[derive(Clone)]
pub struct ConstructorSpec {
    params: Vec<TypeKey>,
    factory: ConstructorFn,
}

impl ConstructorSpec {
    /// Create a constructor from parameter types and a factory
    pub fn new(
        params: impl IntoIterator<Item = impl Into<TypeKey>>,
        factory: impl Fn(&[Value]) -> Result<LayerState, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            factory: Arc::new(factory),
        }
    }

    /// A constructor that stores each argument in the slot of the same position
    pub fn storing(
        slots: impl IntoIterator<Item = (impl Into<String>, impl Into<TypeKey>)>,
    ) -> Self {
        let (names, params): (Vec<String>, Vec<TypeKey>) = slots
            .into_iter()
            .map(|(name, ty)| (name.into(), ty.into()))
            .unzip();
        Self {
            params,
            factory: Arc::new(move |args: &[Value]| {
                Ok(names
                    .iter()
                    .zip(args)
                    .fold(LayerState::new(), |state, (name, value)| {
                        state.with(name.clone(), value.clone())
                    }))
            }),
        }
    }

    /// The no-argument constructor
    pub fn empty() -> Self {
        Self::new(Vec::<TypeKey>::new(), |_| Ok(LayerState::new()))
    }

    /// Parameter types in declaration order
    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    /// Number of parameters, delegate included
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Run the factory
    pub fn construct(&self, args: &[Value]) -> Result<LayerState, BoxError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for ConstructorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorSpec")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A field that may receive the delegate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    name: String,
    ty: TypeKey,
    marked: bool,
}

impl FieldSpec {
    /// Unmarked field `name` of type `ty`
    pub fn new(name: impl Into<String>, ty: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            marked: false,
        }
    }

    /// Mark the field as the explicit injection point
    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    /// Name of the slot the delegate is assigned to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type; the delegate must be assignable to it
    pub fn ty(&self) -> &TypeKey {
        &self.ty
    }

    /// Whether the field is the explicit injection point
    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// An implemented member
#[derive(Clone)]
pub struct MethodSpec {
    sig: MemberSig,
    body: MethodBody,
}

impl MethodSpec {
    /// Signature the member was implemented with
    pub fn sig(&self) -> &MemberSig {
        &self.sig
    }

    /// Closure run on every call to the member
    pub fn body(&self) -> &MethodBody {
        &self.body
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("sig", &self.sig)
            .finish_non_exhaustive()
    }
}

/// Introspectable description of a partial layer
#[derive(Debug, Clone)]
pub struct PartialType {
    key: TypeKey,
    implements: Vec<TypeKey>,
    constructors: Vec<ConstructorSpec>,
    fields: Vec<FieldSpec>,
    abstract_members: Vec<MemberSig>,
    methods: IndexMap<String, MethodSpec>,
}

impl PartialType {
    /// Start describing a partial type
    pub fn builder(key: impl Into<TypeKey>) -> PartialTypeBuilder {
        PartialTypeBuilder {
            inner: PartialType {
                key: key.into(),
                implements: Vec::new(),
                constructors: Vec::new(),
                fields: Vec::new(),
                abstract_members: Vec::new(),
                methods: IndexMap::new(),
            },
        }
    }

    /// Type key the synthesized layer reports
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Contracts (or other types) this layer is assignable to
    pub fn implements(&self) -> &[TypeKey] {
        &self.implements
    }

    /// Constructors in declaration order; never empty after `build`
    pub fn constructors(&self) -> &[ConstructorSpec] {
        &self.constructors
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Declared but unimplemented members
    pub fn abstract_members(&self) -> &[MemberSig] {
        &self.abstract_members
    }

    /// Implementation of member `name`, if the layer provides one
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    /// Implemented members in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.methods.values()
    }

    /// Whether the layer implements `name` itself
    pub fn implements_member(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

/// Builder for [`PartialType`]
pub struct PartialTypeBuilder {
    inner: PartialType,
}

impl PartialTypeBuilder {
    /// Declare a supertype of the layer
    pub fn implements(mut self, contract: impl Into<TypeKey>) -> Self {
        let contract = contract.into();
        if !self.inner.implements.contains(&contract) {
            self.inner.implements.push(contract);
        }
        self
    }

    /// Add a constructor; declaration order is resolution order
    pub fn constructor(mut self, constructor: ConstructorSpec) -> Self {
        self.inner.constructors.push(constructor);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.inner.fields.push(field);
        self
    }

    /// Declare a member without implementing it
    pub fn abstract_member(mut self, sig: MemberSig) -> Self {
        self.inner.abstract_members.push(sig);
        self
    }

    /// Implement a member
    pub fn method(
        mut self,
        sig: MemberSig,
        body: impl Fn(&LayerCall<'_>, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        self.inner
            .abstract_members
            .retain(|declared| declared.name != sig.name);
        self.inner.methods.insert(
            sig.name.clone(),
            MethodSpec {
                sig,
                body: Arc::new(body),
            },
        );
        self
    }

    /// Finish; a layer without constructors gets the no-argument constructor
    pub fn build(mut self) -> PartialType {
        if self.inner.constructors.is_empty() {
            self.inner.constructors.push(ConstructorSpec::empty());
        }
        self.inner
    }
}

/// Context handed to a member implementation
pub struct LayerCall<'a> {
    this: &'a dyn Object,
    state: &'a LayerState,
    layer: &'a TypeKey,
    member: &'a str,
}

impl<'a> LayerCall<'a> {
    pub(crate) fn new(
        this: &'a dyn Object,
        state: &'a LayerState,
        layer: &'a TypeKey,
        member: &'a str,
    ) -> Self {
        Self {
            this,
            state,
            layer,
            member,
        }
    }

    /// The full layer as seen from outside, including synthesized members
    pub fn this(&self) -> &'a dyn Object {
        self.this
    }

    /// State of the layer instance handling the call
    pub fn state(&self) -> &'a LayerState {
        self.state
    }

    /// Key of the partial type handling the call
    pub fn layer(&self) -> &'a TypeKey {
        self.layer
    }

    /// Name of the member being invoked
    pub fn member(&self) -> &'a str {
        self.member
    }

    /// Delegate stored in slot `slot` by constructor or field injection
    pub fn inner(&self, slot: &str) -> Result<ObjectRef, InvokeError> {
        self.state.object(self.member, slot)
    }

    /// Delegate served by the synthesized accessor `accessor`
    pub fn inner_via(&self, accessor: &str) -> Result<ObjectRef, InvokeError> {
        self.this.invoke(accessor, &[])?.expect_object(accessor)
    }
}
