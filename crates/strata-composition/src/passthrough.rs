//! Pass-through synthesis
//!
//! [`PassThrough`] is the one generic adapter placed around every instantiated
//! partial layer. Its dispatch table is built once at synthesis time: members the
//! layer implements run the layer's body, the injected accessor (if any) returns
//! the delegate, and everything else is forwarded to the delegate with arguments
//! and results untouched.

use crate::error::{ComposeError, Result};
use crate::partial::{LayerCall, LayerState, PartialType};
use crate::resolver::InjectionBinding;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use strata_core::{check_arity, InvokeError, Object, ObjectRef, TypeKey, TypeRegistry, Value};
use tracing::trace;

/// How a member call on a pass-through is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DispatchKind {
    /// The layer's own implementation
    Override,
    /// The synthesized accessor returning the delegate
    Accessor,
    /// Forwarded to the delegate unchanged
    Forward,
}

/// Options for [`synthesize`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisOptions {
    /// Fail when a contract member can be served neither by the layer nor by the delegate
    pub strict_members: bool,
    /// Emit a trace event per forwarded call
    pub trace_calls: bool,
}

/// A partial layer instance completed into a full object
pub struct PassThrough {
    layer: Arc<PartialType>,
    state: LayerState,
    delegate: ObjectRef,
    table: IndexMap<String, DispatchKind>,
    trace_calls: bool,
}

/// Wrap an instantiated layer so that it satisfies every member of `contracts`
///
/// `contracts` are checked in addition to the contracts the layer declares it
/// implements.
pub fn synthesize(
    registry: &TypeRegistry,
    layer: Arc<PartialType>,
    binding: &InjectionBinding,
    state: LayerState,
    delegate: ObjectRef,
    contracts: &[TypeKey],
    options: SynthesisOptions,
) -> Result<PassThrough> {
    let mut table = IndexMap::new();
    for method in layer.methods() {
        table.insert(method.sig().name.clone(), DispatchKind::Override);
    }
    if let Some(accessor) = binding.accessor() {
        table
            .entry(accessor.to_string())
            .or_insert(DispatchKind::Accessor);
    }

    let required = layer
        .implements()
        .iter()
        .chain(contracts)
        .filter(|key| registry.is_contract(key));
    for contract in required {
        for sig in registry.all_members(contract) {
            if table.contains_key(&sig.name) {
                continue;
            }
            if options.strict_members && !delegate.responds_to(&sig.name) {
                return Err(ComposeError::UnresolvedMember {
                    layer: layer.key().clone(),
                    contract: contract.clone(),
                    member: sig.name,
                });
            }
            table.insert(sig.name, DispatchKind::Forward);
        }
    }

    // Abstract members left over are served by the delegate
    for sig in layer.abstract_members() {
        table
            .entry(sig.name.clone())
            .or_insert(DispatchKind::Forward);
    }

    Ok(PassThrough {
        layer,
        state,
        delegate,
        table,
        trace_calls: options.trace_calls,
    })
}

impl PassThrough {
    pub fn layer(&self) -> &PartialType {
        &self.layer
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    pub fn delegate(&self) -> &ObjectRef {
        &self.delegate
    }

    /// How a call to `member` is served; members outside the table are forwarded
    pub fn dispatch_kind(&self, member: &str) -> DispatchKind {
        self.table
            .get(member)
            .copied()
            .unwrap_or(DispatchKind::Forward)
    }

    /// The dispatch table in synthesis order
    pub fn dispatch_table(&self) -> impl Iterator<Item = (&str, DispatchKind)> {
        self.table.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

impl Object for PassThrough {
    fn type_key(&self) -> TypeKey {
        self.layer.key().clone()
    }

    fn responds_to(&self, member: &str) -> bool {
        match self.dispatch_kind(member) {
            DispatchKind::Override | DispatchKind::Accessor => true,
            DispatchKind::Forward => self.delegate.responds_to(member),
        }
    }

    fn invoke(&self, member: &str, args: &[Value]) -> std::result::Result<Value, InvokeError> {
        match self.dispatch_kind(member) {
            DispatchKind::Override => {
                let Some(method) = self.layer.method(member) else {
                    return Err(InvokeError::unknown_member(self.layer.key(), member));
                };
                let call = LayerCall::new(self, &self.state, self.layer.key(), member);
                (method.body())(&call, args)
            }
            DispatchKind::Accessor => {
                check_arity(member, args, 0)?;
                Ok(Value::Object(ObjectRef::clone(&self.delegate)))
            }
            DispatchKind::Forward => {
                if self.trace_calls {
                    trace!(
                        layer = %self.layer.key(),
                        member,
                        args = args.len(),
                        "forwarding call to delegate"
                    );
                }
                self.delegate.invoke(member, args)
            }
        }
    }
}

impl fmt::Debug for PassThrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThrough")
            .field("layer", self.layer.key())
            .field("delegate", &self.delegate.type_key())
            .field("table", &self.table)
            .field("state", &self.state)
            .finish()
    }
}
