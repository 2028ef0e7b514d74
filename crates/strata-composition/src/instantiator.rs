//! Layer instantiation
//!
//! Builds the state of one partial layer from its resolved binding, the
//! caller's extra constructor arguments, and the delegate.

use crate::error::{ComposeError, Result};
use crate::partial::{LayerState, PartialType};
use crate::resolver::InjectionBinding;
use strata_core::{ObjectRef, Value};
use tracing::trace;

/// Construct the layer state for `partial`
///
/// For constructor injection the delegate is placed at the bound parameter and
/// the extras fill the remaining parameters in order. For field injection the
/// delegate is assigned after construction. Accessor injection leaves the state
/// untouched; the synthesized accessor serves the delegate.
pub fn instantiate(
    partial: &PartialType,
    binding: &InjectionBinding,
    extras: &[Value],
    delegate: &ObjectRef,
) -> Result<LayerState> {
    let layer = partial.key();
    let constructor = partial
        .constructors()
        .get(binding.constructor())
        .ok_or_else(|| ComposeError::arity_mismatch(layer, &extra_types(extras)))?;

    let args = match binding {
        InjectionBinding::Constructor { delegate_param, .. } => {
            let mut args = extras.to_vec();
            if *delegate_param > args.len() {
                return Err(ComposeError::arity_mismatch(layer, &extra_types(extras)));
            }
            args.insert(*delegate_param, Value::Object(ObjectRef::clone(delegate)));
            args
        }
        InjectionBinding::Field { .. } | InjectionBinding::Accessor { .. } => extras.to_vec(),
    };
    if args.len() != constructor.arity() {
        return Err(ComposeError::arity_mismatch(layer, &extra_types(extras)));
    }

    let state = constructor
        .construct(&args)
        .map_err(|source| ComposeError::instantiation_failed(layer, source))?;

    if let InjectionBinding::Field { field, .. } = binding {
        state.set(field.clone(), Value::Object(ObjectRef::clone(delegate)));
    }

    trace!(layer = %layer, %binding, slots = ?state.slot_names(), "instantiated layer");
    Ok(state)
}

fn extra_types(extras: &[Value]) -> Vec<strata_core::TypeKey> {
    extras.iter().map(Value::type_key).collect()
}
