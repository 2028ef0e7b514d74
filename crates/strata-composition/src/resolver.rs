//! Injection point resolution
//!
//! Finds the unique site through which a partial layer receives its delegate.
//! Categories are searched in order and the first category with any candidate
//! decides the outcome:
//!
//! 1. **Constructor**: a constructor taking the extra arguments plus one
//!    parameter assignable from the delegate type
//! 2. **Field**: a field assignable from the delegate type; marked fields win
//!    over unmarked ones
//! 3. **Accessor**: an abstract zero-parameter member whose return type is
//!    assignable from the delegate type
//!
//! More than one candidate in the deciding category is an error, as is finding
//! none at all.

use crate::error::{ComposeError, Result};
use crate::partial::{FieldSpec, PartialType};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use strata_core::{MemberSig, TypeKey, TypeRegistry};
use tracing::trace;

/// Category of an injection site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InjectionCategory {
    /// A constructor parameter
    Constructor,
    /// A field assigned after construction
    Field,
    /// An abstract zero-parameter member synthesized to return the delegate
    Accessor,
}

impl fmt::Display for InjectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Constructor => "constructor",
            Self::Field => "field",
            Self::Accessor => "accessor",
        })
    }
}

/// Resolved strategy for supplying a layer's delegate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum InjectionBinding {
    /// Pass the delegate to constructor `constructor` at parameter `delegate_param`
    Constructor {
        /// Index into the partial's constructors
        constructor: usize,
        /// Parameter position that receives the delegate
        delegate_param: usize,
    },
    /// Build with `constructor`, then assign the delegate to `field`
    Field { constructor: usize, field: String },
    /// Build with `constructor`; the synthesized `member` returns the delegate
    Accessor { constructor: usize, member: String },
}

impl InjectionBinding {
    /// Category of the binding site
    pub fn category(&self) -> InjectionCategory {
        match self {
            Self::Constructor { .. } => InjectionCategory::Constructor,
            Self::Field { .. } => InjectionCategory::Field,
            Self::Accessor { .. } => InjectionCategory::Accessor,
        }
    }

    /// Index of the constructor used to build the layer
    pub fn constructor(&self) -> usize {
        match self {
            Self::Constructor { constructor, .. }
            | Self::Field { constructor, .. }
            | Self::Accessor { constructor, .. } => *constructor,
        }
    }

    /// Name of the synthesized accessor, if any
    pub fn accessor(&self) -> Option<&str> {
        match self {
            Self::Accessor { member, .. } => Some(member),
            _ => None,
        }
    }
}

impl fmt::Display for InjectionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor {
                constructor,
                delegate_param,
            } => write!(f, "constructor #{constructor} param {delegate_param}"),
            Self::Field { field, .. } => write!(f, "field '{field}'"),
            Self::Accessor { member, .. } => write!(f, "accessor '{member}'"),
        }
    }
}

/// A type together with its supertypes in the registry used for resolution
type Lineage = (TypeKey, Vec<TypeKey>);

/// Every input resolution reads
///
/// Resolution only asks whether a delegate or extra type is assignable to a
/// declared type, which is decided by the source type's lineage. Two lookups
/// with equal keys therefore resolve identically, whichever registry or chain
/// contract they come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    layer: TypeKey,
    constructors: Vec<Vec<TypeKey>>,
    fields: Vec<FieldSpec>,
    abstract_members: Vec<MemberSig>,
    delegate: Lineage,
    extras: Vec<Lineage>,
}

impl ResolutionKey {
    fn new(
        registry: &TypeRegistry,
        partial: &PartialType,
        delegate: &TypeKey,
        extras: &[TypeKey],
    ) -> Self {
        let lineage = |key: &TypeKey| -> Lineage {
            (key.clone(), registry.ancestors(key).into_iter().collect())
        };
        Self {
            layer: partial.key().clone(),
            constructors: partial
                .constructors()
                .iter()
                .map(|ctor| ctor.params().to_vec())
                .collect(),
            fields: partial.fields().to_vec(),
            abstract_members: partial.abstract_members().to_vec(),
            delegate: lineage(delegate),
            extras: extras.iter().map(lineage).collect(),
        }
    }
}

/// Injection point resolver with an optional memo of past resolutions
///
/// Cached entries are keyed by the partial's injection sites and by the
/// lineage of the delegate and extra types, so one resolver can be shared by
/// chains over different registries and contracts.
#[derive(Debug, Default)]
pub struct InjectionResolver {
    cache: Option<Mutex<HashMap<ResolutionKey, InjectionBinding>>>,
}

impl InjectionResolver {
    /// Create a resolver that recomputes every resolution
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Create a resolver that memoizes successful resolutions
    pub fn cached() -> Self {
        Self {
            cache: Some(Mutex::new(HashMap::new())),
        }
    }

    /// Create a resolver according to the `resolution_cache` setting
    pub fn with_cache(enabled: bool) -> Self {
        if enabled {
            Self::cached()
        } else {
            Self::new()
        }
    }

    /// Number of memoized resolutions
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().len())
    }

    /// Resolve the binding site for `partial` wrapping a delegate of type `delegate`
    ///
    /// `extras` are the declared types of the extra constructor arguments.
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        partial: &PartialType,
        delegate: &TypeKey,
        extras: &[TypeKey],
    ) -> Result<InjectionBinding> {
        let Some(cache) = &self.cache else {
            return resolve_binding(registry, partial, delegate, extras);
        };

        let key = ResolutionKey::new(registry, partial, delegate, extras);
        if let Some(binding) = cache.lock().get(&key) {
            trace!(layer = %partial.key(), %delegate, %binding, "injection resolution cache hit");
            return Ok(binding.clone());
        }

        let binding = resolve_binding(registry, partial, delegate, extras)?;
        cache.lock().insert(key, binding.clone());
        Ok(binding)
    }
}

/// Resolve without memoization
pub fn resolve_binding(
    registry: &TypeRegistry,
    partial: &PartialType,
    delegate: &TypeKey,
    extras: &[TypeKey],
) -> Result<InjectionBinding> {
    let layer = partial.key();

    // (a) constructor parameters
    let mut ctor_candidates = Vec::new();
    for (index, ctor) in partial.constructors().iter().enumerate() {
        let params = ctor.params();
        if params.len() != extras.len() + 1 {
            continue;
        }
        for position in 0..params.len() {
            if !registry.is_assignable(&params[position], delegate) {
                continue;
            }
            let rest = params
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != position)
                .map(|(_, param)| param);
            if rest
                .zip(extras)
                .all(|(param, extra)| registry.is_assignable(param, extra))
            {
                ctor_candidates.push((index, position));
            }
        }
    }
    match ctor_candidates.as_slice() {
        [(constructor, delegate_param)] => {
            return Ok(InjectionBinding::Constructor {
                constructor: *constructor,
                delegate_param: *delegate_param,
            });
        }
        [] => {}
        many => {
            return Err(ComposeError::AmbiguousInjectionPoint {
                layer: layer.clone(),
                delegate: delegate.clone(),
                category: InjectionCategory::Constructor,
                candidates: many
                    .iter()
                    .map(|(c, p)| format!("constructor #{c} param {p}"))
                    .collect(),
            });
        }
    }

    let site = match field_site(registry, partial, delegate)? {
        Some(field) => Some((InjectionCategory::Field, field)),
        None => accessor_site(registry, partial, delegate)?
            .map(|member| (InjectionCategory::Accessor, member)),
    };

    let Some((category, name)) = site else {
        // A constructor would take the delegate but the extras do not line up
        let delegate_fits = partial.constructors().iter().any(|ctor| {
            ctor.params()
                .iter()
                .any(|param| registry.is_assignable(param, delegate))
        });
        if !extras.is_empty() && delegate_fits {
            return Err(ComposeError::arity_mismatch(layer, extras));
        }
        return Err(ComposeError::NoInjectionPoint {
            layer: layer.clone(),
            delegate: delegate.clone(),
        });
    };

    // Field and accessor injection build the layer without the delegate
    let constructor = partial
        .constructors()
        .iter()
        .position(|ctor| {
            ctor.arity() == extras.len()
                && ctor
                    .params()
                    .iter()
                    .zip(extras)
                    .all(|(param, extra)| registry.is_assignable(param, extra))
        })
        .ok_or_else(|| ComposeError::arity_mismatch(layer, extras))?;

    Ok(match category {
        InjectionCategory::Field => InjectionBinding::Field {
            constructor,
            field: name,
        },
        _ => InjectionBinding::Accessor {
            constructor,
            member: name,
        },
    })
}

fn field_site(
    registry: &TypeRegistry,
    partial: &PartialType,
    delegate: &TypeKey,
) -> Result<Option<String>> {
    let qualifying: Vec<_> = partial
        .fields()
        .iter()
        .filter(|field| registry.is_assignable(field.ty(), delegate))
        .collect();
    let marked: Vec<_> = qualifying
        .iter()
        .copied()
        .filter(|field| field.is_marked())
        .collect();
    let pool = if marked.is_empty() { qualifying } else { marked };

    unique(
        partial,
        delegate,
        InjectionCategory::Field,
        pool.into_iter().map(|field| field.name().to_string()).collect(),
    )
}

fn accessor_site(
    registry: &TypeRegistry,
    partial: &PartialType,
    delegate: &TypeKey,
) -> Result<Option<String>> {
    let names = partial
        .abstract_members()
        .iter()
        .filter(|sig| sig.params.is_empty() && registry.is_assignable(&sig.returns, delegate))
        .map(|sig| sig.name.clone())
        .collect();
    unique(partial, delegate, InjectionCategory::Accessor, names)
}

fn unique(
    partial: &PartialType,
    delegate: &TypeKey,
    category: InjectionCategory,
    mut candidates: Vec<String>,
) -> Result<Option<String>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => Err(ComposeError::AmbiguousInjectionPoint {
            layer: partial.key().clone(),
            delegate: delegate.clone(),
            category,
            candidates,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partial::{ConstructorSpec, FieldSpec};
    use assert_matches::assert_matches;
    use strata_core::{Contract, MemberSig, Value};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register_contract(Contract::new("Sequence").method("add", ["any"], "unit"))
            .unwrap();
        registry.declare_type("ArraySequence", ["Sequence"]).unwrap();
        registry
    }

    fn delegate() -> TypeKey {
        TypeKey::new("ArraySequence")
    }

    #[test]
    fn test_constructor_injection_with_extras() {
        let partial = PartialType::builder("Offset")
            .constructor(ConstructorSpec::storing([("offset", "int"), ("inner", "Sequence")]))
            .build();
        let binding =
            resolve_binding(&registry(), &partial, &delegate(), &[TypeKey::int()]).unwrap();
        assert_eq!(
            binding,
            InjectionBinding::Constructor {
                constructor: 0,
                delegate_param: 1
            }
        );
    }

    #[test]
    fn test_ambiguous_constructors_rejected() {
        let partial = PartialType::builder("Twice")
            .constructor(ConstructorSpec::storing([("inner", "Sequence")]))
            .constructor(ConstructorSpec::storing([("inner", "any")]))
            .build();
        let err = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap_err();
        assert_matches!(
            err,
            ComposeError::AmbiguousInjectionPoint {
                category: InjectionCategory::Constructor,
                ..
            }
        );
    }

    #[test]
    fn test_two_delegate_positions_in_one_constructor_are_ambiguous() {
        let partial = PartialType::builder("Pair")
            .constructor(ConstructorSpec::storing([("a", "any"), ("b", "any")]))
            .build();
        let err =
            resolve_binding(&registry(), &partial, &delegate(), &[TypeKey::int()]).unwrap_err();
        assert_matches!(err, ComposeError::AmbiguousInjectionPoint { .. });
    }

    #[test]
    fn test_marked_field_takes_precedence() {
        let partial = PartialType::builder("Fields")
            .field(FieldSpec::new("backup", "Sequence"))
            .field(FieldSpec::new("inner", "Sequence").marked())
            .build();
        let binding = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap();
        assert_eq!(
            binding,
            InjectionBinding::Field {
                constructor: 0,
                field: "inner".to_string()
            }
        );
    }

    #[test]
    fn test_unmarked_fields_ambiguous() {
        let partial = PartialType::builder("Fields")
            .field(FieldSpec::new("a", "Sequence"))
            .field(FieldSpec::new("b", "ArraySequence"))
            .build();
        let err = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap_err();
        assert_matches!(
            err,
            ComposeError::AmbiguousInjectionPoint {
                category: InjectionCategory::Field,
                ..
            }
        );
    }

    #[test]
    fn test_accessor_injection() {
        let partial = PartialType::builder("Accessor")
            .abstract_member(MemberSig::accessor("inner", "Sequence"))
            .abstract_member(MemberSig::new("lookup", ["int"], "Sequence"))
            .build();
        let binding = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap();
        assert_eq!(binding.category(), InjectionCategory::Accessor);
        assert_eq!(binding.accessor(), Some("inner"));
    }

    #[test]
    fn test_no_injection_point() {
        let partial = PartialType::builder("Lonely")
            .field(FieldSpec::new("count", "int"))
            .build();
        let err = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap_err();
        assert_matches!(err, ComposeError::NoInjectionPoint { .. });
    }

    #[test]
    fn test_misaligned_extras_report_arity_mismatch() {
        let partial = PartialType::builder("Offset")
            .constructor(ConstructorSpec::storing([("inner", "Sequence"), ("offset", "int")]))
            .build();
        let err =
            resolve_binding(&registry(), &partial, &delegate(), &[TypeKey::string()]).unwrap_err();
        assert_matches!(err, ComposeError::ConstructorArityMismatch { .. });
    }

    #[test]
    fn test_field_injection_needs_extras_aligned_constructor() {
        let partial = PartialType::builder("FieldOnly")
            .constructor(ConstructorSpec::new(["int"], |args: &[Value]| {
                Ok(crate::partial::LayerState::new().with("offset", args[0].clone()))
            }))
            .field(FieldSpec::new("inner", "Sequence"))
            .build();
        let err = resolve_binding(&registry(), &partial, &delegate(), &[]).unwrap_err();
        assert_matches!(err, ComposeError::ConstructorArityMismatch { .. });

        let binding =
            resolve_binding(&registry(), &partial, &delegate(), &[TypeKey::int()]).unwrap();
        assert_eq!(binding.category(), InjectionCategory::Field);
    }

    #[test]
    fn test_cached_resolution_is_identical() {
        let partial = PartialType::builder("Cached")
            .field(FieldSpec::new("inner", "Sequence"))
            .build();
        let resolver = InjectionResolver::cached();
        let registry = registry();
        let first = resolver
            .resolve(&registry, &partial, &delegate(), &[])
            .unwrap();
        let second = resolver
            .resolve(&registry, &partial, &delegate(), &[])
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.cached_len(), 1);
        assert_eq!(
            first,
            resolve_binding(&registry, &partial, &delegate(), &[]).unwrap()
        );
    }

    #[test]
    fn test_cache_tells_apart_partials_sharing_a_key() {
        let registry = registry();
        let resolver = InjectionResolver::cached();
        let by_constructor = PartialType::builder("Layer")
            .constructor(ConstructorSpec::storing([("inner", "Sequence")]))
            .build();
        let by_field = PartialType::builder("Layer")
            .field(FieldSpec::new("inner", "Sequence"))
            .build();

        let first = resolver
            .resolve(&registry, &by_constructor, &delegate(), &[])
            .unwrap();
        let second = resolver
            .resolve(&registry, &by_field, &delegate(), &[])
            .unwrap();
        assert_eq!(first.category(), InjectionCategory::Constructor);
        assert_eq!(
            second,
            InjectionBinding::Field {
                constructor: 0,
                field: "inner".to_string()
            }
        );
        assert_eq!(resolver.cached_len(), 2);
    }

    #[test]
    fn test_cache_follows_delegate_lineage_across_registries() {
        let partial = PartialType::builder("NeedsSequence")
            .constructor(ConstructorSpec::storing([("inner", "Sequence")]))
            .build();
        let resolver = InjectionResolver::cached();
        resolver
            .resolve(&registry(), &partial, &delegate(), &[])
            .unwrap();

        // Same delegate name, but not a sequence here
        let mut unrelated = TypeRegistry::new();
        unrelated
            .register_contract(Contract::new("Sequence").method("add", ["any"], "unit"))
            .unwrap();
        unrelated
            .register_contract(Contract::new("Other").member(MemberSig::accessor("peek", "any")))
            .unwrap();
        unrelated.declare_type("ArraySequence", ["Other"]).unwrap();
        let err = resolver
            .resolve(&unrelated, &partial, &delegate(), &[])
            .unwrap_err();
        assert_matches!(err, ComposeError::NoInjectionPoint { .. });
    }

    #[test]
    fn test_uncached_resolver_keeps_nothing() {
        let partial = PartialType::builder("Uncached")
            .field(FieldSpec::new("inner", "Sequence"))
            .build();
        let resolver = InjectionResolver::new();
        resolver
            .resolve(&registry(), &partial, &delegate(), &[])
            .unwrap();
        assert_eq!(resolver.cached_len(), 0);
    }
}
