//! Chain assembly
//!
//! Walks the declared layers from innermost to outermost, turning each into an
//! object that wraps the previous one. The finished object is checked against
//! the requested output type and returned as a [`Composite`] together with an
//! immutable record of every applied step.

use crate::descriptor::{LayerDescriptor, PartialLayer};
use crate::error::{ComposeError, Result};
use crate::instantiator::instantiate;
use crate::interceptor::InterceptorProxy;
use crate::passthrough::{synthesize, SynthesisOptions};
use crate::resolver::{InjectionBinding, InjectionResolver};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use strata_core::{ComposeConfig, InvokeError, Object, ObjectRef, TypeKey, TypeRegistry, Value};
use tracing::{debug, info_span, warn};

/// Kind of an applied layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayerKind {
    /// A partial type completed by a synthesized pass-through
    Partial,
    /// A caller-supplied function from delegate to replacement
    Transform,
    /// A dynamic proxy routing every call through a handler
    Interceptor,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Partial => "partial",
            Self::Transform => "transform",
            Self::Interceptor => "interceptor",
        })
    }
}

/// Record of one applied layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStep {
    /// How the layer was applied
    pub kind: LayerKind,
    /// Partial type key, transform name or interceptor name
    pub layer: String,
    /// Type of the delegate the layer wrapped
    pub delegate_type: TypeKey,
    /// Injection binding, for partial layers
    pub binding: Option<InjectionBinding>,
    /// Type of the object the layer produced
    pub produced: TypeKey,
}

/// Immutable record of an assembled chain, innermost step first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionChain {
    base: TypeKey,
    output: TypeKey,
    steps: Vec<ChainStep>,
}

impl CompositionChain {
    /// Type of the base object the chain started from
    pub fn base_type(&self) -> &TypeKey {
        &self.base
    }

    /// Type the finished composite reports
    pub fn output_type(&self) -> &TypeKey {
        &self.output
    }

    /// Applied layers, innermost first
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Number of applied layers
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// One-line description, e.g. `ArraySequence <- Doubling [constructor #0 param 0] => Sequence`
    pub fn describe(&self) -> String {
        let mut out = self.base.to_string();
        for step in &self.steps {
            out.push_str(" <- ");
            out.push_str(&step.layer);
            match &step.binding {
                Some(binding) => out.push_str(&format!(" [{binding}]")),
                None => out.push_str(&format!(" [{}]", step.kind)),
            }
        }
        out.push_str(" => ");
        out.push_str(self.output.as_str());
        out
    }
}

/// The finished object of a chain
///
/// Calls go straight to the outermost layer. The composite reports the chain's
/// output type.
pub struct Composite {
    root: ObjectRef,
    chain: Arc<CompositionChain>,
    satisfies: Vec<TypeKey>,
}

impl Composite {
    /// Record of how the composite was assembled
    pub fn chain(&self) -> &CompositionChain {
        &self.chain
    }

    /// Same as [`CompositionChain::output_type`]
    pub fn output_type(&self) -> &TypeKey {
        &self.chain.output
    }

    /// The outermost layer object
    pub fn root(&self) -> &ObjectRef {
        &self.root
    }

    /// Whether the composite was built to satisfy `contract`
    pub fn satisfies(&self, contract: &TypeKey) -> bool {
        self.satisfies.contains(contract)
    }

    /// Wrap the composite in a typed view
    pub fn into_view<V: ContractView>(self) -> Result<V> {
        let contract = V::contract();
        if !self.satisfies(&contract) {
            return Err(ComposeError::IncompatibleOutputType {
                expected: contract,
                actual: self.output_type().clone(),
                missing: Vec::new(),
            });
        }
        Ok(V::from_object(Arc::new(self)))
    }
}

impl Object for Composite {
    fn type_key(&self) -> TypeKey {
        self.chain.output.clone()
    }

    fn responds_to(&self, member: &str) -> bool {
        self.root.responds_to(member)
    }

    fn invoke(&self, member: &str, args: &[Value]) -> std::result::Result<Value, InvokeError> {
        self.root.invoke(member, args)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("chain", &self.chain.describe())
            .finish_non_exhaustive()
    }
}

/// Typed wrapper over an object satisfying a contract
pub trait ContractView: Sized {
    /// Contract the view expects
    fn contract() -> TypeKey;

    fn from_object(object: ObjectRef) -> Self;
}

/// Assembly parameters shared by [`compose`] and the chain builder
pub(crate) struct Assembler<'a> {
    pub registry: &'a TypeRegistry,
    pub resolver: &'a InjectionResolver,
    pub config: &'a ComposeConfig,
    pub contract: TypeKey,
    pub output: Option<TypeKey>,
}

impl Assembler<'_> {
    pub fn assemble(&self, base: ObjectRef, layers: Vec<LayerDescriptor>) -> Result<Composite> {
        let span = info_span!("compose", contract = %self.contract, layers = layers.len());
        let _guard = span.enter();

        let base_type = base.type_key();
        match self.run(base, layers) {
            Ok(composite) => {
                debug!(chain = %composite.chain().describe(), "composition complete");
                Ok(composite)
            }
            Err(err) => {
                warn!(base = %base_type, error = %err, "composition failed");
                Err(err)
            }
        }
    }

    fn run(&self, base: ObjectRef, layers: Vec<LayerDescriptor>) -> Result<Composite> {
        if let Some(limit) = self.config.max_layers {
            if layers.len() > limit {
                return Err(ComposeError::TooManyLayers {
                    declared: layers.len(),
                    limit,
                });
            }
        }
        self.registry.require_contract(&self.contract)?;

        // Synthesized layers are typed as their partial type, assignable to
        // whatever it implements and to the chain's contract
        let mut registry = self.registry.clone();
        let contract_members: Vec<String> = registry
            .all_members(&self.contract)
            .into_iter()
            .map(|sig| sig.name)
            .collect();
        let options = SynthesisOptions {
            strict_members: self.config.strict_members,
            trace_calls: self.config.trace_calls,
        };

        let base_type = base.type_key();
        let mut current = base;
        let mut steps = Vec::with_capacity(layers.len());

        for descriptor in layers {
            let delegate_type = current.type_key();
            let label = descriptor.label();
            let (kind, binding, next) = match descriptor {
                LayerDescriptor::Partial(layer) => {
                    let partial = layer.partial();
                    registry.declare_type(
                        partial.key().clone(),
                        partial
                            .implements()
                            .iter()
                            .cloned()
                            .chain(std::iter::once(self.contract.clone())),
                    )?;
                    let extras = checked_extra_types(&registry, &layer)?;
                    let binding =
                        self.resolver
                            .resolve(&registry, partial, &delegate_type, &extras)?;
                    let state = instantiate(partial, &binding, layer.args(), &current)?;
                    let wrapper = synthesize(
                        &registry,
                        Arc::clone(partial),
                        &binding,
                        state,
                        current,
                        std::slice::from_ref(&self.contract),
                        options,
                    )?;
                    let next: ObjectRef = Arc::new(wrapper);
                    (LayerKind::Partial, Some(binding), next)
                }
                LayerDescriptor::Transform(transform) => {
                    (LayerKind::Transform, None, transform.apply(current))
                }
                LayerDescriptor::Interceptor(handler) => {
                    let proxy: ObjectRef = Arc::new(InterceptorProxy::new(
                        current,
                        handler,
                        contract_members.clone(),
                    ));
                    (LayerKind::Interceptor, None, proxy)
                }
            };

            let produced = next.type_key();
            debug!(
                layer = %label,
                %kind,
                delegate_type = %delegate_type,
                binding = ?binding,
                produced = %produced,
                "applied layer"
            );
            steps.push(ChainStep {
                kind,
                layer: label,
                delegate_type,
                binding,
                produced,
            });
            current = next;
        }

        let output = self.output.clone().unwrap_or_else(|| self.contract.clone());
        check_output(&registry, &output, current.as_ref())?;

        let mut satisfies = vec![output.clone()];
        satisfies.extend(registry.ancestors(&output));

        Ok(Composite {
            root: current,
            chain: Arc::new(CompositionChain {
                base: base_type,
                output,
                steps,
            }),
            satisfies,
        })
    }
}

/// Extra argument types after checking explicit declarations against the values
fn checked_extra_types(registry: &TypeRegistry, layer: &PartialLayer) -> Result<Vec<TypeKey>> {
    let types = layer.extra_types();
    let Some(declared) = layer.declared_types() else {
        return Ok(types);
    };
    let fits = declared.len() == layer.args().len()
        && declared
            .iter()
            .zip(layer.args())
            .all(|(ty, value)| registry.is_assignable(ty, &value.type_key()));
    if fits {
        Ok(types)
    } else {
        Err(ComposeError::arity_mismatch(layer.partial().key(), &types))
    }
}

/// Structural check of the outermost object against the output type
fn check_output(registry: &TypeRegistry, output: &TypeKey, object: &dyn Object) -> Result<()> {
    if !registry.is_contract(output) {
        return Err(ComposeError::IncompatibleOutputType {
            expected: output.clone(),
            actual: object.type_key(),
            missing: Vec::new(),
        });
    }
    let missing: Vec<String> = registry
        .all_members(output)
        .into_iter()
        .map(|sig| sig.name)
        .filter(|name| !object.responds_to(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ComposeError::IncompatibleOutputType {
            expected: output.clone(),
            actual: object.type_key(),
            missing,
        })
    }
}

/// Assemble `layers` around `base` with the default configuration
///
/// The composite must satisfy `output` when given, otherwise `contract`.
pub fn compose(
    registry: &TypeRegistry,
    base: ObjectRef,
    contract: impl Into<TypeKey>,
    layers: Vec<LayerDescriptor>,
    output: Option<TypeKey>,
) -> Result<Composite> {
    let config = ComposeConfig::default();
    let resolver = InjectionResolver::with_cache(config.resolution_cache);
    Assembler {
        registry,
        resolver: &resolver,
        config: &config,
        contract: contract.into(),
        output,
    }
    .assemble(base, layers)
}
