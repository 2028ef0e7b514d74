//! Fluent chain declaration
//!
//! ```ignore
//! let sequence = ChainBuilder::new(&registry, "Sequence")
//!     .layer(doubling_add())
//!     .layer_with_args(size_offset(), [100])
//!     .build(Arc::new(SequenceObject::new()))?;
//! ```
//!
//! Layers are listed innermost first. `build` consumes the builder, so a
//! declaration is assembled at most once.

use crate::chain::{Assembler, Composite, ContractView};
use crate::descriptor::{LayerDescriptor, PartialLayer, TransformLayer};
use crate::error::Result;
use crate::interceptor::InterceptorHandler;
use crate::partial::PartialType;
use crate::resolver::InjectionResolver;
use std::sync::Arc;
use strata_core::{ComposeConfig, ObjectRef, TypeKey, TypeRegistry, Value};

/// Declares a chain of layers over a contract
pub struct ChainBuilder<'r> {
    registry: &'r TypeRegistry,
    contract: TypeKey,
    output: Option<TypeKey>,
    layers: Vec<LayerDescriptor>,
    config: ComposeConfig,
    resolver: Option<Arc<InjectionResolver>>,
}

impl<'r> ChainBuilder<'r> {
    /// Start a chain whose composite must satisfy `contract`
    pub fn new(registry: &'r TypeRegistry, contract: impl Into<TypeKey>) -> Self {
        Self {
            registry,
            contract: contract.into(),
            output: None,
            layers: Vec::new(),
            config: ComposeConfig::default(),
            resolver: None,
        }
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: ComposeConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a resolver (and its cache) across builds
    pub fn with_resolver(mut self, resolver: Arc<InjectionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Add a partial layer without extra constructor arguments
    pub fn layer(self, partial: impl Into<Arc<PartialType>>) -> Self {
        self.push(PartialLayer::new(partial.into()))
    }

    /// Add a partial layer with extra constructor arguments
    pub fn layer_with_args(
        self,
        partial: impl Into<Arc<PartialType>>,
        args: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let args = args.into_iter().map(Into::into).collect();
        self.push(PartialLayer::with_args(partial.into(), args))
    }

    /// Add a partial layer with extra arguments and their declared types
    pub fn layer_with_typed_args(
        self,
        partial: impl Into<Arc<PartialType>>,
        args: impl IntoIterator<Item = impl Into<Value>>,
        types: impl IntoIterator<Item = impl Into<TypeKey>>,
    ) -> Self {
        let args = args.into_iter().map(Into::into).collect();
        let types = types.into_iter().map(Into::into).collect();
        self.push(PartialLayer::with_typed_args(partial.into(), args, types))
    }

    /// Add a transform layer
    pub fn transform(self, f: impl FnOnce(ObjectRef) -> ObjectRef + Send + 'static) -> Self {
        self.push(TransformLayer::new(f))
    }

    /// Add a named transform layer
    pub fn transform_named(
        self,
        name: impl Into<String>,
        f: impl FnOnce(ObjectRef) -> ObjectRef + Send + 'static,
    ) -> Self {
        self.push(TransformLayer::named(name, f))
    }

    /// Add an interceptor layer
    pub fn intercept(self, handler: impl InterceptorHandler + 'static) -> Self {
        self.intercept_shared(Arc::new(handler))
    }

    /// Add an interceptor layer sharing an existing handler
    pub fn intercept_shared(mut self, handler: Arc<dyn InterceptorHandler>) -> Self {
        self.layers.push(LayerDescriptor::Interceptor(handler));
        self
    }

    /// Add any descriptor
    pub fn push(mut self, descriptor: impl Into<LayerDescriptor>) -> Self {
        self.layers.push(descriptor.into());
        self
    }

    /// Require the composite to satisfy `output` instead of the chain's contract
    pub fn as_type(mut self, output: impl Into<TypeKey>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Assemble the chain around `base`
    pub fn build(self, base: ObjectRef) -> Result<Composite> {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(InjectionResolver::with_cache(self.config.resolution_cache)));
        Assembler {
            registry: self.registry,
            resolver: &resolver,
            config: &self.config,
            contract: self.contract,
            output: self.output,
        }
        .assemble(base, self.layers)
    }

    /// Assemble the chain and wrap the composite in a typed view
    pub fn build_view<V: ContractView>(self, base: ObjectRef) -> Result<V> {
        self.build(base)?.into_view()
    }
}
