//! Layer descriptors
//!
//! One descriptor per declared step of a chain. Descriptors are plain data until
//! the chain is built.

use crate::interceptor::InterceptorHandler;
use crate::partial::PartialType;
use std::fmt;
use std::sync::Arc;
use strata_core::{ObjectRef, TypeKey, Value};

/// Function turning the inner delegate into a complete outer object
pub type TransformFn = Box<dyn FnOnce(ObjectRef) -> ObjectRef + Send>;

/// A partial layer with its extra constructor arguments
#[derive(Clone)]
pub struct PartialLayer {
    partial: Arc<PartialType>,
    args: Vec<Value>,
    declared_types: Option<Vec<TypeKey>>,
}

impl PartialLayer {
    /// A partial layer without extra constructor arguments
    pub fn new(partial: Arc<PartialType>) -> Self {
        Self {
            partial,
            args: Vec::new(),
            declared_types: None,
        }
    }

    /// Extra constructor arguments, typed by their runtime values
    pub fn with_args(partial: Arc<PartialType>, args: Vec<Value>) -> Self {
        Self {
            partial,
            args,
            declared_types: None,
        }
    }

    /// Extra constructor arguments with explicit declared types
    pub fn with_typed_args(
        partial: Arc<PartialType>,
        args: Vec<Value>,
        declared_types: Vec<TypeKey>,
    ) -> Self {
        Self {
            partial,
            args,
            declared_types: Some(declared_types),
        }
    }

    pub fn partial(&self) -> &Arc<PartialType> {
        &self.partial
    }

    /// Extra constructor arguments in order
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Explicit types for the extras, if the layer was declared with them
    pub fn declared_types(&self) -> Option<&[TypeKey]> {
        self.declared_types.as_deref()
    }

    /// Types used to match the extras against constructor parameters
    pub fn extra_types(&self) -> Vec<TypeKey> {
        match &self.declared_types {
            Some(types) => types.clone(),
            None => self.args.iter().map(Value::type_key).collect(),
        }
    }
}

impl fmt::Debug for PartialLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialLayer")
            .field("partial", self.partial.key())
            .field("args", &self.args)
            .field("declared_types", &self.declared_types)
            .finish()
    }
}

/// A transform layer
pub struct TransformLayer {
    name: Option<String>,
    transform: TransformFn,
}

impl TransformLayer {
    /// An unnamed transform; chain descriptions label it `transform`
    pub fn new(transform: impl FnOnce(ObjectRef) -> ObjectRef + Send + 'static) -> Self {
        Self {
            name: None,
            transform: Box::new(transform),
        }
    }

    /// A transform labelled `name` in chain descriptions
    pub fn named(
        name: impl Into<String>,
        transform: impl FnOnce(ObjectRef) -> ObjectRef + Send + 'static,
    ) -> Self {
        Self {
            name: Some(name.into()),
            transform: Box::new(transform),
        }
    }

    /// Label given at construction, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Apply the transform to `delegate`
    pub fn apply(self, delegate: ObjectRef) -> ObjectRef {
        (self.transform)(delegate)
    }
}

impl fmt::Debug for TransformLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformLayer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One declared step of a chain
pub enum LayerDescriptor {
    /// Partial type completed by a synthesized pass-through
    Partial(PartialLayer),
    /// Function replacing the current delegate
    Transform(TransformLayer),
    /// Handler behind a dynamic proxy
    Interceptor(Arc<dyn InterceptorHandler>),
}

impl LayerDescriptor {
    /// Short label for logs and chain descriptions
    pub fn label(&self) -> String {
        match self {
            Self::Partial(layer) => layer.partial().key().to_string(),
            Self::Transform(layer) => layer.name().unwrap_or("transform").to_string(),
            Self::Interceptor(handler) => handler.name().to_string(),
        }
    }
}

impl From<PartialLayer> for LayerDescriptor {
    fn from(layer: PartialLayer) -> Self {
        Self::Partial(layer)
    }
}

impl From<Arc<PartialType>> for LayerDescriptor {
    fn from(partial: Arc<PartialType>) -> Self {
        Self::Partial(PartialLayer::new(partial))
    }
}

impl From<TransformLayer> for LayerDescriptor {
    fn from(layer: TransformLayer) -> Self {
        Self::Transform(layer)
    }
}

impl fmt::Debug for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial(layer) => layer.fmt(f),
            Self::Transform(layer) => layer.fmt(f),
            Self::Interceptor(handler) => f
                .debug_tuple("Interceptor")
                .field(&handler.name())
                .finish(),
        }
    }
}
