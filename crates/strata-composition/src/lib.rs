#![deny(clippy::await_holding_lock)]
//! # Strata Composition - Layered Composite Assembly
//!
//! Assembles an ordered list of partial layers, transforms and interceptors
//! around a base object into one composite satisfying a contract.
//!
//! For each partial layer the engine:
//!
//! 1. resolves the unique injection point for the inner delegate ([`resolver`])
//! 2. constructs the layer's state ([`instantiator`])
//! 3. wraps it in a pass-through that forwards every member the layer leaves
//!    unimplemented ([`passthrough`])
//!
//! Interceptors ([`interceptor`]) see every call and decide per call whether to
//! answer or forward. Later layers are outer: a member implemented by two layers
//! runs the later one first.

pub mod builder;
pub mod chain;
pub mod descriptor;
pub mod error;
pub mod instantiator;
pub mod interceptor;
pub mod partial;
pub mod passthrough;
pub mod resolver;

pub use builder::ChainBuilder;
pub use chain::{compose, ChainStep, Composite, CompositionChain, ContractView, LayerKind};
pub use descriptor::{LayerDescriptor, PartialLayer, TransformLayer};
pub use error::{ComposeError, Result};
pub use instantiator::instantiate;
pub use interceptor::{Forwarding, InterceptorHandler, InterceptorProxy};
pub use partial::{
    ConstructorSpec, FieldSpec, LayerCall, LayerState, MethodSpec, PartialType, PartialTypeBuilder,
};
pub use passthrough::{synthesize, DispatchKind, PassThrough, SynthesisOptions};
pub use resolver::{resolve_binding, InjectionBinding, InjectionCategory, InjectionResolver};
