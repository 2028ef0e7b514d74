//! Dynamic interceptor adapter
//!
//! An interceptor sees every call made on its proxy and decides per call whether
//! to compute a result or forward to the delegate. Nothing is synthesized for
//! interceptors: when the handler declines a call by returning `None`, the
//! proxy fails it with [`InvokeError::UnhandledMember`].

use std::fmt;
use std::sync::Arc;
use strata_core::{InvokeError, InvokeResult, Object, ObjectRef, TypeKey, Value};

/// Call handler behind an [`InterceptorProxy`]
pub trait InterceptorHandler: Send + Sync {
    /// Handle `member` called with `args`; `delegate` is the wrapped object
    ///
    /// `None` declines the call. `Some` carries the result, which may be an
    /// error raised by the handler or the delegate.
    fn handle(&self, delegate: &dyn Object, member: &str, args: &[Value])
        -> Option<InvokeResult<Value>>;

    /// Name used in chain descriptions and logs
    fn name(&self) -> &str {
        "interceptor"
    }
}

impl<F> InterceptorHandler for F
where
    F: Fn(&dyn Object, &str, &[Value]) -> Option<InvokeResult<Value>> + Send + Sync,
{
    fn handle(
        &self,
        delegate: &dyn Object,
        member: &str,
        args: &[Value],
    ) -> Option<InvokeResult<Value>> {
        self(delegate, member, args)
    }
}

/// Handler that forwards every call unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Forwarding;

impl InterceptorHandler for Forwarding {
    fn handle(
        &self,
        delegate: &dyn Object,
        member: &str,
        args: &[Value],
    ) -> Option<InvokeResult<Value>> {
        Some(delegate.invoke(member, args))
    }

    fn name(&self) -> &str {
        "forwarding"
    }
}

/// Object routing every call through an [`InterceptorHandler`]
///
/// The proxy reports the delegate's type so later layers resolve their
/// injection points against it exactly as they would against the delegate.
pub struct InterceptorProxy {
    delegate: ObjectRef,
    handler: Arc<dyn InterceptorHandler>,
    members: Vec<String>,
}

impl InterceptorProxy {
    /// Wrap `delegate`; `members` are contract members the proxy advertises
    /// in addition to whatever the delegate responds to
    pub fn new(
        delegate: ObjectRef,
        handler: Arc<dyn InterceptorHandler>,
        members: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            delegate,
            handler,
            members: members.into_iter().collect(),
        }
    }

    /// The wrapped object
    pub fn delegate(&self) -> &ObjectRef {
        &self.delegate
    }

    pub fn handler(&self) -> &Arc<dyn InterceptorHandler> {
        &self.handler
    }
}

impl Object for InterceptorProxy {
    fn type_key(&self) -> TypeKey {
        self.delegate.type_key()
    }

    fn responds_to(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member) || self.delegate.responds_to(member)
    }

    fn invoke(&self, member: &str, args: &[Value]) -> Result<Value, InvokeError> {
        self.handler
            .handle(self.delegate.as_ref(), member, args)
            .unwrap_or_else(|| Err(InvokeError::unhandled(member)))
    }
}

impl fmt::Debug for InterceptorProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorProxy")
            .field("handler", &self.handler.name())
            .field("delegate", &self.delegate.type_key())
            .finish()
    }
}
