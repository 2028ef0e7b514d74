//! Call-order recorders

use parking_lot::Mutex;
use std::sync::Arc;
use strata_composition::InterceptorHandler;
use strata_core::{InvokeResult, Object, Value};

/// Shared, append-only log of call labels
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Entries recorded so far, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Interceptor that logs `"{label}:{member}"` and forwards every call
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    label: String,
    log: CallLog,
}

impl RecordingInterceptor {
    pub fn new(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }
}

impl InterceptorHandler for RecordingInterceptor {
    fn handle(
        &self,
        delegate: &dyn Object,
        member: &str,
        args: &[Value],
    ) -> Option<InvokeResult<Value>> {
        self.log.push(format!("{}:{member}", self.label));
        Some(delegate.invoke(member, args))
    }

    fn name(&self) -> &str {
        &self.label
    }
}
