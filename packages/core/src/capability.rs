//! Fenestration: policy-gated indirect calls to external services.
//!
//! The registry is an external collaborator - the core treats it as an
//! opaque function returning `{success, data, error}` and never evaluates
//! policy itself. Instances reach it through [`Scope::fenestrate`], which
//! adds per-instance caching and error routing on top.

use crate::innerlude::*;
use futures_util::future::LocalBoxFuture;

/// What a capability invocation produced.
#[derive(Clone, Debug)]
pub struct CapabilityResult {
    pub success: bool,
    pub data: StateValue,
    pub error: Option<String>,
}

impl CapabilityResult {
    pub fn ok(data: impl Into<StateValue>) -> Self {
        CapabilityResult {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        CapabilityResult {
            success: false,
            data: StateValue::Null,
            error: Some(message.into()),
        }
    }
}

/// Ambient information handed to the registry with every call.
#[derive(Clone, Debug)]
pub struct CapabilityContext {
    /// The calling instance.
    pub scope: ScopeId,
    pub user: Option<String>,
    pub session: Option<String>,
    pub tenant: Option<String>,
    /// Which architectural layer issued the call.
    pub layer: &'static str,
    /// The calling component's declared capability requirements.
    pub required: Vec<String>,
}

impl CapabilityContext {
    pub fn new(scope: ScopeId) -> Self {
        CapabilityContext {
            scope,
            user: None,
            session: None,
            tenant: None,
            layer: "component",
            required: Vec::new(),
        }
    }
}

/// The injected capability registry. Policy evaluation happens behind this
/// trait; the core only consumes the result.
pub trait CapabilityRegistry {
    fn pierce(
        &self,
        capability: &str,
        context: &CapabilityContext,
        args: &[StateValue],
    ) -> CapabilityResult;

    /// Async counterpart. The default wraps the sync call.
    fn pierce_async<'a>(
        &'a self,
        capability: &str,
        context: &CapabilityContext,
        args: &[StateValue],
    ) -> LocalBoxFuture<'a, CapabilityResult> {
        let result = self.pierce(capability, context, args);
        Box::pin(futures_util::future::ready(result))
    }

    /// Boolean grant lookup used to gate capability-scoped lifecycle hooks.
    fn grants(&self, capability: &str) -> bool {
        let _ = capability;
        true
    }
}
