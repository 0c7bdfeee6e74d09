//! Handler registration (spec §4.6 "Public contract", §5 "Shared-resource
//! policy": "the handler registry is read-only after `serve()` begins; no
//! locking needed for lookup"). Grounded in the `Handler`/`#[async_trait]`
//! shape used by the pack's `salvo-rs-salvo` request-handler trait, adapted
//! from `(&mut Request, &mut Response)` to this crate's
//! `(RequestContext, &mut ResponseContext)`.

use super::context::{RequestContext, ResponseContext};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A callable `(RequestContext, ResponseContext) → Result<unit, Error>`
/// (spec §6 "Consumer-supplied interfaces"). Implemented directly for
/// structs wanting shared state across calls, or picked up automatically by
/// the blanket impl below for a plain async closure.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: RequestContext, response: &mut ResponseContext) -> Result<()>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: for<'a> Fn(RequestContext, &'a mut ResponseContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, request: RequestContext, response: &mut ResponseContext) -> Result<()> {
        (self)(request, response).await
    }
}

/// Method-path → handler map. Built via [`HandlerRegistry::register`] before
/// `serve()`; mutation afterward is a caller error the spec forbids but this
/// type doesn't itself police (there's no handle held across the boundary
/// to revoke), so `serve()` simply stops consulting a `&mut` registry and
/// only ever sees a shared `Arc<HandlerRegistry>` from then on.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("method_count", &self.handlers.len())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `method_path` (e.g. `"Echo/Say"`, matching
    /// the `:path` pseudo-header stripped of its leading `/`).
    pub fn register(&mut self, method_path: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(method_path.into(), Arc::new(handler));
    }

    pub fn get(&self, method_path: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(method_path).cloned()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
