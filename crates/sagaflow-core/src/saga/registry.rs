//! Lookup table from descriptor kind to compensation handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use sagaflow_protocols::{CompensationDescriptor, CompensationError, CompensationHandler};

/// Handler built from an async closure.
pub struct FnCompensation<F> {
    kind: String,
    func: F,
}

impl<F> FnCompensation<F> {
    pub fn new(kind: impl Into<String>, func: F) -> Self {
        Self {
            kind: kind.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> CompensationHandler for FnCompensation<F>
where
    F: Fn(CompensationDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), CompensationError>> + Send,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn compensate(&self, descriptor: &CompensationDescriptor) -> Result<(), CompensationError> {
        (self.func)(descriptor.clone()).await
    }
}

/// Compensation handlers keyed by kind. Built once, then shared read-only.
#[derive(Default, Clone)]
pub struct CompensationRegistry {
    handlers: HashMap<String, Arc<dyn CompensationHandler>>,
}

impl CompensationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; replaces any handler of the same kind.
    pub fn with_handler(mut self, handler: impl CompensationHandler + 'static) -> Self {
        self.register(Arc::new(handler));
        self
    }

    /// Add a closure handler for `kind`.
    pub fn with_fn<F, Fut>(self, kind: impl Into<String>, func: F) -> Self
    where
        F: Fn(CompensationDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CompensationError>> + Send + 'static,
    {
        self.with_handler(FnCompensation::new(kind, func))
    }

    pub fn register(&mut self, handler: Arc<dyn CompensationHandler>) {
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Run the handler registered for the descriptor's kind.
    pub async fn dispatch(&self, descriptor: &CompensationDescriptor) -> Result<(), CompensationError> {
        let handler = self
            .handlers
            .get(&descriptor.kind)
            .ok_or_else(|| CompensationError::NoHandler(descriptor.kind.clone()))?;
        handler.compensate(descriptor).await
    }
}

impl std::fmt::Debug for CompensationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_to_registered_handler() {
        let registry = CompensationRegistry::new().with_fn("noop", |_d| async { Ok::<_, CompensationError>(()) });
        assert!(registry.contains("noop"));
        registry
            .dispatch(&CompensationDescriptor::new("noop"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_unknown_kind() {
        let registry = CompensationRegistry::new();
        let err = registry
            .dispatch(&CompensationDescriptor::new("drop_table"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompensationError::NoHandler(kind) if kind == "drop_table"));
    }

    #[tokio::test]
    async fn test_handler_receives_params() {
        let registry = CompensationRegistry::new().with_fn("cleanup", |d: CompensationDescriptor| async move {
            d.str_param("dir")?;
            Ok::<_, CompensationError>(())
        });

        let ok = CompensationDescriptor::new("cleanup").with_param("dir", "/tmp/x");
        assert!(registry.dispatch(&ok).await.is_ok());

        let bad = CompensationDescriptor::new("cleanup");
        assert!(matches!(
            registry.dispatch(&bad).await,
            Err(CompensationError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_later_registration_replaces_kind() {
        let registry = CompensationRegistry::new()
            .with_fn("a", |_d| async { Ok::<_, CompensationError>(()) })
            .with_fn("a", |_d| async { Err::<(), _>(CompensationError::Failed("replaced".to_string())) })
            .with_fn("b", |_d| async { Ok::<_, CompensationError>(()) });
        assert_eq!(registry.kinds(), vec!["a", "b"]);
    }
}
