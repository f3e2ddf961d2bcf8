//! Resolution of `namespace:function` references to registered handlers.
//!
//! Resolutions are cached by reference for the life of the process. The cache is append-only and
//! the first inserted value wins, so concurrent resolution of the same reference is idempotent.

use std::sync::Arc;

use dashmap::DashMap;

use crate::handlers::{HandlerCatalog, LocalFunction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("namespace '{0}' not found")]
    NamespaceNotFound(String),
    #[error("function '{function}' not found in namespace '{namespace}'")]
    FunctionNotFound { namespace: String, function: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// A registered reference could not be turned into a handler.
pub enum ResolutionError {
    #[error("malformed handler reference {0:?} (expected \"namespace:function\")")]
    Malformed(String),
    #[error("cannot resolve handler '{reference}': {cause}")]
    Lookup {
        reference: String,
        #[source]
        cause: LookupError,
    },
}

/// Source of handlers for the resolver.
pub trait FunctionLookup: Send + Sync {
    fn lookup(&self, namespace: &str, function: &str) -> Result<Arc<LocalFunction>, LookupError>;
}

impl FunctionLookup for HandlerCatalog {
    fn lookup(&self, namespace: &str, function: &str) -> Result<Arc<LocalFunction>, LookupError> {
        let functions = self
            .namespace(namespace)
            .ok_or_else(|| LookupError::NamespaceNotFound(namespace.to_string()))?;
        functions
            .get(function)
            .cloned()
            .ok_or_else(|| LookupError::FunctionNotFound {
                namespace: namespace.to_string(),
                function: function.to_string(),
            })
    }
}

/// Split `namespace:function`. Exactly one separator, both halves non-empty.
pub fn split_reference(reference: &str) -> Result<(&str, &str), ResolutionError> {
    match reference.split_once(':') {
        Some((namespace, function))
            if !namespace.is_empty() && !function.is_empty() && !function.contains(':') =>
        {
            Ok((namespace, function))
        }
        _ => Err(ResolutionError::Malformed(reference.to_string())),
    }
}

pub struct HandlerResolver {
    lookup: Arc<dyn FunctionLookup>,
    cache: DashMap<String, Arc<LocalFunction>>,
}

impl HandlerResolver {
    pub fn new(lookup: Arc<dyn FunctionLookup>) -> Self {
        Self {
            lookup,
            cache: DashMap::new(),
        }
    }

    /// Resolve a reference, consulting the lookup only on a cache miss.
    pub fn resolve(&self, reference: &str) -> Result<Arc<LocalFunction>, ResolutionError> {
        if let Some(hit) = self.cache.get(reference) {
            return Ok(Arc::clone(hit.value()));
        }

        let (namespace, function) = split_reference(reference)?;
        let resolved =
            self.lookup
                .lookup(namespace, function)
                .map_err(|cause| ResolutionError::Lookup {
                    reference: reference.to_string(),
                    cause,
                })?;

        tracing::debug!(event = "handler_resolved", reference, "handler resolved");
        let entry = self.cache.entry(reference.to_string()).or_insert(resolved);
        Ok(Arc::clone(entry.value()))
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
