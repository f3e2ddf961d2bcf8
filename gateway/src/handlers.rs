//! In-process module handlers.
//!
//! Handlers are registered in a [`HandlerCatalog`] under `namespace` / `function` names when the
//! process starts. There is no way to reach code that was not registered here.

use std::{
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures::{future::BoxFuture, FutureExt as _};
use serde_json::Value;

use crate::{params::Params, schema::ParamSchema};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
/// A handler failed while running. The message is shown to the caller verbatim.
pub struct InvocationError {
    message: String,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type HandlerFn =
    dyn Fn(Params) -> BoxFuture<'static, Result<Value, InvocationError>> + Send + Sync;

/// A registered handler plus the parameter schema it accepts.
pub struct LocalFunction {
    schema: ParamSchema,
    handler: Box<HandlerFn>,
}

impl std::fmt::Debug for LocalFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFunction")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl LocalFunction {
    pub fn new<F, Fut>(schema: ParamSchema, handler: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvocationError>> + Send + 'static,
    {
        Self {
            schema,
            handler: Box::new(move |params| handler(params).boxed()),
        }
    }

    /// Wrap a synchronous function.
    pub fn sync<F>(schema: ParamSchema, handler: F) -> Self
    where
        F: Fn(&Params) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(schema, move |params| {
            let handler = Arc::clone(&handler);
            async move { handler(&params) }
        })
    }

    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    /// Run the handler. A panic inside the handler is reported as an [`InvocationError`].
    pub async fn invoke(&self, params: Params) -> Result<Value, InvocationError> {
        match AssertUnwindSafe(async { (self.handler)(params).await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(InvocationError::new(format!("handler panicked: {detail}")))
            }
        }
    }
}

#[derive(Debug, Default)]
/// Static `namespace -> function -> handler` table.
pub struct HandlerCatalog {
    namespaces: HashMap<String, HashMap<String, Arc<LocalFunction>>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `namespace:function`. Registering the same pair twice is an error.
    pub fn register(
        &mut self,
        namespace: &str,
        function: &str,
        handler: LocalFunction,
    ) -> anyhow::Result<&mut Self> {
        let valid = |s: &str| !s.is_empty() && !s.contains(':');
        if !valid(namespace) || !valid(function) {
            anyhow::bail!("invalid handler name {namespace:?}:{function:?}");
        }
        let functions = self.namespaces.entry(namespace.to_string()).or_default();
        if functions.contains_key(function) {
            anyhow::bail!("handler {namespace}:{function} registered twice");
        }
        functions.insert(function.to_string(), Arc::new(handler));
        Ok(self)
    }

    pub fn namespace(&self, namespace: &str) -> Option<&HashMap<String, Arc<LocalFunction>>> {
        self.namespaces.get(namespace)
    }
}
