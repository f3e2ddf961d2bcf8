//! Request dispatch: parse → resolve module → invoke → wrap into an envelope.
//!
//! The dispatcher never fails. Every error becomes a failed [`McpResponse`]; the matching HTTP
//! status is returned alongside so the transport can tell server faults apart.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

use crate::{
    builtin,
    catalog::{ConfigError, ModuleCatalog},
    envelope::{McpRequest, McpResponse},
    error::DispatchError,
    handlers::InvocationError,
    microservice::ServiceInvoker,
    params::{self, json_type_name, FieldIssue, Params, ValidationError},
    registry::{ModuleDescriptor, ModuleRegistry, ModuleTarget},
    resolver::HandlerResolver,
};

#[async_trait]
/// Where modules come from and how they run.
pub trait ModuleBackend: Send + Sync {
    /// Registry to resolve the current call against.
    async fn registry(&self) -> Result<Arc<ModuleRegistry>, ConfigError>;

    /// Whether a not-found error lists the registered module names.
    fn lists_available(&self) -> bool {
        false
    }

    async fn invoke(
        &self,
        module: &ModuleDescriptor,
        params: Params,
    ) -> Result<Value, DispatchError>;
}

/// In-process handlers behind a static registry.
pub struct LocalBackend {
    registry: Arc<ModuleRegistry>,
    resolver: HandlerResolver,
}

impl LocalBackend {
    /// Build the backend, resolving every registered reference up front.
    ///
    /// A reference that does not resolve fails here rather than on the first call.
    pub fn new(registry: ModuleRegistry, resolver: HandlerResolver) -> anyhow::Result<Self> {
        for module in registry.list_all() {
            match &module.target {
                ModuleTarget::Local(target) => {
                    resolver.resolve(&target.reference)?;
                }
                ModuleTarget::Remote(_) => anyhow::bail!(
                    "module '{}' is remote; local gateways only serve handlers",
                    module.name
                ),
            }
        }
        Ok(Self {
            registry: Arc::new(registry),
            resolver,
        })
    }

    /// The built-in modules (`add`, `subtract`, `multiply`, `divide`, `echo`).
    pub fn builtin() -> anyhow::Result<Self> {
        let registry = ModuleRegistry::new(builtin::modules())?;
        let resolver = HandlerResolver::new(Arc::new(builtin::catalog()?));
        Self::new(registry, resolver)
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.registry
    }
}

#[async_trait]
impl ModuleBackend for LocalBackend {
    async fn registry(&self) -> Result<Arc<ModuleRegistry>, ConfigError> {
        Ok(Arc::clone(&self.registry))
    }

    async fn invoke(
        &self,
        module: &ModuleDescriptor,
        params: Params,
    ) -> Result<Value, DispatchError> {
        let ModuleTarget::Local(target) = &module.target else {
            return Err(InvocationError::new(format!(
                "module '{}' is not served by this gateway",
                module.name
            ))
            .into());
        };

        let function = self.resolver.resolve(&target.reference)?;
        function.schema().check(&params)?;
        Ok(function.invoke(params).await?)
    }
}

/// Microservices listed in the catalog document.
pub struct ProxyBackend {
    catalog: ModuleCatalog,
    invoker: Arc<dyn ServiceInvoker>,
}

impl ProxyBackend {
    pub fn new(catalog: ModuleCatalog, invoker: Arc<dyn ServiceInvoker>) -> Self {
        Self { catalog, invoker }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }
}

#[async_trait]
impl ModuleBackend for ProxyBackend {
    async fn registry(&self) -> Result<Arc<ModuleRegistry>, ConfigError> {
        self.catalog.current().await
    }

    fn lists_available(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        module: &ModuleDescriptor,
        params: Params,
    ) -> Result<Value, DispatchError> {
        let ModuleTarget::Remote(target) = &module.target else {
            return Err(InvocationError::new(format!(
                "module '{}' is not a microservice",
                module.name
            ))
            .into());
        };
        Ok(self.invoker.call(target, &params).await?)
    }
}

/// Decode a raw JSON body into a request, reporting every malformed field.
pub fn parse_request(raw: &Value) -> Result<McpRequest, ValidationError> {
    let Value::Object(body) = raw else {
        return Err(ValidationError::single(
            "body",
            format!("expected object, got {}", json_type_name(raw)),
        ));
    };

    let mut issues = Vec::new();

    let module = match body.get("module") {
        Some(Value::String(module)) => Some(module.clone()),
        Some(other) => {
            issues.push(FieldIssue::new(
                "module",
                format!("expected string, got {}", json_type_name(other)),
            ));
            None
        }
        None => {
            issues.push(FieldIssue::new("module", "field required"));
            None
        }
    };

    let params = match body.get("params") {
        Some(raw_params) => match params::validate(raw_params) {
            Ok(params) => Some(params),
            Err(err) => {
                issues.extend(err.issues);
                None
            }
        },
        None => {
            issues.push(FieldIssue::new("params", "field required"));
            None
        }
    };

    match (module, params) {
        (Some(module), Some(params)) if issues.is_empty() => Ok(McpRequest { module, params }),
        _ => Err(ValidationError { issues }),
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ModuleBackend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ModuleBackend>) -> Self {
        Self { backend }
    }

    /// Dispatch one raw request.
    pub async fn dispatch(&self, raw: &Value) -> McpResponse {
        self.dispatch_with_status(raw).await.1
    }

    /// Dispatch one raw request, also returning the HTTP status for the envelope.
    pub async fn dispatch_with_status(&self, raw: &Value) -> (StatusCode, McpResponse) {
        match self.try_dispatch(raw).await {
            Ok(result) => (StatusCode::OK, McpResponse::ok(result)),
            Err(err) => {
                match &err {
                    DispatchError::Config(_) | DispatchError::Resolution(_) => tracing::error!(
                        event = "dispatch_failed",
                        kind = err.kind(),
                        error = %err,
                        "dispatch failed"
                    ),
                    DispatchError::Transport(_) => tracing::warn!(
                        event = "dispatch_failed",
                        kind = err.kind(),
                        error = %err,
                        "dispatch failed"
                    ),
                    _ => tracing::debug!(
                        event = "dispatch_failed",
                        kind = err.kind(),
                        error = %err,
                        "dispatch failed"
                    ),
                }
                (err.status(), McpResponse::fail(err.to_string()))
            }
        }
    }

    /// Dispatch one raw request, returning the handler's value or the typed failure.
    pub async fn try_dispatch(&self, raw: &Value) -> Result<Value, DispatchError> {
        let request = parse_request(raw)?;
        tracing::Span::current().record("module", request.module.as_str());

        let registry = self.backend.registry().await?;
        let Some(module) = registry.lookup(&request.module) else {
            return Err(DispatchError::NotFound {
                available: self
                    .backend
                    .lists_available()
                    .then(|| registry.names().into_iter().map(str::to_string).collect()),
                module: request.module,
            });
        };

        let result = self.backend.invoke(module, request.params).await?;
        tracing::debug!(event = "dispatch_ok", module = %module.name, "module invoked");
        Ok(result)
    }
}
