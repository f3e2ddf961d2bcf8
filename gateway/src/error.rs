//! Dispatch failure taxonomy.
//!
//! Every variant renders to the `error` string of a failed envelope.

use http::StatusCode;

use crate::{
    catalog::ConfigError, handlers::InvocationError, microservice::TransportError,
    params::ValidationError, resolver::ResolutionError,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// `available` is only reported by the proxy deployment.
    #[error("{}", not_found_message(.module, .available.as_deref()))]
    NotFound {
        module: String,
        available: Option<Vec<String>>,
    },

    #[error("Internal error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("{0}")]
    Invocation(#[from] InvocationError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Config(#[from] ConfigError),
}

fn not_found_message(module: &str, available: Option<&[String]>) -> String {
    match available {
        None => "Module not found".to_string(),
        Some(names) => format!(
            "Module '{module}' not found. Available: {}",
            names.join(", ")
        ),
    }
}

impl DispatchError {
    /// HTTP status for the envelope carrying this error.
    ///
    /// Dispatch failures are regular `200` answers; an unreadable catalog is a server fault.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Resolution(_) => "resolution",
            Self::Invocation(_) => "invocation",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
        }
    }
}
