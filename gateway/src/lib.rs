//! `mcp-gateway` dispatches `{module, params}` calls to named modules.
//!
//! A call is validated, resolved against a module registry and then run either by an in-process
//! handler (local deployment) or by a microservice listed in a catalog document (proxy
//! deployment). Every outcome is wrapped into the same `{success, result, error}` envelope.
//!
//! Core modules:
//! - [`params`] / [`schema`]: flat parameter maps and per-module parameter schemas
//! - [`registry`]: module descriptors and the catalog document format
//! - [`resolver`]: `namespace:function` references to cached local handlers
//! - [`catalog`]: reloadable module registry for the proxy deployment
//! - [`dispatcher`]: parse → resolve → invoke → envelope
//! - [`server`]: axum server wiring

pub mod builtin;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod location;
pub mod microservice;
pub mod params;
pub mod registry;
pub mod resolver;
pub mod schema;
pub(crate) mod serde_ext;
pub mod server;
