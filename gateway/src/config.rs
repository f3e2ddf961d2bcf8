//! Gateway configuration loaded from YAML.
//!
//! Every field has a default, so an empty document (or no document at all) yields a working
//! local deployment.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::catalog::ReloadPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
/// Which deployment this process runs.
pub enum GatewayMode {
    /// Modules are in-process handlers (`/mcp/*`).
    Local,
    /// Modules are microservices listed in the catalog document (`/api/*`).
    Proxy,
}

impl Default for GatewayMode {
    fn default() -> Self {
        Self::Local
    }
}

impl GatewayMode {
    pub fn default_listen_addr(self) -> SocketAddr {
        match self {
            Self::Local => SocketAddr::from(([127, 0, 0, 1], 5001)),
            Self::Proxy => SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

fn default_modules() -> String {
    "config/ms_modules.json".to_string()
}

fn default_reload_interval_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
/// Top-level gateway configuration.
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,

    #[serde(default)]
    /// Address to bind. Defaults to `127.0.0.1:5001` (local) or `127.0.0.1:8000` (proxy).
    pub listen_addr: Option<SocketAddr>,

    #[serde(default = "default_modules")]
    /// Catalog document location (path or http(s) URL). Proxy mode only.
    pub modules: String,

    #[serde(default)]
    /// When the proxy re-reads the catalog document.
    pub reload: ReloadPolicy,

    #[serde(default = "default_reload_interval_ms")]
    /// Maximum catalog age for [`ReloadPolicy::Interval`].
    pub reload_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    /// Timeout for outbound microservice calls and catalog fetches.
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::default(),
            listen_addr: None,
            modules: default_modules(),
            reload: ReloadPolicy::default(),
            reload_interval_ms: default_reload_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewayConfig {
    /// Parse a YAML gateway config from bytes.
    pub fn from_yaml_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(bytes)?)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
            .unwrap_or_else(|| self.mode.default_listen_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_optional_fields() {
        let cfg = GatewayConfig::from_yaml_bytes(b"mode: proxy\n").unwrap();
        assert_eq!(cfg.mode, GatewayMode::Proxy);
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8000".parse().unwrap());
        assert_eq!(cfg.modules, "config/ms_modules.json");
        assert_eq!(cfg.reload, ReloadPolicy::OnChange);
        assert_eq!(cfg.reload_interval_ms, 5_000);
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn empty_document_is_a_local_gateway() {
        let cfg = GatewayConfig::from_yaml_bytes(b"\n").unwrap();
        assert_eq!(cfg.mode, GatewayMode::Local);
        assert_eq!(cfg.listen_addr(), "127.0.0.1:5001".parse().unwrap());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let yaml = br#"
mode: proxy
listen_addr: "0.0.0.0:9000"
modules: "http://config.local/ms_modules.json"
reload: interval
reload_interval_ms: 250
request_timeout_ms: 1500
"#;
        let cfg = GatewayConfig::from_yaml_bytes(yaml).unwrap();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(cfg.reload, ReloadPolicy::Interval);
        assert_eq!(cfg.reload_interval_ms, 250);
        assert_eq!(cfg.request_timeout_ms, 1500);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(GatewayConfig::from_yaml_bytes(b"mode: hybrid\n").is_err());
    }
}
