//! HTTP client for the module dispatch gateway.
//!
//! Transport failures are folded into a failed [`McpResponse`] so callers handle a single shape.

use mcp_gateway::envelope::{McpRequest, McpResponse};
use mcp_gateway::params::Params;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone)]
pub struct McpClient {
    execute_url: String,
    http: reqwest::Client,
}

impl McpClient {
    /// `execute_url` is the full execute endpoint, e.g. `http://localhost:8000/api/execute`.
    pub fn new(execute_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            execute_url: execute_url.into(),
            http,
        })
    }

    /// Call `module` with `params`.
    ///
    /// A non-2xx reply becomes `HTTP Error: <body>`; a request that produced no usable reply
    /// becomes `Request failed: <cause>`.
    pub async fn call(&self, module: &str, params: Params) -> McpResponse {
        let request = McpRequest {
            module: module.to_string(),
            params,
        };
        tracing::debug!(event = "client_call", module = %module, url = %self.execute_url);

        let resp = match self.http.post(&self.execute_url).json(&request).send().await {
            Ok(resp) => resp,
            Err(err) => return request_failed(err),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return McpResponse::fail(format!("HTTP Error: {body}"));
        }

        match resp.json::<McpResponse>().await {
            Ok(envelope) => envelope,
            Err(err) => request_failed(err),
        }
    }

    /// List modules via the discovery endpoint next to the execute endpoint.
    pub async fn modules(&self) -> anyhow::Result<Vec<ModuleSummary>> {
        let url = discovery_url(&self.execute_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} failed (status {status})");
        }
        Ok(resp.json().await?)
    }
}

/// `Request failed:` with the reqwest error and its source chain.
fn request_failed(err: reqwest::Error) -> McpResponse {
    McpResponse::fail(format!("Request failed: {:#}", anyhow::Error::from(err)))
}

fn discovery_url(execute_url: &str) -> String {
    match execute_url.strip_suffix("/execute") {
        Some(prefix) => format!("{prefix}/modules"),
        None => format!("{}/modules", execute_url.trim_end_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_url_sits_next_to_execute() {
        assert_eq!(
            discovery_url("http://localhost:8000/api/execute"),
            "http://localhost:8000/api/modules"
        );
        assert_eq!(
            discovery_url("http://localhost:5001/mcp/execute"),
            "http://localhost:5001/mcp/modules"
        );
        assert_eq!(
            discovery_url("http://localhost:5001/mcp/"),
            "http://localhost:5001/mcp/modules"
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_failed_envelope() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = McpClient::new(format!("http://{addr}/api/execute")).unwrap();
        let resp = client.call("add", Params::new()).await;
        assert!(!resp.success);
        let error = resp.error.unwrap();
        let detail = error.strip_prefix("Request failed: ").unwrap();
        // The connect failure itself is carried, not just reqwest's summary line.
        assert!(detail.contains(": "), "{error}");
    }
}
