//! Outbound calls to proxied microservices.
//!
//! GET targets receive the params as a query string, POST targets as a JSON body. The response
//! body must be JSON; it becomes the envelope's `result`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    params::Params,
    registry::{RemoteMethod, RemoteTarget},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The service answered with a non-2xx status.
    #[error("Microservice error: {body}")]
    Status { status: u16, body: String },
    /// The call never produced a usable answer (connect, timeout, undecodable body).
    #[error("Request failed: {0}")]
    Request(String),
}

#[async_trait]
/// Abstract invoker so the dispatcher can be tested without a network.
pub trait ServiceInvoker: Send + Sync {
    async fn call(&self, target: &RemoteTarget, params: &Params) -> Result<Value, TransportError>;
}

/// `reqwest` implementation of [`ServiceInvoker`].
#[derive(Clone)]
pub struct HttpServiceInvoker {
    http: reqwest::Client,
}

impl HttpServiceInvoker {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn describe(err: reqwest::Error) -> String {
    // reqwest's Display omits the underlying cause (e.g. "connection refused").
    format!("{:#}", anyhow::Error::from(err))
}

#[async_trait]
impl ServiceInvoker for HttpServiceInvoker {
    async fn call(&self, target: &RemoteTarget, params: &Params) -> Result<Value, TransportError> {
        let req = self.http.request(target.method.as_http(), &target.url);
        let req = match target.method {
            RemoteMethod::Post => req.json(&Value::from(params.clone())),
            RemoteMethod::Get => req.query(&params.query_pairs()),
        };

        let resp = req
            .send()
            .await
            .map_err(|err| TransportError::Request(describe(err)))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|err| TransportError::Request(describe(err)))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|err| {
            TransportError::Request(format!("response from {} is not JSON: {err}", target.url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_match_envelope_wording() {
        let status = TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(status.to_string(), "Microservice error: boom");

        let request = TransportError::Request("connection refused".to_string());
        assert_eq!(request.to_string(), "Request failed: connection refused");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_failure() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let invoker = HttpServiceInvoker::new(Duration::from_secs(2)).unwrap();
        let err = invoker
            .call(
                &RemoteTarget {
                    url: format!("http://{addr}/add"),
                    method: RemoteMethod::Post,
                },
                &Params::new(),
            )
            .await
            .unwrap_err();
        let TransportError::Request(detail) = err else {
            panic!("expected a request failure, got {err:?}");
        };
        assert!(detail.contains(": "), "source chain missing: {detail}");
    }
}
