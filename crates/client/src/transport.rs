//! HTTP transport boundary.
//!
//! The gateway builds fully-formed requests; a transport only moves bytes.
//! [`ReqwestTransport`] talks to a real server, [`ScriptedTransport`] answers
//! from a script and records what it was asked.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// A request ready to be sent.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server never produced a response.
    #[error("no response: {0}")]
    NoResponse(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport over `reqwest`.
///
/// No timeout and no retry: a hung server keeps the call pending.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::NoResponse(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::NoResponse(e.to_string()))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Respond {
        status: u16,
        body: Value,
        delay: Option<Duration>,
    },
    Fail(String),
}

/// In-memory transport that replies from per-route scripts.
///
/// Routes are keyed by method and URL path (query ignored). Each route
/// replays its queue in order and then keeps repeating the last reply.
/// Unscripted routes answer `404 {"error":"not found"}`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    sent: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Script a JSON reply for `method path`.
    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push(
            method,
            path,
            Reply::Respond {
                status,
                body,
                delay: None,
            },
        );
        self
    }

    /// Script a JSON reply that is held back for `delay` before completing.
    pub fn on_delayed(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: Value,
        delay: Duration,
    ) -> &Self {
        self.push(
            method,
            path,
            Reply::Respond {
                status,
                body,
                delay: Some(delay),
            },
        );
        self
    }

    /// Script a transport failure (no response) for `method path`.
    pub fn fail(&self, method: Method, path: &str, reason: &str) -> &Self {
        self.push(method, path, Reply::Fail(reason.to_string()));
        self
    }

    /// Every request sent so far, in send order.
    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Requests sent to one path.
    pub fn sent_to(&self, method: &Method, path: &str) -> Vec<OutboundRequest> {
        self.sent()
            .into_iter()
            .filter(|r| &r.method == method && r.url.path() == path)
            .collect()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let queue = routes.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let reply = self.next_reply(&request.method, request.url.path());
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match reply {
            Some(Reply::Respond {
                status,
                body,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(RawResponse {
                    status,
                    body: body.to_string().into_bytes(),
                })
            }
            Some(Reply::Fail(reason)) => Err(TransportError::NoResponse(reason)),
            None => Ok(RawResponse {
                status: 404,
                body: br#"{"error":"not found"}"#.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, url: &str) -> OutboundRequest {
        OutboundRequest {
            method,
            url: Url::parse(url).unwrap(),
            headers: vec![("X-Api-Secret".to_string(), "s".to_string())],
            body: Some(br#"{"a":1}"#.to_vec()),
        }
    }

    #[tokio::test]
    async fn scripted_routes_replay_then_repeat_last() {
        let transport = ScriptedTransport::new();
        transport
            .on(Method::GET, "/api/me", 401, json!({"error": "expired"}))
            .on(Method::GET, "/api/me", 200, json!({"user": {}}));

        let first = transport.send(request(Method::GET, "http://h/api/me")).await.unwrap();
        let second = transport.send(request(Method::GET, "http://h/api/me")).await.unwrap();
        let third = transport.send(request(Method::GET, "http://h/api/me?x=1")).await.unwrap();

        assert_eq!(first.status, 401);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 200);
        assert_eq!(transport.sent_to(&Method::GET, "/api/me").len(), 3);
    }

    #[tokio::test]
    async fn unscripted_route_is_not_found() {
        let transport = ScriptedTransport::new();
        let response = transport.send(request(Method::POST, "http://h/api/nope")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn scripted_failure_has_no_response() {
        let transport = ScriptedTransport::new();
        transport.fail(Method::POST, "/api/login", "connection refused");

        let err = transport
            .send(request(Method::POST, "http://h/api/login"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::NoResponse("connection refused".to_string()));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = request(Method::GET, "http://h/api/me");
        assert_eq!(req.header("x-api-secret"), Some("s"));
        assert_eq!(req.json_body(), Some(json!({"a": 1})));
    }
}
