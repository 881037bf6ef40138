//! Single chokepoint for outbound API requests.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use panel_core::{PanelError, PanelResult};

use crate::token_store::TokenStore;
use crate::transport::{HttpTransport, OutboundRequest, TransportError};

/// Service-level secret header, distinct from the user credential.
pub const SECRET_HEADER: &str = "x-api-secret";

/// Whether a request should carry the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Attach `Authorization: Bearer` when a credential is stored. Without
    /// one the request goes out unauthenticated and the server decides.
    Credential,
    /// Never attach the credential (login, registration).
    Skip,
}

/// Path below the API base, as segments plus query pairs.
///
/// Segments are percent-encoded when the URL is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiPath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ApiPath {
    pub fn new(resource: &str) -> Self {
        Self::default().segment(resource)
    }

    pub fn segment(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn resolve(&self, base: &Url) -> PanelResult<Url> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                PanelError::configuration(format!("API URL cannot be a base: {base}"))
            })?;
            segments.pop_if_empty();
            segments.extend(self.segments.iter());
        }
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl From<&str> for ApiPath {
    fn from(value: &str) -> Self {
        value
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(ApiPath::default(), |path, segment| path.segment(segment))
    }
}

impl core::fmt::Display for ApiPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// A response the server produced, 2xx or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body; `null` when empty or not JSON.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The decoded body's `error` field, if any.
    pub fn error_message(&self) -> Option<String> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
    }

    /// Success body, or a server error carrying the body's message (or `fallback`).
    pub fn into_result(self, fallback: &str) -> PanelResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(PanelError::server(
                self.error_message().unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }

    /// Like [`Self::into_result`], then decode the body.
    pub fn decode<T: DeserializeOwned>(self, fallback: &str) -> PanelResult<T> {
        let body = self.into_result(fallback)?;
        serde_json::from_value(body)
            .map_err(|e| PanelError::server(format!("unexpected response: {e}")))
    }
}

pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    api_secret: String,
    tokens: TokenStore,
}

impl ApiGateway {
    /// `api_base` must already be normalized (see `PanelConfig::api_base`).
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_base: &str,
        api_secret: impl Into<String>,
        tokens: TokenStore,
    ) -> PanelResult<Self> {
        let base_url = Url::parse(api_base)
            .map_err(|e| PanelError::configuration(format!("invalid API URL '{api_base}': {e}")))?;

        Ok(Self {
            transport,
            base_url,
            api_secret: api_secret.into(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue one request.
    ///
    /// Non-2xx responses are returned as-is for the caller to interpret; only
    /// a missing response becomes an error. No retry.
    pub async fn request(
        &self,
        method: Method,
        path: &ApiPath,
        body: Option<&Value>,
        auth: Auth,
    ) -> PanelResult<ApiResponse> {
        let url = path.resolve(&self.base_url)?;
        let request_id = Uuid::now_v7();
        let span = tracing::info_span!(
            "api_request",
            %request_id,
            method = %method,
            path = %url.path(),
        );

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (SECRET_HEADER.to_string(), self.api_secret.clone()),
        ];
        if auth == Auth::Credential {
            if let Some(credential) = self.tokens.get() {
                headers.push(("Authorization".to_string(), credential.bearer_header()));
            }
        }

        let outbound = OutboundRequest {
            method,
            url,
            headers,
            body: body.map(|b| b.to_string().into_bytes()),
        };

        async move {
            match self.transport.send(outbound).await {
                Ok(raw) => {
                    tracing::debug!(status = raw.status, "response received");
                    let body = if raw.body.is_empty() {
                        Value::Null
                    } else {
                        serde_json::from_slice(&raw.body).unwrap_or(Value::Null)
                    };
                    Ok(ApiResponse {
                        status: raw.status,
                        body,
                    })
                }
                Err(TransportError::NoResponse(reason)) => {
                    tracing::warn!("request failed without response: {reason}");
                    Err(PanelError::network(reason))
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn get(&self, path: &ApiPath) -> PanelResult<ApiResponse> {
        self.request(Method::GET, path, None, Auth::Credential).await
    }

    pub async fn post(&self, path: &ApiPath, body: &Value) -> PanelResult<ApiResponse> {
        self.request(Method::POST, path, Some(body), Auth::Credential)
            .await
    }

    pub async fn patch(&self, path: &ApiPath, body: &Value) -> PanelResult<ApiResponse> {
        self.request(Method::PATCH, path, Some(body), Auth::Credential)
            .await
    }

    pub async fn delete(&self, path: &ApiPath) -> PanelResult<ApiResponse> {
        self.request(Method::DELETE, path, None, Auth::Credential)
            .await
    }
}
