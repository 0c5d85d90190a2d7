use crate::errors::RelayError;
use crate::metrics_defs::{UPSTREAM_DURATION, UPSTREAM_REQUESTS};
use axum::extract::FromRequestParts;
use bytes::Bytes;
use http::header::COOKIE;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{counter, histogram};
use std::convert::Infallible;
use std::time::{Duration, Instant};
use url::Url;

/// The browser's `Cookie` header, forwarded verbatim to the resource API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardedCookie(Option<HeaderValue>);

impl ForwardedCookie {
    pub fn new(value: HeaderValue) -> Self {
        match value.is_empty() {
            true => Self(None),
            false => Self(Some(value)),
        }
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// Multiple `Cookie` headers are joined the way HTTP/2 peers split them.
    /// Values are copied as bytes, so cookies that are not UTF-8 survive.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut joined: Vec<u8> = Vec::new();
        for value in headers.get_all(COOKIE).iter().filter(|value| !value.is_empty()) {
            if !joined.is_empty() {
                joined.extend_from_slice(b"; ");
            }
            joined.extend_from_slice(value.as_bytes());
        }

        match HeaderValue::from_bytes(&joined) {
            Ok(value) => Self::new(value),
            Err(_) => Self(None),
        }
    }

    pub fn header_value(&self) -> Option<&HeaderValue> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for ForwardedCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Status and fully buffered body of a resource API response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    path: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// An empty body or a JSON `null` yields `None`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, RelayError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice::<Option<T>>(&self.body).map_err(|source| {
            RelayError::UnexpectedBody {
                path: self.path.clone(),
                source,
            }
        })
    }
}

/// Client for the resource API. Every call is a single round trip with no
/// retries; the timeout covers connect, send and body read.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub async fn get(
        &self,
        path: &str,
        cookie: &ForwardedCookie,
    ) -> Result<UpstreamResponse, RelayError> {
        self.send::<()>(Method::GET, path, cookie, None).await
    }

    pub async fn post<T: Serialize>(
        &self,
        path: &str,
        cookie: &ForwardedCookie,
        body: &T,
    ) -> Result<UpstreamResponse, RelayError> {
        self.send(Method::POST, path, cookie, Some(body)).await
    }

    pub async fn put<T: Serialize>(
        &self,
        path: &str,
        cookie: &ForwardedCookie,
        body: &T,
    ) -> Result<UpstreamResponse, RelayError> {
        self.send(Method::PUT, path, cookie, Some(body)).await
    }

    pub async fn delete(
        &self,
        path: &str,
        cookie: &ForwardedCookie,
    ) -> Result<UpstreamResponse, RelayError> {
        self.send::<()>(Method::DELETE, path, cookie, None).await
    }

    async fn send<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        cookie: &ForwardedCookie,
        body: Option<&T>,
    ) -> Result<UpstreamResponse, RelayError> {
        let mut url = self.base_url.clone();
        url.set_path(path);

        let mut request = self.client.request(method.clone(), url);
        if let Some(value) = cookie.header_value() {
            request = request.header(COOKIE, value.clone());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = Self::execute(request, path).await;

        let outcome = match &result {
            Ok(response) => response.status.as_u16().to_string(),
            Err(_) => "error".to_string(),
        };
        histogram!(UPSTREAM_DURATION, "method" => method.to_string())
            .record(start.elapsed().as_secs_f64());
        counter!(UPSTREAM_REQUESTS, "method" => method.to_string(), "status" => outcome)
            .increment(1);

        if let Err(e) = &result {
            tracing::warn!(%method, path, error = %e, "Resource API call did not complete");
        }
        result
    }

    async fn execute(
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<UpstreamResponse, RelayError> {
        let upstream = |source| RelayError::Upstream {
            path: path.to_string(),
            source,
        };

        let response = request.send().await.map_err(upstream)?;
        let status = response.status();
        let body = response.bytes().await.map_err(upstream)?;

        Ok(UpstreamResponse {
            status,
            body,
            path: path.to_string(),
        })
    }
}
