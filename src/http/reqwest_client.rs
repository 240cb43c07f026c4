//! Production HTTP client backed by reqwest

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};

use super::client::{HttpClient, HttpRequest, HttpResponse, Method};

/// [`HttpClient`] implementation over a shared `reqwest::Client`
///
/// Connection pooling, TLS and redirects are left to reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
    default_timeout_ms: u64,
}

impl ReqwestClient {
    /// Build a client from the `[http]` config section
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid header value for '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_timeout_ms: config.timeout_secs.saturating_mul(1000),
        })
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    fn map_error(error: reqwest::Error, timeout_ms: u64) -> Error {
        if error.is_timeout() {
            return Error::Timeout(timeout_ms);
        }
        if error.is_connect() {
            return Error::RequestFailed(format!("connection failed: {}", error));
        }
        if error.is_builder() {
            return Error::RequestFailed(format!("invalid request: {}", error));
        }
        Error::RequestFailed(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let timeout_ms = request
            .timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(self.default_timeout_ms);

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout_ms))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(timeout_ms)
            } else {
                Error::RequestFailed(format!("malformed response body: {}", e))
            }
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_rejects_invalid_default_header() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let config = HttpConfig {
            headers,
            ..HttpConfig::default()
        };
        assert!(matches!(ReqwestClient::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = HttpConfig {
            timeout_secs: u64::MAX,
            ..HttpConfig::default()
        };
        let client = ReqwestClient::new(&config).unwrap();
        assert_eq!(client.default_timeout_ms, u64::MAX);
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_failed() {
        let client = ReqwestClient::new(&HttpConfig::default()).unwrap();
        // Port 9 (discard) is essentially never listening on loopback
        let err = client
            .send(HttpRequest::new(Method::Get, "http://127.0.0.1:9/objects"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
