//! API client for the Erasmos backend.
//!
//! Token renewal is a single attempt with no retry; the session coordinator
//! treats any failure as terminal for the session.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, info};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the companion backend
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
/// Renewal runs at most two minutes before expiry, so it has to fail well inside that.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the token renewal endpoint, relative to the base URL
const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: String,
}

/// API client for the Erasmos backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let token = self.token.as_ref().ok_or(ApiError::MissingToken)?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Exchange the current bearer token for a newly issued one.
    pub async fn refresh_token(&self) -> Result<String> {
        let url = self.url(REFRESH_TOKEN_PATH);
        debug!(url = %url, "Requesting token renewal");

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to send token refresh request")?;

        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .context("Failed to read token refresh response")?;

        let token = Self::parse_refresh_response(&text)?;
        info!("Bearer token renewed");
        Ok(token)
    }

    fn parse_refresh_response(body: &str) -> Result<String> {
        let parsed: RefreshResponse =
            serde_json::from_str(body).context("Failed to parse token refresh response")?;
        if parsed.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("empty token in refresh response".to_string()).into());
        }
        Ok(parsed.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("https://erasmos.example/api/").expect("client");
        assert_eq!(client.url(REFRESH_TOKEN_PATH), "https://erasmos.example/api/auth/refresh-token");
    }

    #[test]
    fn test_auth_headers_require_token() {
        let client = ApiClient::new(DEFAULT_API_BASE_URL).expect("client");
        let err = client.auth_headers().expect_err("no token set");
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::MissingToken)));

        let client = client.with_token("abc.def.ghi".to_string());
        let headers = client.auth_headers().expect("headers");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc.def.ghi");
    }

    #[test]
    fn test_parse_refresh_response() {
        let token = ApiClient::parse_refresh_response(r#"{"token":"a.b.c","message":"ok"}"#)
            .expect("valid response");
        assert_eq!(token, "a.b.c");

        assert!(ApiClient::parse_refresh_response(r#"{"token":""}"#).is_err());
        assert!(ApiClient::parse_refresh_response(r#"{"message":"nope"}"#).is_err());
    }
}
