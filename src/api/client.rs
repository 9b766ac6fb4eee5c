//! API client for the protected resource server.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the resource API. Every outbound request gets a bearer
//! header injected from the session (unless the caller supplied its own
//! Authorization value), and a 403 response triggers the silent
//! renew-and-retry protocol: exactly one `Session::renew`, and on its
//! success exactly one re-issue of the request with the fresh token.

use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::Session;
use crate::config::AuthConfig;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the protected resource server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and Session is a shared handle.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Session,
    base_url: String,
}

impl ApiClient {
    /// Create a client bound to a session.
    ///
    /// No cookie jar here: the refresh credential stays with the auth
    /// client, the resource API only ever sees the bearer header.
    pub fn new(session: Session, config: &AuthConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            session,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None, None).await?;
        response.json().await.map_err(ApiError::from)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|error| ApiError::InvalidResponse(error.to_string()))?;
        let response = self.send(Method::POST, path, Some(body), None).await?;
        response.json().await.map_err(ApiError::from)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::DELETE, path, None, None).await?;
        response.json().await.map_err(ApiError::from)
    }

    /// Issue a GET with a caller-supplied Authorization value.
    ///
    /// The session's bearer is not injected and the supplied value is never
    /// overwritten - callers may intentionally send unauthenticated or
    /// differently-authenticated requests. A 403 still takes the
    /// renew-and-retry path, re-issuing the identical request.
    pub async fn get_with_authorization<T: DeserializeOwned>(
        &self,
        path: &str,
        authorization: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .send(Method::GET, path, None, Some(authorization))
            .await?;
        response.json().await.map_err(ApiError::from)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        authorization: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        // Explicit per-request retry flag: at most one renew-and-retry per
        // logical request, no matter how often the server answers 403.
        let mut retried = false;

        loop {
            let mut request = self.client.request(method.clone(), &url);

            request = match authorization {
                Some(value) => request.header(header::AUTHORIZATION, value),
                // A missing session is not special-cased: the empty bearer
                // draws an ordinary 403, renewal fails too, and the original
                // error surfaces through the same path.
                None => request.header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", self.session.access_token().unwrap_or_default()),
                ),
            };

            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::FORBIDDEN && !retried {
                retried = true;
                debug!(%url, "403 from API, attempting token renewal");
                if self.session.renew().await {
                    // Loop re-reads the session token, so the retry carries
                    // a freshly injected header.
                    continue;
                }
            }

            return Self::check_response(response).await;
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
