//! HTTP client for the back-office API.

use crate::error::RemoteError;
use crate::service::{DirectoryService, PermissionService, SignInService};
use crate::types::{DirectoryPage, ErrorBody, RoleEnvelope, SignInGrant};
use async_trait::async_trait;
use frontdesk_core::RoleId;
use reqwest::{RequestBuilder, Response};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// HTTP implementation of the remote service traits.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g. "http://localhost:8000/api").
    pub fn new(base_url: impl Into<String>) -> Result<Self, Report<RemoteError>> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::ClientSetup {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<Response, Report<RemoteError>> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::RequestFailed {
                endpoint: endpoint.to_string(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Error bodies are best effort; a missing or malformed body still
        // yields a rejection carrying the status.
        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
            .and_then(|body| body.message);

        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        }
        .into())
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<T, Report<RemoteError>> {
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::RequestFailed {
                endpoint: endpoint.to_string(),
                details: e.to_string(),
            })?;

        serde_json::from_str(&body).map_err(|e| {
            RemoteError::InvalidResponse {
                endpoint: endpoint.to_string(),
                details: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl PermissionService for RemoteClient {
    #[instrument(skip(self, token), fields(role = %role))]
    async fn role_permissions(
        &self,
        token: &str,
        role: RoleId,
    ) -> Result<Vec<String>, Report<RemoteError>> {
        let endpoint = format!("roles/{role}");
        let request = self.http.get(self.url(&endpoint)).bearer_auth(token);
        let response = self.send(request, &endpoint).await?;
        let envelope: RoleEnvelope = Self::decode(response, &endpoint).await?;

        let names = envelope.into_role().permission_names();
        debug!(count = names.len(), "role permissions fetched");
        Ok(names)
    }
}

#[async_trait]
impl DirectoryService for RemoteClient {
    #[instrument(skip(self, token))]
    async fn directory_page(
        &self,
        token: &str,
        page: u32,
    ) -> Result<DirectoryPage, Report<RemoteError>> {
        let endpoint = format!("employees?page={page}");
        let request = self.http.get(self.url(&endpoint)).bearer_auth(token);
        let response = self.send(request, &endpoint).await?;
        let listing: DirectoryPage = Self::decode(response, &endpoint).await?;

        debug!(
            rows = listing.data.len(),
            last_page = listing.last_page,
            "directory page fetched"
        );
        Ok(listing)
    }
}

#[async_trait]
impl SignInService for RemoteClient {
    #[instrument(skip(self, password))]
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInGrant, Report<RemoteError>> {
        let endpoint = "login";
        let request = self.http.post(self.url(endpoint)).json(&serde_json::json!({
            "email": email,
            "password": password,
        }));
        let response = self.send(request, endpoint).await?;
        let grant: SignInGrant = Self::decode(response, endpoint).await?;

        debug!(user = %grant.user.id, "signed in");
        Ok(grant)
    }
}
