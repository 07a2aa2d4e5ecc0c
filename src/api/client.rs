//! Client for the external property backend.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::ApiError;

use super::types::{PropertyFacts, PropertyInfo, UploadAck};

/// Narrow interface to the property backend — everything the wizard
/// needs from the outside world.
#[async_trait]
pub trait PropertyApi: Send + Sync {
    /// Look up a property by id or by a normalized address string.
    async fn fetch_property(&self, id: &str) -> Result<PropertyInfo, ApiError>;

    /// Fetch market analytics for a property's area.
    async fn fetch_facts(&self, id: &str) -> Result<PropertyFacts, ApiError>;

    /// Upload a condition photo/document for a property and step.
    async fn upload_file(
        &self,
        property_id: &str,
        step: usize,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadAck, ApiError>;

    /// Invalidate the current session.
    async fn logout(&self) -> Result<(), ApiError>;

    /// Change the account password.
    async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError>;
}

/// HTTP implementation backed by reqwest.
///
/// No retries and no request timeouts — every failure surfaces to the
/// user for explicit re-initiation.
pub struct HttpPropertyApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<SecretString>,
}

impl HttpPropertyApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    /// Attach a bearer token to every request.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        debug!(endpoint = %endpoint, "Backend GET");
        let response = self
            .authorize(self.client.get(self.url(endpoint)))
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        let response = Self::check_status(endpoint, response).await?;
        response.json().await.map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn post_empty(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        debug!(endpoint = %endpoint, "Backend POST");
        let mut req = self.authorize(self.client.post(self.url(endpoint)));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Self::check_status(endpoint, response).await?;
        Ok(())
    }
}

#[async_trait]
impl PropertyApi for HttpPropertyApi {
    async fn fetch_property(&self, id: &str) -> Result<PropertyInfo, ApiError> {
        let endpoint = format!("property/{id}");
        match self.get_json::<PropertyInfo>(&endpoint).await {
            Err(ApiError::Status { status: 404, .. }) => Err(ApiError::PropertyNotFound {
                id: id.to_string(),
            }),
            other => other,
        }
    }

    async fn fetch_facts(&self, id: &str) -> Result<PropertyFacts, ApiError> {
        self.get_json(&format!("property/{id}/facts")).await
    }

    async fn upload_file(
        &self,
        property_id: &str,
        step: usize,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadAck, ApiError> {
        let endpoint = format!("property/{property_id}/{step}/upload");
        debug!(endpoint = %endpoint, filename = %filename, size = bytes.len(), "Backend upload");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.client.post(self.url(&endpoint)))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        let response = Self::check_status(&endpoint, response).await?;
        response.json().await.map_err(|e| ApiError::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.post_empty("auth/logout", None).await
    }

    async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        self.post_empty(
            "auth/change-password",
            Some(serde_json::json!({
                "current_password": current,
                "new_password": new,
            })),
        )
        .await
    }
}
