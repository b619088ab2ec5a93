//! HTTP API Client
//!
//! `reqwest` implementation of [`ChatApi`] against `{server}/api`.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    Conversation, ConversationDetail, CreateConversation, HealthStatus, ModelInfo,
    UpdateConversation,
};
use super::{ApiError, ChatApi};
use crate::messages::ConversationId;

/// REST client for the CrossClaw backend
#[derive(Clone, Debug)]
pub struct HttpApiClient {
    base: Url,
    http_client: reqwest::Client,
}

impl HttpApiClient {
    /// Create a client for the backend at `server_url`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built, or
    /// [`ApiError::InvalidUrl`] if `server_url` cannot carry a path.
    pub fn new(server_url: &Url) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder().build()?;
        Self::with_client(server_url, http_client)
    }

    /// Create a client reusing an existing `reqwest::Client`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `server_url` cannot carry a path.
    pub fn with_client(server_url: &Url, http_client: reqwest::Client) -> Result<Self, ApiError> {
        let mut base = server_url.clone();
        base.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(server_url.to_string()))?
            .pop_if_empty()
            .push("api");
        Ok(Self { base, http_client })
    }

    /// Base URL of the API (`{server}/api`)
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base.to_string()))?
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "API request");

        let mut request = self.http_client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<T, ApiError> {
        let bytes = self.send(method, segments, body).await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}

/// Placeholder body type for requests without one
const NO_BODY: Option<&()> = None;

#[async_trait]
impl ChatApi for HttpApiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        self.request(Method::GET, &["models"], NO_BODY).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.request(Method::GET, &["conversations"], NO_BODY).await
    }

    async fn get_conversation(&self, id: &ConversationId) -> Result<ConversationDetail, ApiError> {
        self.request(Method::GET, &["conversations", id.as_str()], NO_BODY)
            .await
    }

    async fn create_conversation(
        &self,
        request: &CreateConversation,
    ) -> Result<Conversation, ApiError> {
        self.request(Method::POST, &["conversations"], Some(request))
            .await
    }

    async fn update_conversation(
        &self,
        id: &ConversationId,
        request: &UpdateConversation,
    ) -> Result<Conversation, ApiError> {
        self.request(Method::PATCH, &["conversations", id.as_str()], Some(request))
            .await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ApiError> {
        // Body is informational only (`{"status":"deleted"}` or empty).
        self.send(Method::DELETE, &["conversations", id.as_str()], NO_BODY)
            .await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.request(Method::GET, &["health"], NO_BODY).await
    }
}
