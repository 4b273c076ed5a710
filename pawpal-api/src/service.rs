//! Messaging transport.
//!
//! [`MessageService`] is the seam the view-models depend on;
//! [`HttpMessageService`] talks to the PawPal REST API.

use crate::error::{ApiError, Result};
use crate::models::{Message, SendMessageRequest};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Longest server error body carried into an [`ApiError::Status`] message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Operations the messaging screens need from the backend.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// All conversations of the signed-in user, as raw payloads.
    ///
    /// Payloads are returned unnormalized; see [`crate::normalize`].
    async fn list_conversations(&self) -> Result<Vec<Value>>;

    /// Message history between the signed-in user and `other_party_id`
    /// about one pet, oldest first.
    async fn get_thread(&self, other_party_id: &str, subject_pet_id: i64) -> Result<Vec<Message>>;

    /// Send a message and return it as stored by the server.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message>;

    /// Mark every message of a thread addressed to the signed-in user as read.
    async fn mark_thread_read(&self, other_party_id: &str, subject_pet_id: i64) -> Result<()>;
}

/// List endpoints answer either with a bare array or with a paginated
/// envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Paginated { results: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) | ListBody::Paginated { results: items } => items,
        }
    }
}

/// [`MessageService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpMessageService {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpMessageService {
    /// Create a client rooted at `base_url` (e.g. `https://pawpal.example/api`).
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pawpal-messages/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Build an endpoint URL from path segments, with the trailing slash the
    /// API expects. Segments are percent-encoded, so opaque ids are safe.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the status and body of a successful
    /// response.
    async fn execute(&self, builder: RequestBuilder) -> Result<(u16, String)> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            tracing::debug!("Request failed with {}: {}", status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok((status.as_u16(), body))
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let (status, body) = self.execute(builder).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            status,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MessageService for HttpMessageService {
    async fn list_conversations(&self) -> Result<Vec<Value>> {
        let url = self.endpoint(&["messages", "conversations"])?;
        let body: ListBody<Value> = self.execute_json(self.request(Method::GET, url)).await?;
        let conversations = body.into_vec();
        tracing::debug!("Fetched {} conversation payloads", conversations.len());
        Ok(conversations)
    }

    async fn get_thread(&self, other_party_id: &str, subject_pet_id: i64) -> Result<Vec<Message>> {
        let pet = subject_pet_id.to_string();
        let url = self.endpoint(&["messages", "conversation", other_party_id, &pet])?;
        let body: ListBody<Message> = self.execute_json(self.request(Method::GET, url)).await?;
        let messages = body.into_vec();
        tracing::debug!(
            "Fetched {} messages for thread ({}, {})",
            messages.len(),
            other_party_id,
            subject_pet_id
        );
        Ok(messages)
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        let url = self.endpoint(&["messages", "send"])?;
        let message: Message = self
            .execute_json(self.request(Method::POST, url).json(request))
            .await?;
        tracing::info!(
            "Sent message {} to {} about pet {}",
            message.id,
            request.receiver_username,
            request.subject_pet_id
        );
        Ok(message)
    }

    async fn mark_thread_read(&self, other_party_id: &str, subject_pet_id: i64) -> Result<()> {
        let pet = subject_pet_id.to_string();
        let url = self.endpoint(&["messages", "mark-read", other_party_id, &pet])?;
        self.execute(self.request(Method::POST, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_building() {
        let service = HttpMessageService::new("https://pawpal.example/api", None).unwrap();
        assert_eq!(
            service.endpoint(&["messages", "conversations"]).unwrap().as_str(),
            "https://pawpal.example/api/messages/conversations/"
        );

        let service = HttpMessageService::new("https://pawpal.example/api/", None).unwrap();
        assert_eq!(
            service
                .endpoint(&["messages", "conversation", "a b/c", "7"])
                .unwrap()
                .as_str(),
            "https://pawpal.example/api/messages/conversation/a%20b%2Fc/7/"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            HttpMessageService::new("not a url", None),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpMessageService::new("mailto:team@pawpal.example", None),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_list_body_shapes() {
        let plain: ListBody<Value> = serde_json::from_value(json!([{"id": 1}])).unwrap();
        assert_eq!(plain.into_vec().len(), 1);

        let paginated: ListBody<Value> =
            serde_json::from_value(json!({"count": 2, "results": [{"id": 1}, {"id": 2}]})).unwrap();
        assert_eq!(paginated.into_vec().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        // Port 9 on localhost is reserved for discard and is normally closed.
        let service = HttpMessageService::new("http://127.0.0.1:9/api", None).unwrap();
        let err = service.list_conversations().await.unwrap_err();
        assert_eq!(err.status(), None);
    }
}
