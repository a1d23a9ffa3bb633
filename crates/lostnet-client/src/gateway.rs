//! Typed gateway to the lostnet backend.
//!
//! One method per remote capability, each returning a value or an
//! [`ApiError`] — never a raw transport error.  Responses arrive in a
//! `{ success, message, data }` envelope; the gateway unwraps `data`,
//! treating a missing entity as [`ApiError::NotFound`] and a missing list as
//! empty.  Item and profile writes are multipart: the textual fields travel
//! as one `data` JSON field, plus an optional binary `image` part.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use lostnet_shared::constants::API_PREFIX;
use lostnet_shared::error::ApiError;
use lostnet_shared::models::{
    ImageUpload, Item, ItemRequest, ItemStatus, NewItem, ProfileFields, User,
};
use lostnet_shared::types::{Credential, ItemId, UserId};

use crate::config::ClientConfig;

/// The remote operations the client core depends on.
///
/// Implemented by [`HttpGateway`] for the real backend; tests substitute an
/// in-memory fake.  The client runs on a single cooperative runtime, so the
/// returned futures are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError>;
    async fn get_item(&self, id: &ItemId) -> Result<Item, ApiError>;
    async fn get_user(&self, id: &UserId) -> Result<User, ApiError>;
    async fn list_items_by_user(&self, user_id: &UserId) -> Result<Vec<Item>, ApiError>;
    /// Requests against one item, each with its requester profile resolved.
    async fn list_requests_for_item(&self, item_id: &ItemId)
        -> Result<Vec<ItemRequest>, ApiError>;
    /// Requests one user has made, each with its item resolved.
    async fn list_requests_by_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ItemRequest>, ApiError>;

    async fn create_item(
        &self,
        item: &NewItem,
        image: Option<&ImageUpload>,
        credential: &Credential,
    ) -> Result<Item, ApiError>;
    async fn create_request(
        &self,
        item_id: &ItemId,
        requester: &UserId,
        credential: &Credential,
    ) -> Result<ItemRequest, ApiError>;
    /// Change an item's status.
    ///
    /// The only client-initiated transition is to [`ItemStatus::Delivered`];
    /// passing anything else is a caller bug and panics rather than reaching
    /// the network.
    async fn set_item_status(
        &self,
        item_id: &ItemId,
        status: ItemStatus,
        credential: &Credential,
    ) -> Result<Item, ApiError>;
    async fn delete_item(&self, item_id: &ItemId, credential: &Credential)
        -> Result<(), ApiError>;
    async fn update_user_profile(
        &self,
        user_id: &UserId,
        fields: &ProfileFields,
        image: Option<&ImageUpload>,
        credential: &Credential,
    ) -> Result<User, ApiError>;

    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError>;
    async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError>;
}

/// Standard response envelope used by every backend route.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    #[allow(dead_code)]
    success: Option<bool>,
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    data: Option<T>,
}

/// Error payload shape; the backend is not consistent about the field name.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: String,
}

/// [`RemoteApi`] implementation over the JSON-over-HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.server_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Unwrap a single-entity envelope; `data: null` means the record does
    /// not exist.
    async fn unwrap_entity<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Protocol(format!("malformed response envelope: {e}")))?;
        envelope
            .data
            .ok_or_else(|| ApiError::NotFound(format!("{what} not found")))
    }

    /// Unwrap a list envelope; `data: null` means no results, never an
    /// error.
    async fn unwrap_list<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, ApiError> {
        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }
        let envelope: ApiEnvelope<Vec<T>> = response
            .json()
            .await
            .map_err(|e| ApiError::Protocol(format!("malformed response envelope: {e}")))?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_failure(response).await)
        }
    }

    async fn read_failure(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .message
            .or(body.error)
            .unwrap_or_else(|| status.to_string());
        map_status(status, message)
    }

    fn multipart_form(
        data_json: String,
        image: Option<&ImageUpload>,
    ) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new().text("data", data_json);
        if let Some(image) = image {
            let part = reqwest::multipart::Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|e| ApiError::Validation(format!("invalid image content type: {e}")))?;
            form = form.part("image", part);
        }
        Ok(form)
    }
}

/// Map an HTTP failure status onto the error taxonomy.
fn map_status(status: reqwest::StatusCode, message: String) -> ApiError {
    use reqwest::StatusCode;

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthenticated,
        StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(message)
        }
        other => ApiError::Protocol(format!("unexpected status {other}: {message}")),
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else {
        ApiError::Network(err.to_string())
    }
}

impl RemoteApi for HttpGateway {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let response = self
            .http
            .get(self.url("/item"))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_list(response).await
    }

    async fn get_item(&self, id: &ItemId) -> Result<Item, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/item/get-single-item/{id}")))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "item").await
    }

    async fn get_user(&self, id: &UserId) -> Result<User, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/users/{id}")))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "user").await
    }

    async fn list_items_by_user(&self, user_id: &UserId) -> Result<Vec<Item>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/item/get-items-by-user/{user_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_list(response).await
    }

    async fn list_requests_for_item(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<ItemRequest>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/item-request/by-item/{item_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_list(response).await
    }

    async fn list_requests_by_requester(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ItemRequest>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/item-request/by-user/{user_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_list(response).await
    }

    async fn create_item(
        &self,
        item: &NewItem,
        image: Option<&ImageUpload>,
        credential: &Credential,
    ) -> Result<Item, ApiError> {
        let data = serde_json::to_string(item)
            .map_err(|e| ApiError::Validation(format!("unserializable item: {e}")))?;
        let form = Self::multipart_form(data, image)?;

        info!(title = %item.title, "Posting found item");

        let response = self
            .http
            .post(self.url("/item/post-item"))
            .bearer_auth(credential.token())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "item").await
    }

    async fn create_request(
        &self,
        item_id: &ItemId,
        requester: &UserId,
        credential: &Credential,
    ) -> Result<ItemRequest, ApiError> {
        info!(item = %item_id, requester = %requester, "Requesting item");

        let response = self
            .http
            .post(self.url("/item-request"))
            .bearer_auth(credential.token())
            .json(&serde_json::json!({
                "itemId": item_id,
                "requestedBy": requester,
            }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "item request").await
    }

    async fn set_item_status(
        &self,
        item_id: &ItemId,
        status: ItemStatus,
        credential: &Credential,
    ) -> Result<Item, ApiError> {
        assert_eq!(
            status,
            ItemStatus::Delivered,
            "clients may only set an item to Delivered"
        );

        info!(item = %item_id, "Marking item delivered");

        let response = self
            .http
            .patch(self.url(&format!("/item/{item_id}")))
            .bearer_auth(credential.token())
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "item").await
    }

    async fn delete_item(
        &self,
        item_id: &ItemId,
        credential: &Credential,
    ) -> Result<(), ApiError> {
        info!(item = %item_id, "Deleting item");

        let response = self
            .http
            .delete(self.url(&format!("/item/{item_id}")))
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport_error)?;
        Self::expect_success(response).await
    }

    async fn update_user_profile(
        &self,
        user_id: &UserId,
        fields: &ProfileFields,
        image: Option<&ImageUpload>,
        credential: &Credential,
    ) -> Result<User, ApiError> {
        let data = serde_json::to_string(fields)
            .map_err(|e| ApiError::Validation(format!("unserializable profile: {e}")))?;
        let form = Self::multipart_form(data, image)?;

        info!(user = %user_id, "Updating profile");

        let response = self
            .http
            .patch(self.url(&format!("/users/{user_id}")))
            .bearer_auth(credential.token())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        Self::unwrap_entity(response, "user").await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        debug!(email = %email, "Logging in");

        let response = self
            .http
            .post(self.url("/users/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;
        let data: LoginData = Self::unwrap_entity(response, "session").await?;
        Ok(Credential::new(data.access_token))
    }

    async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        debug!(email = %email, "Registering account");

        let response = self
            .http
            .post(self.url("/users/register"))
            .json(&serde_json::json!({
                "firstName": first_name,
                "lastName": last_name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::expect_success(response).await
    }
}
