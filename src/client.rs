//! HTTP client for the comment board API.
//!
//! [`HttpCommentService`] implements [`CommentService`] over the REST routes
//! served by [`crate::api`]. Every request carries the acting user in
//! `X-Actor-Id`, plus a bearer token when an API key is configured.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::ACTOR_HEADER;
use crate::config::Config;
use crate::error::CommentError;
use crate::models::*;
use crate::service::CommentService;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key or actor missing or invalid")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<ClientError> for CommentError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::NotFound(_) | ClientError::BadRequest(_) => {
                CommentError::Validation(e.to_string())
            }
            ClientError::Unauthorized | ClientError::Forbidden(_) => {
                CommentError::Permission(e.to_string())
            }
            ClientError::Http(_) | ClientError::Server(_) => CommentError::Transport(e.to_string()),
        }
    }
}

/// HTTP client for the comment board API.
#[derive(Debug, Clone)]
pub struct HttpCommentService {
    base_url: String,
    api_key: Option<String>,
    actor_id: ActorId,
    client: Client,
}

impl HttpCommentService {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.actor_id.clone(),
        )
    }

    /// Create with explicit configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        actor_id: impl Into<ActorId>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            actor_id: actor_id.into(),
            client: Client::new(),
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Build a request with actor and optional auth headers.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method, &url)
            .header(ACTOR_HEADER, &self.actor_id);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Map a non-success status to a ClientError.
    async fn error_for(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::BadRequest(body)
            }
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(body),
            _ => ClientError::Server(format!("{}: {}", status, body)),
        }
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    /// Handle response that may return empty body (204 No Content).
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ClientError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }

    // ============================================================
    // Comment Operations
    // ============================================================

    pub async fn list_comments(&self, board: BoardId) -> Result<Vec<CommentRecord>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/boards/{}/comments", board))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn post_comment(
        &self,
        board: BoardId,
        input: &CreateCommentInput,
    ) -> Result<CommentRecord, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/boards/{}/comments", board))
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn put_comment(
        &self,
        board: BoardId,
        id: CommentId,
        input: &UpdateCommentInput,
    ) -> Result<CommentRecord, ClientError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/boards/{}/comments/{}", board, id),
            )
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn remove_comment(&self, board: BoardId, id: CommentId) -> Result<(), ClientError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/boards/{}/comments/{}", board, id),
            )
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    /// Download a persisted attachment's raw bytes.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/files/{}", file_id))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(Self::error_for(response).await)
        }
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.request(reqwest::Method::GET, "/health").send().await?;
        self.handle_empty_response(response).await
    }
}

#[async_trait]
impl CommentService for HttpCommentService {
    async fn fetch_comments(&self, board: BoardId) -> Result<Vec<CommentRecord>, CommentError> {
        Ok(self.list_comments(board).await?)
    }

    async fn create_comment(
        &self,
        board: BoardId,
        input: CreateCommentInput,
    ) -> Result<CommentRecord, CommentError> {
        Ok(self.post_comment(board, &input).await?)
    }

    async fn update_comment(
        &self,
        board: BoardId,
        id: CommentId,
        input: UpdateCommentInput,
    ) -> Result<CommentRecord, CommentError> {
        Ok(self.put_comment(board, id, &input).await?)
    }

    async fn delete_comment(&self, board: BoardId, id: CommentId) -> Result<(), CommentError> {
        Ok(self.remove_comment(board, id).await?)
    }
}
