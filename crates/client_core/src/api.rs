//! HTTP client for the remote service.
//!
//! All bodies are JSON. Protected calls carry the session credential as
//! `Authorization: Token <token>`, which is the scheme the service hands
//! out at login/register. Failures are never retried automatically; the
//! caller surfaces them and the user retries.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::UserId,
    error::ApiError,
    protocol::{
        AuthResponse, LoginRequest, MessageWire, ProfileRecord, RegisterRequest,
        SendMessageRequest,
    },
};
use tracing::{debug, info};
use url::Url;

use crate::{error::ClientError, session::Session};

pub struct ApiClient {
    http: Client,
    server_url: String,
}

impl ApiClient {
    /// Build a client for the given base address, e.g.
    /// `http://127.0.0.1:8000`. Trailing slashes are tolerated.
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        let server_url = server_url.into();
        let parsed = Url::parse(&server_url)
            .map_err(|e| ClientError::InvalidServerUrl(format!("{server_url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ClientError::InvalidServerUrl(format!(
                "{server_url}: scheme must be http or https"
            )));
        }
        Ok(Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/register/", self.server_url))
            .json(&request)
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        info!(username = %auth.username, "registered new account");
        Ok(Session::new(auth.token, auth.username))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/login/", self.server_url))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        info!(username = %auth.username, "logged in");
        Ok(Session::new(auth.token, auth.username))
    }

    pub async fn fetch_me(&self, session: &Session) -> Result<ProfileRecord, ClientError> {
        let response = self
            .authed(session, self.http.get(format!("{}/api/me/", self.server_url)))
            .send()
            .await?;
        decode(response).await
    }

    /// Fetch every message visible to the authenticated user, in server
    /// order. The permissive wire shape is validated later, at ingest.
    pub async fn fetch_messages(&self, session: &Session) -> Result<Vec<MessageWire>, ClientError> {
        let response = self
            .authed(
                session,
                self.http.get(format!("{}/api/messages/", self.server_url)),
            )
            .send()
            .await?;
        let batch: Vec<MessageWire> = decode(response).await?;
        debug!(count = batch.len(), "fetched message feed");
        Ok(batch)
    }

    pub async fn search_profiles(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<ProfileRecord>, ClientError> {
        let response = self
            .authed(
                session,
                self.http
                    .get(format!("{}/api/profiles/", self.server_url))
                    .query(&[("search", query)]),
            )
            .send()
            .await?;
        decode(response).await
    }

    /// Dispatch one message. The service echoes the created record back;
    /// the body is ignored because the follow-up feed re-pull is the
    /// authoritative view.
    pub async fn send_message(
        &self,
        session: &Session,
        receiver: UserId,
        text: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .authed(
                session,
                self.http.post(format!("{}/api/messages/", self.server_url)),
            )
            .json(&SendMessageRequest {
                receiver,
                text: text.to_string(),
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        info!(receiver = receiver.0, "message dispatched");
        Ok(())
    }

    fn authed(&self, session: &Session, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Token {}", session.token()))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status, response).await);
    }
    Ok(response.json().await?)
}

/// Decode a non-success response into the service's error payload when
/// possible, falling back to the raw body.
async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|payload| payload.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
    ClientError::Api { status, message }
}
