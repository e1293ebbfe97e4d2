//! Typed HTTP client for the lobby and room endpoints.

use nocturne_types::api::{
    EndRequest, EndResponse, EndTrigger, ErrorBody, JoinRequest, JoinResponse, LeaveRequest,
    LeaveResponse, LimitRequest, LimitResponse, MatchRequest, MatchResponse, RoomStatusResponse,
    StatusResponse,
};
use nocturne_types::{Identity, Preference};
use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server refused the request ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("WebSocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// The machine-readable error code, when the server sent a structured
    /// refusal.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Client for the HTTP side of the protocol. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current window phase and server-local clock.
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let url = format!("{}/api/status", self.base_url);
        let response = self.http.get(&url).send().await?;
        handle_response(response).await
    }

    /// Enter tonight's queue. The returned entry id names this attendance.
    pub async fn join(
        &self,
        token: &str,
        identity: Identity,
        preference: Preference,
    ) -> Result<JoinResponse, ClientError> {
        let url = format!("{}/api/join", self.base_url);
        let body = JoinRequest {
            token: token.to_string(),
            identity: identity.as_str().to_string(),
            preference: preference.as_str().to_string(),
        };
        let response = self.http.post(&url).json(&body).send().await?;
        handle_response(response).await
    }

    pub async fn leave(&self, entry_id: Uuid) -> Result<LeaveResponse, ClientError> {
        let url = format!("{}/api/leave", self.base_url);
        let body = LeaveRequest { entry_id };
        let response = self.http.post(&url).json(&body).send().await?;
        handle_response(response).await
    }

    /// One matching attempt. `room_id` stays null until a counterpart is
    /// found.
    pub async fn attempt_match(&self, entry_id: Uuid) -> Result<MatchResponse, ClientError> {
        let url = format!("{}/api/match", self.base_url);
        let body = MatchRequest { entry_id };
        let response = self.http.post(&url).json(&body).send().await?;
        handle_response(response).await
    }

    pub async fn end_room(
        &self,
        room_id: Uuid,
        token: &str,
        trigger: EndTrigger,
    ) -> Result<EndResponse, ClientError> {
        let url = format!("{}/api/end", self.base_url);
        let body = EndRequest {
            room_id,
            token: token.to_string(),
            trigger,
        };
        let response = self.http.post(&url).json(&body).send().await?;
        handle_response(response).await
    }

    /// How many self-ends the token has left tonight.
    pub async fn limit(&self, token: &str) -> Result<LimitResponse, ClientError> {
        let url = format!("{}/api/limit", self.base_url);
        let body = LimitRequest {
            token: token.to_string(),
        };
        let response = self.http.post(&url).json(&body).send().await?;
        handle_response(response).await
    }

    pub async fn room_status(&self, room_id: Uuid) -> Result<RoomStatusResponse, ClientError> {
        let url = format!("{}/api/rooms/{}", self.base_url, room_id);
        let response = self.http.get(&url).send().await?;
        handle_response(response).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => Err(ClientError::Api {
            status: status.as_u16(),
            code: body.error.code,
            message: body.error.message,
        }),
        Err(e) => Err(ClientError::Protocol(format!(
            "unreadable error body for status {}: {}",
            status.as_u16(),
            e
        ))),
    }
}
