//! HTTP client for the queue, tournament and logout endpoints
//!
//! Every endpoint answers with a small JSON body, including on 4xx
//! statuses, so the body is decoded whatever the status code.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use tracing::{debug, warn};

use super::config::ServerSettings;
use crate::core::constants::{
    tournament_join_endpoint, LOCAL_GAME_ENDPOINT, LOGOUT_ENDPOINT, QUEUE_JOIN_ENDPOINT,
};
use crate::core::error::ApiError;
use crate::core::io_traits::ApiClient;
use crate::core::protocol::ActionResponse;

pub struct HttpApiClient {
    client: Client,
    base_url: String,
    csrf_token: String,
    cookie: Option<String>,
}

impl HttpApiClient {
    pub fn new(settings: &ServerSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            csrf_token: settings.csrf_token.clone(),
            cookie: settings.cookie_header(),
        })
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> Result<ActionResponse, ApiError> {
        let url = self.endpoint_url(path);
        debug!(url = %url, "[HTTP] POST");

        let mut request = self
            .client
            .post(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(CONTENT_TYPE, "application/json")
            // Django checks the referer of HTTPS form posts
            .header(REFERER, format!("{}/", self.base_url));
        if !self.csrf_token.is_empty() {
            request = request.header("X-CSRFToken", &self.csrf_token);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        decode_body(&body).map_err(|e| {
            warn!(url = %url, status = %status, error = %e, "[HTTP] Unexpected response body");
            e
        })
    }
}

/// Decode an endpoint body
pub fn decode_body(body: &str) -> Result<ActionResponse, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

impl ApiClient for HttpApiClient {
    fn join_queue(&self) -> Result<ActionResponse, ApiError> {
        self.post(QUEUE_JOIN_ENDPOINT)
    }

    fn start_local_game(&self) -> Result<ActionResponse, ApiError> {
        self.post(LOCAL_GAME_ENDPOINT)
    }

    fn join_tournament(&self, tournament_id: &str) -> Result<ActionResponse, ApiError> {
        self.post(&tournament_join_endpoint(tournament_id))
    }

    fn logout(&self) -> Result<ActionResponse, ApiError> {
        self.post(LOGOUT_ENDPOINT)
    }
}
