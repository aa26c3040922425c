// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bearer-token client for users who went through the OAuth2 flow.
//!
//! The client owns the session tokens. A request answered with 401 triggers
//! one refresh through the token endpoint, the optional [`TokenSink`] is told
//! about the new pair, and the request is sent exactly once more. The session
//! lock is held across the refresh so concurrent callers hitting 401 at the
//! same time share a single refresh.

use crate::errors::{OuraError, Result};
use crate::http::{build_request, HttpMethod, RequestAuth};
use crate::models::{Credentials, OuraEndpoints, TokenPair};
use crate::oauth2_client::{HttpTokenRefresher, TokenRefresher};
use crate::AuthorizedClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Receives every refreshed token pair, synchronously and before the retry
pub type TokenSink = Arc<dyn Fn(&TokenPair) + Send + Sync>;

/// Copy of the tokens currently held by a [`DelegatedTokenClient`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSnapshot {
    fn access_token_if_valid(&self) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(at)) if at <= Utc::now() => None,
            (Some(token), _) => Some(token),
            (None, _) => None,
        }
    }
}

pub struct DelegatedTokenClient {
    credentials: Credentials,
    endpoints: OuraEndpoints,
    client: Client,
    refresher: Arc<dyn TokenRefresher>,
    custom_refresher: bool,
    token_sink: Option<TokenSink>,
    session: Mutex<TokenSnapshot>,
}

impl DelegatedTokenClient {
    /// At least one of `access_token` / `refresh_token` is required
    pub fn new(
        credentials: Credentials,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self> {
        if access_token.is_none() && refresh_token.is_none() {
            return Err(OuraError::Config(
                "An access token or a refresh token is required".into(),
            ));
        }

        Ok(Self::with_session(
            credentials,
            TokenSnapshot {
                access_token,
                refresh_token,
                expires_at: None,
            },
        ))
    }

    /// Start a session from the pair returned by the code exchange
    pub fn from_token_pair(credentials: Credentials, token: &TokenPair) -> Self {
        Self::with_session(
            credentials,
            TokenSnapshot {
                access_token: Some(token.access_token.clone()),
                refresh_token: token.refresh_token.clone(),
                expires_at: token.expires_at,
            },
        )
    }

    fn with_session(credentials: Credentials, session: TokenSnapshot) -> Self {
        let endpoints = OuraEndpoints::default();
        let client = Client::new();
        Self {
            refresher: Arc::new(HttpTokenRefresher::new(client.clone(), &endpoints.token_url)),
            custom_refresher: false,
            credentials,
            endpoints,
            client,
            token_sink: None,
            session: Mutex::new(session),
        }
    }

    pub fn with_token_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&TokenPair) + Send + Sync + 'static,
    {
        self.token_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_endpoints(mut self, endpoints: OuraEndpoints) -> Self {
        self.endpoints = endpoints;
        self.rebuild_refresher();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self.rebuild_refresher();
        self
    }

    /// Replace the token endpoint call, e.g. with a test double.
    /// Later endpoint or HTTP client changes leave it in place.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self.custom_refresher = true;
        self
    }

    fn rebuild_refresher(&mut self) {
        if !self.custom_refresher {
            self.refresher = Arc::new(HttpTokenRefresher::new(
                self.client.clone(),
                &self.endpoints.token_url,
            ));
        }
    }

    pub async fn token(&self) -> TokenSnapshot {
        self.session.lock().await.clone()
    }

    /// Send an authenticated request, refreshing and retrying once on 401.
    ///
    /// The retried response is returned as-is, even when it is another 401.
    pub async fn request(&self, url: &str, method: HttpMethod) -> Result<Response> {
        let (access_token, already_refreshed) = self.usable_access_token().await?;

        let response = self.send(url, method, &access_token).await?;
        if response.status() != StatusCode::UNAUTHORIZED || already_refreshed {
            return Ok(response);
        }

        debug!(%method, url, "Access token rejected, refreshing");
        let access_token = self.refresh_after_unauthorized(&access_token).await?;
        self.send(url, method, &access_token).await
    }

    /// Revoke the current access token
    pub async fn revoke_token(&self) -> Result<Response> {
        let access_token = self
            .session
            .lock()
            .await
            .access_token
            .clone()
            .ok_or(OuraError::MissingToken("access token"))?;

        let response = self
            .send(&self.endpoints.revoke_url, HttpMethod::Post, &access_token)
            .await?;
        info!(status = %response.status(), "Oura token revocation requested");
        Ok(response)
    }

    async fn send(&self, url: &str, method: HttpMethod, access_token: &str) -> Result<Response> {
        debug!(%method, url, auth = "bearer", "Sending Oura API request");
        let response = build_request(&self.client, method, url, RequestAuth::Bearer(access_token))
            .send()
            .await?;
        Ok(response)
    }

    /// Access token for the first attempt. The flag is set when a refresh
    /// already happened here, which uses up the single refresh of the call.
    async fn usable_access_token(&self) -> Result<(String, bool)> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.access_token_if_valid() {
            return Ok((token.to_string(), false));
        }

        debug!("No valid access token in session, refreshing before first attempt");
        let token = self.refresh_locked(&mut session).await?;
        Ok((token, true))
    }

    async fn refresh_after_unauthorized(&self, rejected: &str) -> Result<String> {
        let mut session = self.session.lock().await;

        // Another caller refreshed while this request was in flight
        if let Some(current) = &session.access_token {
            if current != rejected {
                return Ok(current.clone());
            }
        }

        self.refresh_locked(&mut session).await
    }

    async fn refresh_locked(&self, session: &mut TokenSnapshot) -> Result<String> {
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or_else(|| OuraError::Refresh("No refresh token available".into()))?;

        let refreshed = self.refresher.refresh(&self.credentials, &refresh_token).await;
        let mut token = match refreshed {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Oura token refresh failed");
                return Err(e);
            }
        };
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }

        session.access_token = Some(token.access_token.clone());
        session.refresh_token = token.refresh_token.clone();
        session.expires_at = token.expires_at;

        if let Some(sink) = &self.token_sink {
            sink(&token);
        }

        info!("Oura access token refreshed");
        Ok(token.access_token)
    }
}

#[async_trait]
impl AuthorizedClient for DelegatedTokenClient {
    async fn request(&self, url: &str, method: HttpMethod) -> Result<Response> {
        DelegatedTokenClient::request(self, url, method).await
    }

    async fn revoke_token(&self) -> Result<Response> {
        DelegatedTokenClient::revoke_token(self).await
    }

    fn auth_kind(&self) -> &'static str {
        "oauth2"
    }
}
