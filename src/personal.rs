// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Client for a static personal access token.

use crate::constants::oauth;
use crate::errors::{OuraError, Result};
use crate::http::{build_request, HttpMethod, RequestAuth};
use crate::AuthorizedClient;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the personal token goes on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStyle {
    /// `?access_token=<token>`; older integrations still send it this way
    QueryParameter,
    /// `Authorization: Bearer <token>`
    #[default]
    BearerHeader,
}

/// Holds one personal access token for its whole lifetime. There is no
/// refresh: once the token is revoked every request fails with
/// [`OuraError::Auth`].
pub struct PersonalTokenClient {
    token: String,
    auth_style: AuthStyle,
    revoke_url: String,
    client: Client,
}

impl PersonalTokenClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            auth_style: AuthStyle::default(),
            revoke_url: oauth::REVOKE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_auth_style(mut self, auth_style: AuthStyle) -> Self {
        self.auth_style = auth_style;
        self
    }

    pub fn with_revoke_url(mut self, revoke_url: impl Into<String>) -> Self {
        self.revoke_url = revoke_url.into();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn auth_style(&self) -> AuthStyle {
        self.auth_style
    }

    /// Send with the configured [`AuthStyle`]
    pub async fn request(&self, url: &str, method: HttpMethod) -> Result<Response> {
        self.request_with_style(url, method, self.auth_style).await
    }

    pub async fn request_with_style(
        &self,
        url: &str,
        method: HttpMethod,
        style: AuthStyle,
    ) -> Result<Response> {
        let auth = match style {
            AuthStyle::QueryParameter => RequestAuth::QueryToken(&self.token),
            AuthStyle::BearerHeader => RequestAuth::Bearer(&self.token),
        };

        debug!(%method, url, auth = ?style, "Sending Oura API request");
        let response = build_request(&self.client, method, url, auth).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(OuraError::Auth { status, message });
        }
        Ok(response)
    }

    /// Revoke the token; always uses the bearer header
    pub async fn revoke_token(&self) -> Result<Response> {
        let response = self
            .request_with_style(&self.revoke_url, HttpMethod::Post, AuthStyle::BearerHeader)
            .await?;
        info!(status = %response.status(), "Personal access token revocation requested");
        Ok(response)
    }
}

#[async_trait]
impl AuthorizedClient for PersonalTokenClient {
    async fn request(&self, url: &str, method: HttpMethod) -> Result<Response> {
        PersonalTokenClient::request(self, url, method).await
    }

    async fn revoke_token(&self) -> Result<Response> {
        PersonalTokenClient::revoke_token(self).await
    }

    fn auth_kind(&self) -> &'static str {
        "personal_access_token"
    }
}
