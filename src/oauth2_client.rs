// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! OAuth2 authorization code flow for the Oura cloud API.
//!
//! [`AuthorizationFlow`] is meant to be used once per user: build the consent
//! URL, send the user there, then exchange the returned code for a
//! [`TokenPair`]. The refresh grant lives here too so that the delegated
//! client can swap it out through [`TokenRefresher`].

use crate::constants::oauth;
use crate::errors::{OuraError, Result};
use crate::models::{Credentials, OuraEndpoints, Scope, TokenPair, TokenResponse};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

/// PKCE parameters for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkceParams {
    pub code_verifier: String,
    /// SHA256 of the verifier, base64url without padding
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl PkceParams {
    pub fn generate() -> Self {
        const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
        let mut rng = rand::thread_rng();
        let code_verifier: String = (0..oauth::CODE_VERIFIER_LENGTH)
            .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
            .collect();

        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".into(),
        }
    }
}

/// Options for one authorization URL
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    /// Falls back to [`Scope::default`] when `None`
    pub scope: Option<Scope>,
    pub redirect_uri: Option<String>,
    /// Appended verbatim after the standard parameters
    pub extra_params: Vec<(String, String)>,
}

/// Consent URL plus the anti-forgery state the provider must echo back
#[derive(Debug, Clone)]
pub struct AuthorizationUrl {
    pub url: String,
    pub state: String,
}

impl AuthorizationUrl {
    pub fn verify_state(&self, returned: &str) -> Result<()> {
        if returned == self.state {
            Ok(())
        } else {
            Err(OuraError::Config(
                "OAuth state mismatch: possible cross-site request forgery".into(),
            ))
        }
    }
}

/// One-time authorization for a user: consent URL and code exchange
pub struct AuthorizationFlow {
    credentials: Credentials,
    endpoints: OuraEndpoints,
    client: Client,
    redirect_uri: Option<String>,
    pkce: Option<PkceParams>,
    use_pkce: bool,
}

impl AuthorizationFlow {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoints: OuraEndpoints::default(),
            client: Client::new(),
            redirect_uri: None,
            pkce: None,
            use_pkce: false,
        }
    }

    pub fn with_endpoints(mut self, endpoints: OuraEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Add a PKCE challenge to every authorization URL built afterwards
    pub fn with_pkce(mut self) -> Self {
        self.use_pkce = true;
        self
    }

    /// Build the URL the user visits to grant access.
    ///
    /// The redirect URI (if any) and the PKCE verifier are remembered for
    /// [`AuthorizationFlow::exchange_code`].
    pub fn authorization_url(&mut self, request: AuthorizationRequest) -> Result<AuthorizationUrl> {
        let scope = request.scope.unwrap_or_default();
        let state = generate_state();

        let mut url = Url::parse(&self.endpoints.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.credentials.client_id);
            if let Some(redirect_uri) = &request.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            query
                .append_pair("scope", &scope.to_query_value())
                .append_pair("state", &state);

            if self.use_pkce {
                let pkce = PkceParams::generate();
                query
                    .append_pair("code_challenge", &pkce.code_challenge)
                    .append_pair("code_challenge_method", &pkce.code_challenge_method);
                self.pkce = Some(pkce);
            }

            for (key, value) in &request.extra_params {
                query.append_pair(key, value);
            }
        }

        if request.redirect_uri.is_some() {
            self.redirect_uri = request.redirect_uri;
        }

        debug!(scope = %scope.to_query_value(), pkce = self.use_pkce, "Built Oura authorization URL");

        Ok(AuthorizationUrl {
            url: url.to_string(),
            state,
        })
    }

    /// Exchange an authorization code for the initial token pair
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair> {
        let client_secret = self
            .credentials
            .client_secret
            .as_deref()
            .ok_or_else(|| OuraError::Config("Client secret is required to exchange a code".into()))?;

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", client_secret),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }
        if let Some(pkce) = &self.pkce {
            params.push(("code_verifier", pkce.code_verifier.as_str()));
        }

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "Oura rejected authorization code");
            return Err(OuraError::Auth { status, message });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OuraError::InvalidTokenResponse(e.to_string()))?;

        info!("Oura authorization code exchanged");
        Ok(token.into())
    }
}

fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(oauth::STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Run the refresh grant against `token_url`.
///
/// Any non-2xx answer or unreadable body is a [`OuraError::Refresh`]. When the
/// provider does not rotate the refresh token, the one sent is kept.
pub async fn refresh_token_pair(
    client: &Client,
    token_url: &str,
    credentials: &Credentials,
    refresh_token: &str,
) -> Result<TokenPair> {
    let mut params = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", credentials.client_id.as_str()),
    ];
    if let Some(secret) = &credentials.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    let response = client.post(token_url).form(&params).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OuraError::Refresh(format!("{status}: {body}")));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| OuraError::Refresh(format!("Parse error: {e}")))?;

    let mut token = TokenPair::from(token);
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }
    Ok(token)
}

/// Obtains a new token pair from a refresh token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, credentials: &Credentials, refresh_token: &str) -> Result<TokenPair>;
}

/// [`TokenRefresher`] backed by the provider's token endpoint
pub struct HttpTokenRefresher {
    client: Client,
    token_url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, credentials: &Credentials, refresh_token: &str) -> Result<TokenPair> {
        refresh_token_pair(&self.client, &self.token_url, credentials, refresh_token).await
    }
}
