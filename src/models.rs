// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Credentials, tokens and endpoint descriptions shared by all clients.

use crate::constants::oauth;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Application credentials issued by the Oura developer portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    /// Required for code exchange; optional when only refreshing public clients
    pub client_secret: Option<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }
}

/// Access/refresh token pair as returned by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

/// Wire shape of the token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenResponse> for TokenPair {
    fn from(response: TokenResponse) -> Self {
        // Lifetimes chrono cannot represent are treated as unknown expiry
        let expires_at = response.expires_in.and_then(|seconds| {
            Duration::try_seconds(seconds).and_then(|d| Utc::now().checked_add_signed(d))
        });

        TokenPair {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token,
            expires_at,
            scope: response.scope,
        }
    }
}

/// Set of permissions requested during authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Space-separated form used in the `scope` query parameter
    pub fn to_query_value(&self) -> String {
        self.0.join(" ")
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(oauth::DEFAULT_SCOPES)
    }
}

/// OAuth endpoints used by the clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuraEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
}

impl OuraEndpoints {
    /// All three endpoints rooted at one base, e.g. a local mock server
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}{}", oauth::AUTHORIZE_PATH),
            token_url: format!("{base}{}", oauth::TOKEN_PATH),
            revoke_url: format!("{base}{}", oauth::REVOKE_PATH),
        }
    }
}

impl Default for OuraEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: oauth::AUTHORIZE_URL.to_string(),
            token_url: oauth::TOKEN_URL.to_string(),
            revoke_url: oauth::REVOKE_URL.to_string(),
        }
    }
}
