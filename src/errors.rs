// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types shared by the authorization flow and both request clients.

use reqwest::StatusCode;

/// Errors surfaced by the Oura authentication clients
#[derive(Debug, thiserror::Error)]
pub enum OuraError {
    /// The provider rejected an authorization code or a personal token
    #[error("Authorization rejected by provider ({status}): {message}")]
    Auth { status: StatusCode, message: String },

    /// The refresh token was rejected; the user has to authorize again
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The token endpoint answered 2xx with a body we could not read
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Missing token: {0}")]
    MissingToken(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OuraError {
    /// True when the session cannot recover without a new authorization
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, OuraError::Refresh(_) | OuraError::Auth { .. })
    }
}

pub type Result<T> = std::result::Result<T, OuraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = OuraError::Auth {
            status: StatusCode::BAD_REQUEST,
            message: "invalid_grant".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("invalid_grant"));
    }

    #[test]
    fn test_requires_reauthorization() {
        assert!(OuraError::Refresh("revoked".into()).requires_reauthorization());
        assert!(!OuraError::MissingToken("access token").requires_reauthorization());
        assert!(!OuraError::Config("bad".into()).requires_reauthorization());
    }
}
