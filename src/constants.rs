// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Oura endpoints, OAuth defaults and the environment variables read by
//! the configuration loader.

/// Oura OAuth2 endpoints and defaults
pub mod oauth {
    /// User-facing consent page
    pub const AUTHORIZE_URL: &str = "https://cloud.ouraring.com/oauth/authorize";

    /// Code exchange and refresh
    pub const TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";

    pub const REVOKE_URL: &str = "https://api.ouraring.com/oauth/revoke";

    pub const AUTHORIZE_PATH: &str = "/oauth/authorize";
    pub const TOKEN_PATH: &str = "/oauth/token";
    pub const REVOKE_PATH: &str = "/oauth/revoke";

    /// Permissions requested when the caller does not pick its own
    pub const DEFAULT_SCOPES: [&str; 8] = [
        "email",
        "personal",
        "daily",
        "heartrate",
        "workout",
        "tag",
        "session",
        "resilience",
    ];

    /// Length of the anti-forgery `state` value
    pub const STATE_LENGTH: usize = 30;

    /// PKCE verifier length (RFC 7636 allows 43-128)
    pub const CODE_VERIFIER_LENGTH: usize = 64;

    /// Query parameter name used by the legacy personal token style
    pub const ACCESS_TOKEN_PARAM: &str = "access_token";
}

/// Oura v2 REST API
pub mod api {
    pub const USERCOLLECTION_BASE: &str = "https://api.ouraring.com/v2/usercollection";

    pub const USER_AGENT: &str = concat!("oura-auth/", env!("CARGO_PKG_VERSION"));
}

/// Environment variable names understood by the configuration loader
pub mod env_config {
    pub const CLIENT_ID: &str = "OURA_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "OURA_CLIENT_SECRET";
    pub const ACCESS_TOKEN: &str = "OURA_ACCESS_TOKEN";
    pub const REFRESH_TOKEN: &str = "OURA_REFRESH_TOKEN";
    pub const PERSONAL_ACCESS_TOKEN: &str = "OURA_PERSONAL_ACCESS_TOKEN";
    pub const REDIRECT_URI: &str = "OURA_REDIRECT_URI";
    pub const SCOPES: &str = "OURA_SCOPES";
    pub const REQUEST_TIMEOUT_SECS: &str = "OURA_REQUEST_TIMEOUT_SECS";
    pub const API_BASE: &str = "OURA_API_BASE";

    /// Default local port for the authorization callback listener
    pub fn callback_port() -> u16 {
        std::env::var("OURA_CALLBACK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080)
    }
}
