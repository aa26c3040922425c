// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Oura Auth
//!
//! Authentication layer for the Oura Ring cloud API.
//!
//! ## Features
//!
//! - **Authorization code flow**: consent URL with anti-forgery state (and
//!   optional PKCE), code exchange
//! - **Delegated tokens**: bearer session that refreshes once on 401 and
//!   retries, reporting new tokens through a callback
//! - **Personal access tokens**: static token sent as a bearer header or as
//!   the legacy `access_token` query parameter
//! - **Revocation** for both token kinds
//!
//! Token storage is the caller's business: the delegated client hands every
//! refreshed pair to a [`delegated::TokenSink`] and keeps nothing on disk.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use oura_auth::delegated::DelegatedTokenClient;
//! use oura_auth::http::HttpMethod;
//! use oura_auth::models::Credentials;
//! use oura_auth::oauth2_client::{AuthorizationFlow, AuthorizationRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Credentials::new("client-id", Some("client-secret".to_string()));
//!
//!     let mut flow = AuthorizationFlow::new(credentials.clone());
//!     let auth = flow.authorization_url(AuthorizationRequest::default())?;
//!     println!("Visit {}", auth.url);
//!
//!     // ... receive `code` and `state` on the redirect, then:
//!     auth.verify_state("state-from-redirect")?;
//!     let token = flow.exchange_code("code-from-redirect").await?;
//!
//!     let client = DelegatedTokenClient::from_token_pair(credentials, &token)
//!         .with_token_sink(|token| println!("refreshed, expires at {:?}", token.expires_at));
//!     let response = client
//!         .request("https://api.ouraring.com/v2/usercollection/personal_info", HttpMethod::Get)
//!         .await?;
//!     println!("{}", response.text().await?);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

/// Application constants and environment variable names
pub mod constants;

/// Error types
pub mod errors;

/// Credentials, tokens, scopes and endpoints
pub mod models;

/// HTTP verbs and authenticated request construction
pub mod http;

/// OAuth2 authorization code flow and token refresh
pub mod oauth2_client;

/// Bearer-token client with refresh-and-retry
pub mod delegated;

/// Personal access token client
pub mod personal;

/// Configuration-driven client for the v2 API
pub mod client;

/// Configuration management and persistence
pub mod config;

/// Structured logging setup
pub mod logging;

pub use errors::{OuraError, Result};

/// Sends authenticated requests and revokes the credential it holds
#[async_trait]
pub trait AuthorizedClient: Send + Sync {
    async fn request(&self, url: &str, method: http::HttpMethod) -> Result<reqwest::Response>;

    async fn revoke_token(&self) -> Result<reqwest::Response>;

    /// Short label for logs
    fn auth_kind(&self) -> &'static str;
}
