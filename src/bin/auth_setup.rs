// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command line helper: authorize against Oura, call the API, revoke tokens

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oura_auth::client::OuraClient;
use oura_auth::config::OuraConfig;
use oura_auth::constants::env_config;
use oura_auth::delegated::TokenSink;
use oura_auth::http::HttpMethod;
use oura_auth::logging;
use oura_auth::models::{Credentials, OuraEndpoints, Scope, TokenPair};
use oura_auth::oauth2_client::{AuthorizationFlow, AuthorizationRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use url::Url;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "oura-auth")]
#[command(about = "Authorize against the Oura API and make authenticated requests")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the OAuth2 authorization code flow and store the tokens
    Authorize {
        #[arg(long)]
        client_id: String,

        #[arg(long)]
        client_secret: String,

        /// Callback port (default: OURA_CALLBACK_PORT or 8080)
        #[arg(long)]
        port: Option<u16>,

        /// Requested scopes; the default set when omitted
        #[arg(long = "scope")]
        scopes: Vec<String>,

        #[arg(long)]
        pkce: bool,
    },
    /// Authenticated GET
    Get { url: String },
    /// Authenticated POST
    Post { url: String },
    /// Revoke the configured token
    Revoke,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Authorize {
            client_id,
            client_secret,
            port,
            scopes,
            pkce,
        } => {
            let port = port.unwrap_or_else(env_config::callback_port);
            authorize(cli.config, client_id, client_secret, port, scopes, pkce).await?;
        }
        Commands::Get { url } => send(cli.config, &url, HttpMethod::Get).await?,
        Commands::Post { url } => send(cli.config, &url, HttpMethod::Post).await?,
        Commands::Revoke => revoke(cli.config).await?,
    }

    Ok(())
}

async fn authorize(
    config_path: Option<String>,
    client_id: String,
    client_secret: String,
    port: u16,
    scopes: Vec<String>,
    pkce: bool,
) -> Result<()> {
    info!("Setting up Oura OAuth2 authentication...");

    let mut config = OuraConfig::load(config_path.clone()).unwrap_or_default();
    let redirect_uri = format!("http://localhost:{port}/callback");
    let scope = if scopes.is_empty() {
        config.scope()
    } else {
        Scope::new(scopes)
    };

    let credentials = Credentials::new(client_id.clone(), Some(client_secret.clone()));
    let mut flow = AuthorizationFlow::new(credentials);
    if let Some(base) = &config.oauth_base {
        flow = flow.with_endpoints(OuraEndpoints::with_base(base));
    }
    if pkce {
        flow = flow.with_pkce();
    }

    let auth = flow.authorization_url(AuthorizationRequest {
        scope: Some(scope.clone()),
        redirect_uri: Some(redirect_uri.clone()),
        extra_params: Vec::new(),
    })?;

    println!("\nPlease visit this URL to authorize the application:");
    println!("{}\n", auth.url);

    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .with_context(|| format!("Failed to bind callback port {port}"))?;
    info!("Listening for OAuth callback on port {}", port);

    let params = match tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(listener)).await {
        Ok(params) => params?,
        Err(_) => {
            error!("No authorization code received within timeout");
            return Err(anyhow::anyhow!("OAuth2 authorization timed out"));
        }
    };

    let returned_state = params.get("state").map(String::as_str).unwrap_or_default();
    auth.verify_state(returned_state)?;

    let code = params
        .get("code")
        .context("Callback did not include an authorization code")?;

    info!("Received authorization code, exchanging for tokens...");
    let token = flow.exchange_code(code).await?;

    config.client_id = Some(client_id);
    config.client_secret = Some(client_secret);
    config.redirect_uri = Some(redirect_uri);
    config.scopes = Some(scope.values().to_vec());
    config.apply_token(&token);
    config.save(config_path)?;

    println!("\nOura authentication successful!");
    println!("Configuration saved.");
    Ok(())
}

/// Accept one redirect and return its query parameters
async fn wait_for_callback(listener: TcpListener) -> Result<HashMap<String, String>> {
    let (socket, _) = listener.accept().await?;
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let path = line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;
    let url = Url::parse(&format!("http://localhost{path}"))?;
    let params: HashMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let body = if params.contains_key("code") {
        "<h1>Authorization successful!</h1><p>You can close this window and return to the terminal.</p>"
    } else {
        "<h1>Authorization failed</h1><p>No code was returned.</p>"
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = writer.write_all(response.as_bytes()).await {
        warn!("Failed to answer the browser callback: {e}");
    }

    Ok(params)
}

/// Writes refreshed tokens back to the config file
fn persisting_sink(config: OuraConfig, path: Option<String>) -> TokenSink {
    let config = Arc::new(Mutex::new(config));
    Arc::new(move |token: &TokenPair| {
        let Ok(mut guard) = config.lock() else {
            error!("Config lock poisoned, refreshed token not saved");
            return;
        };
        guard.apply_token(token);
        if let Err(e) = guard.save(path.clone()) {
            error!("Failed to save refreshed token: {e:#}");
        }
    })
}

async fn send(config_path: Option<String>, url: &str, method: HttpMethod) -> Result<()> {
    let config = OuraConfig::load(config_path.clone())?;
    let sink = persisting_sink(config.clone(), config_path);
    let client = OuraClient::from_config(&config, Some(sink))?;

    let response = client.request(url, method).await?;
    let status = response.status();
    let body = response.text().await?;

    println!("{status}");
    println!("{body}");
    Ok(())
}

async fn revoke(config_path: Option<String>) -> Result<()> {
    let config = OuraConfig::load(config_path)?;
    let client = OuraClient::from_config(&config, None)?;

    let response = client.revoke_token().await?;
    println!("Revocation returned {}", response.status());
    Ok(())
}
