// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for personal access token authentication and the
//! configuration-driven client

use anyhow::Result;
use mockito::{Matcher, Server};
use oura_auth::client::{OuraClient, SummaryKind, SummaryQuery};
use oura_auth::config::OuraConfig;
use oura_auth::http::HttpMethod;
use oura_auth::personal::{AuthStyle, PersonalTokenClient};
use oura_auth::OuraError;
use serde_json::json;

const API_PATH: &str = "/v2/usercollection/daily_sleep";

fn mock_daily_sleep_response() -> serde_json::Value {
    json!({
        "data": [
            {"id": "sleep-1", "day": "2024-01-15", "score": 82}
        ],
        "next_token": null
    })
}

#[tokio::test]
async fn test_query_and_header_styles_produce_different_requests() -> Result<()> {
    let mut server = Server::new_async().await;

    let query_style = server
        .mock("GET", API_PATH)
        .match_query(Matcher::UrlEncoded("access_token".into(), "personal_token".into()))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(mock_daily_sleep_response().to_string())
        .expect(1)
        .create_async()
        .await;

    let header_style = server
        .mock("GET", API_PATH)
        .match_header("authorization", "Bearer personal_token")
        .with_status(200)
        .with_body(mock_daily_sleep_response().to_string())
        .expect(1)
        .create_async()
        .await;

    let client = PersonalTokenClient::new("personal_token");
    let url = format!("{}{}", server.url(), API_PATH);

    let legacy = client
        .request_with_style(&url, HttpMethod::Get, AuthStyle::QueryParameter)
        .await?;
    assert_eq!(legacy.status().as_u16(), 200);

    let current = client
        .request_with_style(&url, HttpMethod::Get, AuthStyle::BearerHeader)
        .await?;
    assert_eq!(current.status().as_u16(), 200);

    query_style.assert_async().await;
    header_style.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_configured_style_is_used_by_request() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", API_PATH)
        .match_query(Matcher::UrlEncoded("access_token".into(), "personal_token".into()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = PersonalTokenClient::new("personal_token").with_auth_style(AuthStyle::QueryParameter);
    client
        .request(&format!("{}{}", server.url(), API_PATH), HttpMethod::Post)
        .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_revoked_personal_token_fails_with_auth_error() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", API_PATH)
        .with_status(401)
        .with_body(json!({"detail": "Unauthorized"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = PersonalTokenClient::new("revoked_token");
    let err = client
        .request(&format!("{}{}", server.url(), API_PATH), HttpMethod::Get)
        .await
        .unwrap_err();

    assert!(matches!(err, OuraError::Auth { .. }));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_other_error_statuses_are_returned() -> Result<()> {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", API_PATH)
        .with_status(429)
        .create_async()
        .await;

    let client = PersonalTokenClient::new("personal_token");
    let response = client
        .request(&format!("{}{}", server.url(), API_PATH), HttpMethod::Get)
        .await?;

    assert_eq!(response.status().as_u16(), 429);
    Ok(())
}

#[tokio::test]
async fn test_personal_revoke_issues_single_bearer_post() -> Result<()> {
    let mut server = Server::new_async().await;

    let revoke = server
        .mock("POST", "/oauth/revoke")
        .match_header("authorization", "Bearer personal_token")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    // Revocation always uses the header, whatever style is configured
    let client = PersonalTokenClient::new("personal_token")
        .with_auth_style(AuthStyle::QueryParameter)
        .with_revoke_url(format!("{}/oauth/revoke", server.url()));

    let response = client.revoke_token().await?;
    assert_eq!(response.status().as_u16(), 200);
    revoke.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_oura_client_summary_from_config() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start_date".into(), "2024-01-15".into()),
            Matcher::UrlEncoded("end_date".into(), "2024-01-16".into()),
        ]))
        .match_header("authorization", "Bearer personal_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_daily_sleep_response().to_string())
        .expect(1)
        .create_async()
        .await;

    let config = OuraConfig {
        personal_access_token: Some("personal_token".to_string()),
        api_base: Some(format!("{}/v2/usercollection", server.url())),
        request_timeout_secs: Some(5),
        ..OuraConfig::default()
    };
    let client = OuraClient::from_config(&config, None)?;

    let query = SummaryQuery {
        start: Some("2024-01-15".to_string()),
        end: Some("2024-01-16".to_string()),
        next_token: None,
    };
    let response = client.summary(SummaryKind::DailySleep, &query).await?;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["data"][0]["id"], "sleep-1");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_oura_client_revoke_with_delegated_config() -> Result<()> {
    let mut server = Server::new_async().await;

    let revoke = server
        .mock("POST", "/oauth/revoke")
        .match_header("authorization", "Bearer delegated_access")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = OuraConfig {
        client_id: Some("client".to_string()),
        client_secret: Some("secret".to_string()),
        access_token: Some("delegated_access".to_string()),
        refresh_token: Some("delegated_refresh".to_string()),
        oauth_base: Some(server.url()),
        ..OuraConfig::default()
    };
    let client = OuraClient::from_config(&config, None)?;
    assert_eq!(client.auth_kind(), "oauth2");

    client.revoke_token().await?;
    revoke.assert_async().await;
    Ok(())
}
