// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Request construction shared by the delegated and personal clients.

use crate::constants::{api, oauth};
use crate::errors::{OuraError, Result};
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP verbs the Oura API is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = OuraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(OuraError::Config(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// How a credential is attached to an outbound request
#[derive(Debug, Clone, Copy)]
pub enum RequestAuth<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// `?access_token=<token>`
    QueryToken(&'a str),
}

/// Build one authenticated request
pub fn build_request(
    client: &Client,
    method: HttpMethod,
    url: &str,
    auth: RequestAuth<'_>,
) -> RequestBuilder {
    let request = client.request(method.into(), url);
    match auth {
        RequestAuth::Bearer(token) => request.bearer_auth(token),
        RequestAuth::QueryToken(token) => request.query(&[(oauth::ACCESS_TOKEN_PARAM, token)]),
    }
}

/// Shared HTTP client; `timeout` bounds the whole round trip when set
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(api::USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("DELETE".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn test_bearer_request_shape() {
        let client = Client::new();
        let request = build_request(
            &client,
            HttpMethod::Post,
            "https://api.ouraring.com/v2/usercollection/sleep",
            RequestAuth::Bearer("tok"),
        )
        .build()
        .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok"
        );
        assert!(request.url().query().is_none());
    }

    #[test]
    fn test_query_token_request_shape() {
        let client = Client::new();
        let request = build_request(
            &client,
            HttpMethod::Get,
            "https://api.ouraring.com/v2/usercollection/sleep?start_date=2024-01-01",
            RequestAuth::QueryToken("tok"),
        )
        .build()
        .unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert!(request.headers().get("authorization").is_none());
        assert_eq!(
            request.url().query(),
            Some("start_date=2024-01-01&access_token=tok")
        );
    }
}
