// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Entry point that picks the right auth client from configuration and
//! addresses the v2 `usercollection` endpoints.
//!
//! Responses are handed back untouched; decoding the payloads is left to the
//! caller.

use crate::config::OuraConfig;
use crate::constants::api;
use crate::delegated::{DelegatedTokenClient, TokenSink};
use crate::errors::{OuraError, Result};
use crate::http::{build_http_client, HttpMethod};
use crate::models::{Credentials, OuraEndpoints};
use crate::personal::PersonalTokenClient;
use crate::AuthorizedClient;
use reqwest::Response;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Collections under `/v2/usercollection`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    DailyActivity,
    DailyReadiness,
    DailySleep,
    DailySpo2,
    DailyStress,
    EnhancedTag,
    Heartrate,
    PersonalInfo,
    RestModePeriod,
    RingConfiguration,
    Session,
    Sleep,
    SleepTime,
    Workout,
    DailyResilience,
}

impl SummaryKind {
    pub fn path(self) -> &'static str {
        match self {
            SummaryKind::DailyActivity => "daily_activity",
            SummaryKind::DailyReadiness => "daily_readiness",
            SummaryKind::DailySleep => "daily_sleep",
            SummaryKind::DailySpo2 => "daily_spo2",
            SummaryKind::DailyStress => "daily_stress",
            SummaryKind::EnhancedTag => "enhanced_tag",
            SummaryKind::Heartrate => "heartrate",
            SummaryKind::PersonalInfo => "personal_info",
            SummaryKind::RestModePeriod => "rest_mode_period",
            SummaryKind::RingConfiguration => "ring_configuration",
            SummaryKind::Session => "session",
            SummaryKind::Sleep => "sleep",
            SummaryKind::SleepTime => "sleep_time",
            SummaryKind::Workout => "workout",
            SummaryKind::DailyResilience => "daily_resilience",
        }
    }

    /// Heart rate is queried by datetime, everything else by date
    fn range_keys(self) -> (&'static str, &'static str) {
        match self {
            SummaryKind::Heartrate => ("start_datetime", "end_datetime"),
            _ => ("start_date", "end_date"),
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Optional range and continuation token for a summary request
#[derive(Debug, Clone, Default)]
pub struct SummaryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub next_token: Option<String>,
}

pub struct OuraClient {
    auth: Box<dyn AuthorizedClient>,
    api_base: String,
}

impl OuraClient {
    pub fn new(auth: Box<dyn AuthorizedClient>) -> Self {
        Self {
            auth,
            api_base: api::USERCOLLECTION_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build from configuration. A personal access token takes precedence
    /// over OAuth2 credentials when both are present.
    pub fn from_config(config: &OuraConfig, token_sink: Option<TokenSink>) -> Result<Self> {
        let http = build_http_client(config.request_timeout_secs.map(Duration::from_secs))?;
        let endpoints = config
            .oauth_base
            .as_deref()
            .map(OuraEndpoints::with_base)
            .unwrap_or_default();

        let auth: Box<dyn AuthorizedClient> = if let Some(pat) = &config.personal_access_token {
            Box::new(
                PersonalTokenClient::new(pat.clone())
                    .with_auth_style(config.auth_style.unwrap_or_default())
                    .with_revoke_url(endpoints.revoke_url)
                    .with_http_client(http),
            )
        } else if let Some(client_id) = &config.client_id {
            let credentials = Credentials::new(client_id.clone(), config.client_secret.clone());
            let mut client = DelegatedTokenClient::new(
                credentials,
                config.access_token.clone(),
                config.refresh_token.clone(),
            )?
            .with_endpoints(endpoints)
            .with_http_client(http);
            if let Some(sink) = token_sink {
                client = client.with_token_sink(move |token| sink(token));
            }
            Box::new(client)
        } else {
            return Err(OuraError::Config(
                "Either a personal access token or a client id is required".into(),
            ));
        };

        debug!(auth = auth.auth_kind(), "Oura client configured");

        let mut client = Self::new(auth);
        if let Some(api_base) = &config.api_base {
            client = client.with_api_base(api_base.clone());
        }
        Ok(client)
    }

    pub fn auth_kind(&self) -> &'static str {
        self.auth.auth_kind()
    }

    pub fn summary_url(&self, kind: SummaryKind, query: &SummaryQuery) -> Result<String> {
        let mut url = Url::parse(&format!("{}/{}", self.api_base.trim_end_matches('/'), kind))?;

        let (start_key, end_key) = kind.range_keys();
        let params: Vec<(&str, &str)> = [
            (start_key, query.start.as_deref()),
            (end_key, query.end.as_deref()),
            ("next_token", query.next_token.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.to_string())
    }

    pub async fn summary(&self, kind: SummaryKind, query: &SummaryQuery) -> Result<Response> {
        let url = self.summary_url(kind, query)?;
        self.auth.request(&url, HttpMethod::Get).await
    }

    /// Any URL, authenticated the same way as the summaries
    pub async fn request(&self, url: &str, method: HttpMethod) -> Result<Response> {
        self.auth.request(url, method).await
    }

    pub async fn revoke_token(&self) -> Result<Response> {
        self.auth.revoke_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personal_client() -> OuraClient {
        OuraClient::new(Box::new(PersonalTokenClient::new("pat")))
    }

    #[test]
    fn test_summary_url_without_params() {
        let url = personal_client()
            .summary_url(SummaryKind::PersonalInfo, &SummaryQuery::default())
            .unwrap();
        assert_eq!(url, "https://api.ouraring.com/v2/usercollection/personal_info");
    }

    #[test]
    fn test_summary_url_with_dates() {
        let query = SummaryQuery {
            start: Some("2024-01-01".into()),
            end: Some("2024-01-07".into()),
            next_token: None,
        };
        let url = personal_client()
            .summary_url(SummaryKind::DailySleep, &query)
            .unwrap();
        assert_eq!(
            url,
            "https://api.ouraring.com/v2/usercollection/daily_sleep?start_date=2024-01-01&end_date=2024-01-07"
        );
    }

    #[test]
    fn test_heartrate_uses_datetime_keys() {
        let query = SummaryQuery {
            start: Some("2024-01-01T00:00:00".into()),
            end: None,
            next_token: Some("abc".into()),
        };
        let url = personal_client()
            .summary_url(SummaryKind::Heartrate, &query)
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("start_datetime".to_string(), "2024-01-01T00:00:00".to_string()),
                ("next_token".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_config_prefers_personal_token() {
        let config = OuraConfig {
            client_id: Some("client".into()),
            access_token: Some("access".into()),
            personal_access_token: Some("pat".into()),
            ..OuraConfig::default()
        };
        let client = OuraClient::from_config(&config, None).unwrap();
        assert_eq!(client.auth_kind(), "personal_access_token");
    }

    #[test]
    fn test_from_config_delegated() {
        let config = OuraConfig {
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            refresh_token: Some("refresh".into()),
            api_base: Some("http://localhost:9000/v2/usercollection".into()),
            ..OuraConfig::default()
        };
        let client = OuraClient::from_config(&config, None).unwrap();
        assert_eq!(client.auth_kind(), "oauth2");
        assert_eq!(
            client
                .summary_url(SummaryKind::Workout, &SummaryQuery::default())
                .unwrap(),
            "http://localhost:9000/v2/usercollection/workout"
        );
    }

    #[test]
    fn test_from_config_without_credentials() {
        let result = OuraClient::from_config(&OuraConfig::default(), None);
        assert!(matches!(result, Err(OuraError::Config(_))));
    }
}
