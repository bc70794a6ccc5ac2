//! REST implementation of the provider traits
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - Attaching an already-issued bearer token
//! - Mapping HTTP responses onto provider outcomes
//!
//! # Status mapping
//!
//! | Condition | Lookup calls | Paginated calls |
//! |-----------|--------------|-----------------|
//! | HTTP 2xx | `Ok` | `Page` / `Exhausted` |
//! | HTTP 429 | `Throttled` | `Throttled` |
//! | HTTP 404 | `NotFound` | `Failed` |
//! | HTTP 401/403 | `Forbidden` | `Failed` |
//! | Other status | `Status` | `Failed` |
//! | Timeout | `Timeout` | `Failed` |

use crate::config::ApiConfig;
use crate::provider::wire::{ApiErrorBody, FriendsResponse, SearchResponse, StatusWire, UserWire};
use crate::provider::{
    Account, AccountProvider, Page, PageOutcome, PostRef, ProviderError, ReplyQuery, ReplyRecord,
    ThreadProvider,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API configuration (provides the request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format!("reply-mesh/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// REST client implementing both provider traits
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl TwitterClient {
    /// Creates a client from configuration
    ///
    /// The bearer token is read from the environment variable named by
    /// `bearer-token-env`; requests are sent unauthenticated when it is unset.
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let bearer_token = std::env::var(&config.bearer_token_env)
            .ok()
            .filter(|token| !token.is_empty());

        if bearer_token.is_none() {
            tracing::warn!(
                "{} is not set, sending unauthenticated requests",
                config.bearer_token_env
            );
        }

        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    /// Sends a GET request and decodes the JSON body
    #[instrument(skip(self, params))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self.client.get(&url).query(params);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug!(?reset, "Request quota exhausted");
            return Err(ProviderError::Throttled);
        }

        let bytes = response.bytes().await.map_err(classify_transport)?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(ProviderError::from);
        }

        let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.errors.into_iter().next())
            .map(|entry| entry.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

        Err(match status {
            StatusCode::NOT_FOUND => ProviderError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Forbidden(message),
            _ => ProviderError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn classify_transport(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(error)
    }
}

#[async_trait]
impl ThreadProvider for TwitterClient {
    async fn lookup_post(&self, post_id: &str) -> Result<PostRef, ProviderError> {
        let params = [
            ("id", post_id.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        let status: StatusWire = self.get_json("/1.1/statuses/show.json", &params).await?;
        Ok(status.into())
    }

    async fn search_replies(
        &self,
        query: &ReplyQuery,
        cursor: Option<&str>,
    ) -> PageOutcome<ReplyRecord> {
        let mut params = vec![
            ("q", format!("to:{} filter:replies", query.author)),
            ("result_type", "recent".to_string()),
            ("since_id", query.since_id.clone()),
            ("tweet_mode", "extended".to_string()),
            ("count", query.page_size.to_string()),
        ];
        if let Some(max_id) = cursor {
            params.push(("max_id", max_id.to_string()));
        }

        let response: SearchResponse =
            match self.get_json("/1.1/search/tweets.json", &params).await {
                Ok(response) => response,
                Err(e) => return e.into(),
            };

        if response.statuses.is_empty() {
            return PageOutcome::Exhausted;
        }

        // Search pages walk backwards in time: the next page ends just below
        // the oldest id seen on this one.
        let oldest = response
            .statuses
            .iter()
            .filter_map(|status| status.id_str.parse::<u64>().ok())
            .min();
        let next = match (response.search_metadata.next_results.as_ref(), oldest) {
            (Some(_), Some(id)) if id > 0 => Some((id - 1).to_string()),
            _ => None,
        };

        PageOutcome::Page(Page {
            items: response.statuses.into_iter().map(ReplyRecord::from).collect(),
            next,
        })
    }
}

#[async_trait]
impl AccountProvider for TwitterClient {
    async fn resolve_account(&self, handle: &str) -> Result<Account, ProviderError> {
        let params = [("screen_name", handle.to_string())];
        let user: UserWire = self.get_json("/1.1/users/show.json", &params).await?;
        Ok(user.into())
    }

    async fn follows_page(
        &self,
        account: &Account,
        page_size: u32,
        cursor: Option<&str>,
    ) -> PageOutcome<Account> {
        let params = [
            ("screen_name", account.handle.clone()),
            ("count", page_size.to_string()),
            ("cursor", cursor.unwrap_or("-1").to_string()),
            ("skip_status", "true".to_string()),
            ("include_user_entities", "false".to_string()),
        ];

        match self
            .get_json::<FriendsResponse>("/1.1/friends/list.json", &params)
            .await
        {
            Ok(response) => {
                let next = response.next();
                PageOutcome::Page(Page {
                    items: response.users.into_iter().map(Account::from).collect(),
                    next,
                })
            }
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&ApiConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            ..ApiConfig::default()
        };
        let client = TwitterClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    // Request/response behaviour is covered with wiremock in the integration tests
}
