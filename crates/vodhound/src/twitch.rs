//! Twitch Helix client.
//!
//! App-token auth (client-credentials grant, cached until near expiry),
//! EventSub `channel.update` subscription management, and current-stream
//! lookup. Implements the core's [`EventSubProvider`] boundary.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chapters::{EventSubProvider, ProviderError};
use houndconf::TwitchConfig;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;

/// Refresh the app token this long before Twitch says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// The channel's live game/title state, as Helix reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamInfo {
    pub game_name: String,
    pub title: String,
}

/// Source of a channel's current stream state, specified at its boundary
/// so the archiver can be tested without Helix.
#[async_trait]
pub trait StreamInfoSource: Send + Sync {
    /// `None` when the channel is not currently live.
    async fn current_stream(&self, channel_id: &str) -> Result<Option<StreamInfo>, ProviderError>;
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    data: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionData {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionsResponse {
    data: Vec<SubscriptionData>,
    #[serde(default)]
    pagination: Pagination,
}

/// Twitch Helix API client.
pub struct HelixClient {
    http: Client,
    config: TwitchConfig,
    token: RwLock<Option<CachedToken>>,
}

impl HelixClient {
    pub fn new(config: TwitchConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            token: RwLock::new(None),
        }
    }

    /// Get a valid app token, fetching a fresh one when the cached token
    /// is missing or close to expiry.
    async fn app_token(&self) -> Result<String, ProviderError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        tracing::debug!("fetching fresh app token");
        let response = self
            .http
            .post(&self.config.auth_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("{status}: {message}")));
        }

        let token: TokenResponse = response.json().await.map_err(transport)?;
        let expires_in = Duration::from_secs(token.expires_in);
        let access_token = token.access_token.clone();
        *slot = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });

        Ok(access_token)
    }

    async fn check(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            // Token may have been revoked server-side; drop the cache so
            // the next call re-authenticates.
            *self.token.write().await = None;
            return Err(ProviderError::Auth(message));
        }
        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl EventSubProvider for HelixClient {
    #[tracing::instrument(skip(self))]
    async fn create_category_subscription(
        &self,
        channel_id: &str,
    ) -> Result<String, ProviderError> {
        let token = self.app_token().await?;
        let body = serde_json::json!({
            "type": "channel.update",
            "version": "2",
            "condition": { "broadcaster_user_id": channel_id },
            "transport": {
                "method": "webhook",
                "callback": self.config.eventsub_callback,
                "secret": self.config.eventsub_secret,
            },
        });

        let response = self
            .http
            .post(format!("{}/eventsub/subscriptions", self.config.api_url))
            .header("Client-Id", &self.config.client_id)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = self.check(response).await?;

        let parsed: SubscriptionsResponse = response.json().await.map_err(transport)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|sub| sub.id)
            .ok_or_else(|| ProviderError::Api {
                status: 200,
                message: "subscription create returned no data".to_string(),
            })
    }

    #[tracing::instrument(skip(self))]
    async fn list_enabled_subscriptions(&self) -> Result<Vec<String>, ProviderError> {
        let token = self.app_token().await?;
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/eventsub/subscriptions", self.config.api_url))
                .header("Client-Id", &self.config.client_id)
                .bearer_auth(&token)
                .query(&[("status", "enabled")]);
            if let Some(after) = &cursor {
                request = request.query(&[("after", after.as_str())]);
            }

            let response = request.send().await.map_err(transport)?;
            let response = self.check(response).await?;
            let page: SubscriptionsResponse = response.json().await.map_err(transport)?;

            ids.extend(page.data.into_iter().map(|sub| sub.id));
            match page.pagination.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_subscription(&self, subscription_id: &str) -> Result<(), ProviderError> {
        let token = self.app_token().await?;
        let response = self
            .http
            .delete(format!("{}/eventsub/subscriptions", self.config.api_url))
            .header("Client-Id", &self.config.client_id)
            .bearer_auth(&token)
            .query(&[("id", subscription_id)])
            .send()
            .await
            .map_err(transport)?;
        self.check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl StreamInfoSource for HelixClient {
    #[tracing::instrument(skip(self))]
    async fn current_stream(&self, channel_id: &str) -> Result<Option<StreamInfo>, ProviderError> {
        let token = self.app_token().await?;
        let response = self
            .http
            .get(format!("{}/streams", self.config.api_url))
            .header("Client-Id", &self.config.client_id)
            .bearer_auth(&token)
            .query(&[("user_id", channel_id)])
            .send()
            .await
            .map_err(transport)?;
        let response = self.check(response).await?;

        let parsed: StreamsResponse = response.json().await.map_err(transport)?;
        Ok(parsed.data.into_iter().next())
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}
