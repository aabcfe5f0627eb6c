//! Category-change subscription lifecycle.
//!
//! The provider is the source of truth: it may revoke or expire a
//! subscription independently of this process (a redeploy is enough), so
//! a locally cached entry is verified against the provider's enabled
//! list on every ensure rather than trusted outright.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Errors from the external subscription provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

/// External event-subscription provider, specified at its boundary.
#[async_trait]
pub trait EventSubProvider: Send + Sync {
    /// Create a category-change subscription for a channel and return
    /// the provider's subscription id.
    async fn create_category_subscription(&self, channel_id: &str)
        -> Result<String, ProviderError>;

    /// Ids of every subscription the provider currently reports enabled.
    async fn list_enabled_subscriptions(&self) -> Result<Vec<String>, ProviderError>;

    async fn delete_subscription(&self, subscription_id: &str) -> Result<(), ProviderError>;
}

/// Keeps exactly one live category-change subscription per channel.
pub struct SubscriptionCoordinator {
    provider: Arc<dyn EventSubProvider>,
    /// channel id -> provider subscription id
    cache: DashMap<String, String>,
}

impl SubscriptionCoordinator {
    pub fn new(provider: Arc<dyn EventSubProvider>) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    /// Ensure a live subscription exists for `channel_id`.
    ///
    /// If the provider does not list the cached subscription as enabled,
    /// or the listing itself fails, the cache entry is discarded and a
    /// fresh subscription is created. Failing the verification open would
    /// silently lose category changes for the rest of the session.
    pub async fn ensure(&self, channel_id: &str) -> Result<(), ProviderError> {
        if let Some(cached) = self.cache.get(channel_id).map(|e| e.value().clone()) {
            match self.provider.list_enabled_subscriptions().await {
                Ok(enabled) if enabled.iter().any(|id| id == &cached) => {
                    tracing::debug!(
                        channel_id,
                        subscription_id = %cached,
                        "cached subscription confirmed enabled"
                    );
                    return Ok(());
                }
                Ok(_) => {
                    tracing::warn!(
                        channel_id,
                        subscription_id = %cached,
                        "cached subscription not enabled on provider, re-subscribing"
                    );
                    self.cache.remove(channel_id);
                }
                Err(err) => {
                    // Assume stale on verification failure.
                    tracing::warn!(
                        channel_id,
                        subscription_id = %cached,
                        error = %err,
                        "subscription verification failed, re-subscribing"
                    );
                    self.cache.remove(channel_id);
                }
            }
        }

        let subscription_id = self.provider.create_category_subscription(channel_id).await?;
        tracing::info!(
            channel_id,
            subscription_id = %subscription_id,
            "category subscription created"
        );
        self.cache.insert(channel_id.to_string(), subscription_id);
        Ok(())
    }

    /// Delete every subscription we created. Per-channel failures are
    /// logged and do not stop the rest.
    pub async fn stop_all(&self) {
        let entries: Vec<(String, String)> = self
            .cache
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        tracing::info!(count = entries.len(), "stopping category subscriptions");
        for (channel_id, subscription_id) in entries {
            if let Err(err) = self.provider.delete_subscription(&subscription_id).await {
                tracing::warn!(
                    channel_id = %channel_id,
                    subscription_id = %subscription_id,
                    error = %err,
                    "failed to delete subscription"
                );
            }
            self.cache.remove(&channel_id);
        }
    }

    pub fn active_count(&self) -> usize {
        self.cache.len()
    }
}
