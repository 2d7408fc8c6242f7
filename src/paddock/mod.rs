//! The Paddock Pub Chat newsletter: news collection from RSS/Atom feeds,
//! story de-duplication, race-weekend forecast, HTML packaging and
//! publishing to `app_settings/pub-chat`.

pub mod forecast;
pub mod news;
pub mod newsletter;
pub mod similarity;

pub use forecast::{fetch_forecast, parse_forecast, Forecast, ForecastDay, Venue};
pub use news::{fetch_stories, parse_feed, NewsError};
pub use newsletter::{build_newsletter_html, dedupe_stories, headlines_html, strip_code_fences, Story};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::error::ApiError;
use crate::services::{audit, ServiceFailure};
use crate::store::{Store, StoreError};

pub const PUB_CHAT_KEY: &str = "pub-chat";

#[derive(Debug, Error)]
pub enum PaddockError {
    #[error("Pub chat content is empty")]
    EmptyContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for PaddockError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            PaddockError::EmptyContent => Some(ApiError::field_error("content", self.to_string())),
            PaddockError::Store(e) => e.client_error(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubChat {
    pub content: String,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PubChatUpdate {
    pub content: String,
}

/// Publishes a newsletter body. Code fences around it are removed first.
pub async fn publish(
    store: &dyn Store,
    content: &str,
    updated_by: &str,
    now: DateTime<Utc>,
) -> Result<PubChat, PaddockError> {
    let content = strip_code_fences(content);
    if content.is_empty() {
        return Err(PaddockError::EmptyContent);
    }

    let chat = PubChat {
        content,
        last_updated: now,
        updated_by: updated_by.to_string(),
    };
    let value = serde_json::to_value(&chat).map_err(StoreError::from)?;
    store.put_setting(PUB_CHAT_KEY, &value).await?;

    audit::record(store, updated_by, "pub_chat_published", json!({ "length": chat.content.len() })).await;
    info!("Pub chat published by {} ({} bytes)", updated_by, chat.content.len());
    Ok(chat)
}

pub async fn current(store: &dyn Store) -> Result<Option<PubChat>, StoreError> {
    match store.get_setting(PUB_CHAT_KEY).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_publish_and_read_back() {
        let store = MemoryStore::new();
        assert!(current(&store).await.unwrap().is_none());

        let now = Utc::now();
        publish(&store, "```html\n<h3>Quali chaos</h3>\n```", "prix_six_engine", now)
            .await
            .unwrap();

        let chat = current(&store).await.unwrap().unwrap();
        assert_eq!(chat.content, "<h3>Quali chaos</h3>");
        assert_eq!(chat.updated_by, "prix_six_engine");

        let raw = store.get_setting(PUB_CHAT_KEY).await.unwrap().unwrap();
        assert!(raw.get("lastUpdated").is_some());
        assert!(raw.get("updatedBy").is_some());
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            publish(&store, "```html\n```", "admin", Utc::now()).await,
            Err(PaddockError::EmptyContent)
        ));
    }
}
