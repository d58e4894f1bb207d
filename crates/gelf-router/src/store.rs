//! Indexer store forwarder: POSTs
//! `{"@timestamp": ..., "gelf": <message>}` to `<base_url>/woodchuck/gelf`,
//! with an optional `?ttl=Nd` query parameter carried on the configured
//! base URL.

use chrono::Utc;
use gelf_common::Message;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const INDEX_PATH_SUFFIX: &str = "woodchuck/gelf";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid indexer url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("indexer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("indexer responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Forwards messages to a search/indexing back-end. Non-blocking from the
/// dispatch loop's perspective: callers hand messages to a queue and a
/// single worker task drains it into this forwarder.
pub struct StoreForwarder {
    client: Client,
    index_url: Url,
}

impl StoreForwarder {
    pub fn new(base_url: &str, ttl_days: u32) -> Result<Self, StoreError> {
        let mut url = Url::parse(base_url)?;
        if ttl_days > 0 {
            url.query_pairs_mut().append_pair("ttl", &format!("{ttl_days}d"));
        }
        {
            let mut path = url.path().trim_end_matches('/').to_string();
            path.push('/');
            path.push_str(INDEX_PATH_SUFFIX);
            url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build indexer HTTP client");

        Ok(Self { client, index_url: url })
    }

    pub async fn store(&self, message: &Message) -> Result<(), StoreError> {
        let timestamp = Utc::now().to_rfc3339();
        let response = self
            .client
            .post(self.index_url.clone())
            .json(&serde_json::json!({ "@timestamp": timestamp, "gelf": message }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_ttl_query_and_index_path() {
        let store = StoreForwarder::new("https://es.example.com", 90).unwrap();
        let url = store.index_url.as_str();
        assert!(url.starts_with("https://es.example.com/woodchuck/gelf"));
        assert!(url.contains("ttl=90d"));
    }

    #[test]
    fn omits_ttl_query_when_zero() {
        let store = StoreForwarder::new("https://es.example.com", 0).unwrap();
        assert!(!store.index_url.as_str().contains("ttl="));
    }

    #[tokio::test]
    async fn store_posts_envelope_and_succeeds() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/woodchuck/gelf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let store = StoreForwarder::new(&server.uri(), 0).unwrap();
        let message = Message::default();
        store.store(&message).await.unwrap();
    }
}
