//! Run notifications.
//!
//! Notifications are fire-and-forget: delivery failures are logged and never
//! surface to the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic: &str, message: &str);
}

/// Notifier that writes to the tracing log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, topic: &str, message: &str) {
        info!(topic = %topic, "Notification [{}]: {}", topic, message);
    }
}

pub const PUSHBULLET_API_URL: &str = "https://api.pushbullet.com";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
}

/// Pushbullet note pushes
pub struct PushbulletNotifier {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl PushbulletNotifier {
    pub fn new(access_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(PUSHBULLET_API_URL, access_token, client)
    }

    pub fn with_client(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    async fn notify(&self, topic: &str, message: &str) {
        let url = format!("{}/v2/pushes", self.base_url.trim_end_matches('/'));
        let request = PushRequest {
            kind: "note",
            title: topic,
            body: message,
        };

        let result = self
            .client
            .post(&url)
            .header("Access-Token", &self.access_token)
            .json(&request)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!(
                topic = %topic,
                status = %response.status(),
                "Pushbullet: push rejected with status {}",
                response.status()
            ),
            Err(e) => warn!(topic = %topic, error = %e, "Pushbullet: push failed"),
        }
    }
}
