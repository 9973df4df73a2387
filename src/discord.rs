use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Serialize;

use crate::datetime;

const BOT_USERNAME: &str = "Skyhook Timer";
const ALERT_TITLE: &str = "Skyhook Timer Alert";
const ALERT_FOOTER: &str = "Skyhook Timer Notification";
/// 警告を表す黄色。
const ALERT_COLOR: u32 = 0xFFFF00;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 期限が近いskyhookタイマーの通知内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyhookAlert {
    pub timer_name: String,
    pub eve_system: String,
    pub time_remaining: String,
}

/// 通知を送るためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier {
    /// 通知を1件送る。
    async fn send(&self, alert: &SkyhookAlert) -> Result<()>;
}

/// Discord webhookのリクエストボディ。
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: String,
    color: u32,
    timestamp: String,
    fields: Vec<EmbedField<'a>>,
    footer: EmbedFooter<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

impl<'a> WebhookPayload<'a> {
    fn from_alert(alert: &'a SkyhookAlert, timestamp: String) -> Self {
        Self {
            username: BOT_USERNAME,
            embeds: vec![Embed {
                title: ALERT_TITLE,
                description: format!("The timer **{}** is about to expire!", alert.timer_name),
                color: ALERT_COLOR,
                timestamp,
                fields: vec![
                    EmbedField {
                        name: "EVE System",
                        value: &alert.eve_system,
                        inline: false,
                    },
                    EmbedField {
                        name: "Time Remaining",
                        value: &alert.time_remaining,
                        inline: false,
                    },
                ],
                footer: EmbedFooter { text: ALERT_FOOTER },
            }],
        }
    }
}

/// Discordのwebhookへ通知を送るクライアント。
///
/// # Examples
///
/// ```
/// let webhook = DiscordWebhook::new(config::webhook_url()?)?;
/// webhook.send(&alert).await?;
/// ```
pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
}

impl DiscordWebhook {
    /// 新しい`DiscordWebhook`を返す。
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - Discordで発行したwebhookのURL
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn send(&self, alert: &SkyhookAlert) -> Result<()> {
        let timestamp = datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = WebhookPayload::from_alert(alert, timestamp);

        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Discord webhook")?
            .error_for_status()
            .context("Discord webhook returned an error status")?;
        info!("Sent skyhook alert for {}", alert.timer_name);

        Ok(())
    }
}
