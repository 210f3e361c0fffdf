use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::domain::{BandPoint, Interval, Signal};
use crate::symbols::tv_symbol;
use crate::time::fmt_bar_time;

#[derive(Clone)]
pub struct Notifier {
    discord_webhook_url: String,
    username: String,
    dry_run: bool,
    http: Client,
}

#[derive(Debug, Serialize)]
struct DiscordPayload<'a> {
    content: &'a str,
    username: &'a str,
}

impl Notifier {
    pub fn new(
        discord_webhook_url: String,
        username: String,
        dry_run: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            discord_webhook_url,
            username,
            dry_run,
            http,
        })
    }

    /// Posts `content` to the webhook. `Ok(false)` means Discord rejected it.
    pub async fn alert(&self, content: &str) -> Result<bool> {
        let payload = DiscordPayload {
            content,
            username: &self.username,
        };

        if self.dry_run {
            info!(payload = %serde_json::to_string(&payload)?, "notifier.dry_run");
            return Ok(true);
        }

        let resp = self
            .http
            .post(&self.discord_webhook_url)
            .json(&payload)
            .send()
            .await
            .context("discord webhook request")?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(true);
        }

        let body = resp.text().await.unwrap_or_default();
        error!(%status, %body, "notifier.webhook_rejected");
        Ok(false)
    }
}

/// Alert body for one signal on the latest closed bar.
pub fn format_alert(
    symbol: &str,
    interval: Interval,
    signal: Signal,
    cur: &BandPoint,
    tz: &str,
) -> Result<String> {
    Ok(format!(
        "{arrow} **{sym}** {interval} **{label}**\n\
         Close: {close:.6}\n\
         Upper: {upper:.6} | Lower: {lower:.6}\n\
         Bar: {bar}",
        arrow = signal.arrow(),
        sym = tv_symbol(symbol),
        label = signal.label(),
        close = cur.close,
        upper = cur.bands.upper,
        lower = cur.bands.lower,
        bar = fmt_bar_time(cur.ts, tz)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bands;
    use chrono::{TimeZone, Utc};

    fn cur() -> BandPoint {
        BandPoint {
            ts: Utc.with_ymd_and_hms(2026, 3, 2, 14, 35, 0).unwrap(),
            close: 191.25,
            bands: Bands {
                basis: 189.0,
                upper: 190.875,
                lower: 187.125,
            },
        }
    }

    #[test]
    fn alert_message_layout() {
        let msg = format_alert("AAPL", "5m".parse().unwrap(), Signal::CrossAbove, &cur(), "UTC").unwrap();
        assert_eq!(
            msg,
            "✅↑ **NASDAQ:AAPL** 5m **CROSS ABOVE**\n\
             Close: 191.250000\n\
             Upper: 190.875000 | Lower: 187.125000\n\
             Bar: 2026-03-02 14:35:00 UTC"
        );
    }

    #[test]
    fn payload_shape() {
        let payload = DiscordPayload {
            content: "hi",
            username: "BBand 5m Alerts",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hi", "username": "BBand 5m Alerts"}));
    }

    #[tokio::test]
    async fn dry_run_never_posts() {
        // Unroutable URL: any real request would fail.
        let notifier = Notifier::new(
            "http://127.0.0.1:9/webhook".into(),
            "BBand 5m Alerts".into(),
            true,
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(notifier.alert("test").await.unwrap());
    }
}
