use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{Candle, Interval};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct ChartClient {
    base_url: String,
    http: Client,
}

impl ChartClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("invalid MARKET_DATA_BASE_URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("market data base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    pub async fn chart(&self, symbol: &str, req: &ChartRequest) -> Result<ChartResponse> {
        let url = self.chart_url(symbol)?;
        let resp = self
            .http
            .get(url)
            .query(req)
            .send()
            .await
            .with_context(|| format!("chart request for {symbol}"))?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Closed candles for `symbol`, oldest first.
    pub async fn closed_candles(
        &self,
        symbol: &str,
        interval: Interval,
        range: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let req = ChartRequest {
            interval: interval.label(),
            range: range.to_string(),
        };
        let chart = self.chart(symbol, &req).await?;
        let candles = chart.into_candles()?;
        Ok(closed_only(candles, interval, now))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartRequest {
    pub interval: String,
    pub range: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    /// Yahoo emits `null` for bars with no trades.
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Flattens the response into candles sorted by time, one per timestamp.
    pub fn into_candles(self) -> Result<Vec<Candle>> {
        if let Some(err) = self.chart.error {
            return Err(anyhow!("chart api error {}: {}", err.code, err.description));
        }
        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(vec![]);
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Ok(vec![]);
        };

        let mut candles: Vec<Candle> = result
            .timestamp
            .iter()
            .zip(quote.close)
            .filter_map(|(&secs, close)| {
                let close = close.filter(|c| c.is_finite())?;
                let ts = DateTime::<Utc>::from_timestamp(secs, 0)?;
                Some(Candle { ts, close })
            })
            .collect();

        // Stable sort keeps response order among equal timestamps; the later
        // entry for a repeated bar is the fresher one.
        candles.sort_by_key(|c| c.ts);
        candles.reverse();
        candles.dedup_by_key(|c| c.ts);
        candles.reverse();
        Ok(candles)
    }
}

/// Drops bars still forming at `now`.
pub fn closed_only(candles: Vec<Candle>, interval: Interval, now: DateTime<Utc>) -> Vec<Candle> {
    let width = interval.duration();
    candles
        .into_iter()
        .filter(|c| c.ts + width <= now)
        .collect()
}
