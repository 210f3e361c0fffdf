use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One closed bar. `ts` is the bar's open time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub basis: f64,
    pub upper: f64,
    pub lower: f64,
}

/// A close paired with the bands computed at that bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub ts: DateTime<Utc>,
    pub close: f64,
    pub bands: Bands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    CrossAbove,
    CrossBelow,
    /// Loose mode only: latest close sits above the upper band without a fresh cross.
    OutsideAbove,
    OutsideBelow,
}

impl Signal {
    pub fn key(self) -> &'static str {
        match self {
            Signal::CrossAbove => "CROSS_ABOVE",
            Signal::CrossBelow => "CROSS_BELOW",
            Signal::OutsideAbove => "OUTSIDE_ABOVE",
            Signal::OutsideBelow => "OUTSIDE_BELOW",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::CrossAbove => "CROSS ABOVE",
            Signal::CrossBelow => "CROSS BELOW",
            Signal::OutsideAbove => "OUTSIDE ABOVE",
            Signal::OutsideBelow => "OUTSIDE BELOW",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Signal::CrossAbove => "✅↑",
            Signal::CrossBelow => "❌↓",
            Signal::OutsideAbove => "ℹ️↑",
            Signal::OutsideBelow => "ℹ️↓",
        }
    }
}

/// Candle width, as understood by the chart API (`5m`, `1h`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    minutes: u32,
}

impl Interval {
    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }

    pub fn label(self) -> String {
        if self.minutes == 60 {
            "1h".to_string()
        } else {
            format!("{}m", self.minutes)
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let minutes = match s.trim().to_lowercase().as_str() {
            "1m" => 1,
            "2m" => 2,
            "5m" => 5,
            "15m" => 15,
            "30m" => 30,
            "60m" | "1h" => 60,
            "90m" => 90,
            other => return Err(anyhow!("unsupported interval: {other}")),
        };
        Ok(Interval { minutes })
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
