use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// Renders a bar time as `YYYY-MM-DD HH:MM:SS TZ` in the configured timezone.
pub fn fmt_bar_time(ts: DateTime<Utc>, tz: &str) -> Result<String> {
    let tz: chrono_tz::Tz = tz.parse().map_err(|_| anyhow!("invalid tz: {tz}"))?;
    Ok(ts.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string())
}
