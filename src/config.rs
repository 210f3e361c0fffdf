use anyhow::{anyhow, Result};

use crate::domain::Interval;
use crate::symbols::DEFAULT_TICKERS;

#[derive(Clone)]
pub struct Config {
    // Alerts
    pub discord_webhook_url: String,
    pub webhook_username: String,

    // Universe
    pub tickers: Vec<String>,

    // Indicator
    pub bb_length: usize,
    pub bb_mult: f64,
    pub interval: Interval,
    pub range: String,

    // Runtime
    pub dry_run: bool,
    pub debug: bool,
    pub backfill_lookback: usize,
    pub loose_mode: bool,
    pub tz: String,
    pub ticker_delay_ms: u64,
    pub http_timeout_secs: u64,

    // Data source
    pub market_data_base_url: String,

    // Persistence
    pub state_path: String,
    pub state_retention_days: i64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_webhook_url", &"<redacted>")
            .field("webhook_username", &self.webhook_username)
            .field("tickers", &self.tickers)
            .field("bb_length", &self.bb_length)
            .field("bb_mult", &self.bb_mult)
            .field("interval", &self.interval)
            .field("range", &self.range)
            .field("dry_run", &self.dry_run)
            .field("debug", &self.debug)
            .field("backfill_lookback", &self.backfill_lookback)
            .field("loose_mode", &self.loose_mode)
            .field("tz", &self.tz)
            .field("ticker_delay_ms", &self.ticker_delay_ms)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("market_data_base_url", &self.market_data_base_url)
            .field("state_path", &self.state_path)
            .field("state_retention_days", &self.state_retention_days)
            .finish()
    }
}

/// Longest marker retention accepted from the environment.
pub const MAX_RETENTION_DAYS: i64 = 3650;

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

pub fn env_bool(key: &str, default: bool) -> bool {
    parse_bool(std::env::var(key).ok(), default)
}

/// Splits a CSV ticker list; `None` when nothing usable is left.
pub fn parse_tickers(raw: &str) -> Option<Vec<String>> {
    let tickers: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!tickers.is_empty()).then_some(tickers)
}

/// Typed reads over a variable source (process env, or a map in tests).
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        parse_bool(self.raw(key), default)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.raw(key).and_then(|x| x.trim().parse().ok())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.raw(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup };

        // Alerts
        let discord_webhook_url = vars
            .raw("DISCORD_WEBHOOK")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if discord_webhook_url.is_empty() {
            return Err(anyhow!("DISCORD_WEBHOOK not set"));
        }
        let webhook_username = vars.string("BB_WEBHOOK_USERNAME", "BBand 5m Alerts");

        // Universe
        let tickers = vars
            .raw("TICKERS")
            .and_then(|raw| parse_tickers(&raw))
            .unwrap_or_else(|| DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect());

        // Indicator
        let bb_length = vars.parse::<usize>("BB_LENGTH").unwrap_or(107);
        let bb_mult = vars.parse::<f64>("BB_MULT").unwrap_or(1.7);
        if bb_length < 2 {
            return Err(anyhow!("BB_LENGTH must be >= 2, got {bb_length}"));
        }
        if !bb_mult.is_finite() || bb_mult <= 0.0 {
            return Err(anyhow!("BB_MULT must be > 0, got {bb_mult}"));
        }
        let interval: Interval = vars.string("BB_INTERVAL", "5m").parse()?;
        let range = vars.string("BB_RANGE", "7d");

        // Runtime
        let dry_run = vars.bool("DRY_RUN", false);
        let debug = vars.bool("DEBUG", false);
        let backfill_lookback = vars.parse::<usize>("BACKFILL_LOOKBACK").unwrap_or(0);
        let loose_mode = vars.bool("LOOSE_MODE", false);
        let tz = vars.string("BB_TZ", "UTC");
        if tz.parse::<chrono_tz::Tz>().is_err() {
            return Err(anyhow!("invalid BB_TZ: {tz}"));
        }
        let ticker_delay_ms = vars.parse::<u64>("TICKER_DELAY_MS").unwrap_or(250);
        let http_timeout_secs = vars.parse::<u64>("HTTP_TIMEOUT_SECS").unwrap_or(20);
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS cannot be 0"));
        }

        let market_data_base_url =
            vars.string("MARKET_DATA_BASE_URL", "https://query1.finance.yahoo.com");

        // Persistence
        let state_path = vars.string("BB_STATE_PATH", ".state/bb_alerts.json");
        let state_retention_days = vars.parse::<i64>("BB_STATE_RETENTION_DAYS").unwrap_or(14);
        if !(0..=MAX_RETENTION_DAYS).contains(&state_retention_days) {
            return Err(anyhow!(
                "BB_STATE_RETENTION_DAYS must be within 0..={MAX_RETENTION_DAYS}, got {state_retention_days}"
            ));
        }

        Ok(Self {
            discord_webhook_url,
            webhook_username,
            tickers,
            bb_length,
            bb_mult,
            interval,
            range,
            dry_run,
            debug,
            backfill_lookback,
            loose_mode,
            tz,
            ticker_delay_ms,
            http_timeout_secs,
            market_data_base_url,
            state_path,
            state_retention_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn rejected(pairs: &[(&str, &str)], needle: &str) {
        let mut all = vec![("DISCORD_WEBHOOK", "https://discord.test/api/webhooks/1/abc")];
        all.extend_from_slice(pairs);
        let err = config_from(&all).expect_err("config should be rejected");
        assert!(
            err.to_string().contains(needle),
            "expected `{needle}` in `{err}`"
        );
    }

    #[test]
    fn defaults_apply_with_only_webhook_set() {
        let cfg = config_from(&[("DISCORD_WEBHOOK", " https://discord.test/api/webhooks/1/abc ")]).unwrap();
        assert_eq!(cfg.discord_webhook_url, "https://discord.test/api/webhooks/1/abc");
        assert_eq!(cfg.bb_length, 107);
        assert_eq!(cfg.bb_mult, 1.7);
        assert_eq!(cfg.interval.label(), "5m");
        assert_eq!(cfg.tickers.len(), DEFAULT_TICKERS.len());
        assert_eq!(cfg.state_retention_days, 14);
        assert!(!cfg.dry_run);
        assert!(!format!("{cfg:?}").contains("discord.test"));
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let cfg = config_from(&[
            ("DISCORD_WEBHOOK", "https://discord.test/x"),
            ("BB_LENGTH", "abc"),
            ("TICKERS", "AAPL, MES=F"),
            ("DRY_RUN", "yes"),
        ])
        .unwrap();
        assert_eq!(cfg.bb_length, 107);
        assert_eq!(cfg.tickers, vec!["AAPL", "MES=F"]);
        assert!(cfg.dry_run);
    }

    #[test]
    fn webhook_is_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_WEBHOOK"));
        let err = config_from(&[("DISCORD_WEBHOOK", "   ")]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_WEBHOOK"));
    }

    #[test]
    fn band_parameters_are_validated() {
        rejected(&[("BB_LENGTH", "1")], "BB_LENGTH");
        rejected(&[("BB_MULT", "0")], "BB_MULT");
        rejected(&[("BB_MULT", "-1.5")], "BB_MULT");
        rejected(&[("BB_MULT", "NaN")], "BB_MULT");
        rejected(&[("BB_MULT", "inf")], "BB_MULT");
        rejected(&[("BB_INTERVAL", "1d")], "unsupported interval");
    }

    #[test]
    fn runtime_settings_are_validated() {
        rejected(&[("BB_TZ", "Mars/Olympus")], "BB_TZ");
        rejected(&[("HTTP_TIMEOUT_SECS", "0")], "HTTP_TIMEOUT_SECS");
    }

    #[test]
    fn retention_must_be_within_bounds() {
        rejected(&[("BB_STATE_RETENTION_DAYS", "-1")], "BB_STATE_RETENTION_DAYS");
        rejected(&[("BB_STATE_RETENTION_DAYS", "100000000")], "BB_STATE_RETENTION_DAYS");

        let cfg = config_from(&[
            ("DISCORD_WEBHOOK", "https://discord.test/x"),
            ("BB_STATE_RETENTION_DAYS", "3650"),
        ])
        .unwrap();
        assert_eq!(cfg.state_retention_days, MAX_RETENTION_DAYS);
    }

    #[test]
    fn bool_values_accept_common_spellings() {
        assert!(parse_bool(Some("1".into()), false));
        assert!(parse_bool(Some(" Yes ".into()), false));
        assert!(parse_bool(Some("ON".into()), false));
        assert!(!parse_bool(Some("off".into()), true));
        assert!(!parse_bool(Some("0".into()), true));
    }

    #[test]
    fn bool_falls_back_on_blank_or_garbage() {
        assert!(parse_bool(None, true));
        assert!(!parse_bool(Some("".into()), false));
        assert!(parse_bool(Some("maybe".into()), true));
    }

    #[test]
    fn tickers_drop_blank_entries() {
        let parsed = parse_tickers(" AAPL, ,MES=F,,EURUSD=X ").unwrap();
        assert_eq!(parsed, vec!["AAPL", "MES=F", "EURUSD=X"]);
    }

    #[test]
    fn blank_ticker_list_means_defaults() {
        assert!(parse_tickers("").is_none());
        assert!(parse_tickers(" , ,").is_none());
    }
}
