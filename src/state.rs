use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::Signal;

/// Marker for one delivered alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentAlert {
    pub symbol: String,
    pub bar_ts: DateTime<Utc>,
    pub signal: Signal,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub alerts: Vec<SentAlert>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: 1,
            alerts: vec![],
        }
    }
}

impl PersistedState {
    pub fn already_sent(&self, symbol: &str, bar_ts: DateTime<Utc>, signal: Signal) -> bool {
        self.alerts
            .iter()
            .any(|a| a.symbol == symbol && a.bar_ts == bar_ts && a.signal == signal)
    }

    /// Idempotent: a second mark for the same (symbol, bar, signal) is ignored.
    pub fn mark_sent(&mut self, symbol: &str, bar_ts: DateTime<Utc>, signal: Signal, now: DateTime<Utc>) {
        if self.already_sent(symbol, bar_ts, signal) {
            return;
        }
        self.alerts.push(SentAlert {
            symbol: symbol.to_string(),
            bar_ts,
            signal,
            sent_at: now,
        });
    }

    /// Drops markers for bars older than `cutoff`; returns how many were removed.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.bar_ts >= cutoff);
        before - self.alerts.len()
    }
}

/// Oldest bar time still worth remembering. Negative retention is rejected
/// so a fresh marker can never fall behind the cutoff.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> Result<DateTime<Utc>> {
    if retention_days < 0 {
        return Err(anyhow!("negative retention: {retention_days} days"));
    }
    chrono::TimeDelta::try_days(retention_days)
        .and_then(|keep| now.checked_sub_signed(keep))
        .ok_or_else(|| anyhow!("retention of {retention_days} days is out of range"))
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn load(&self) -> Result<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read state {}", self.path.display()))?;
        let st = serde_json::from_str(&raw)
            .with_context(|| format!("parse state {}", self.path.display()))?;
        Ok(Some(st))
    }

    pub fn load_or_default(&self) -> Result<PersistedState> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save(&self, st: &PersistedState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(st)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace state {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 35, 0).unwrap()
    }

    #[test]
    fn dedup_is_keyed_on_symbol_bar_and_signal() {
        let mut st = PersistedState::default();
        let now = bar() + Duration::minutes(6);
        st.mark_sent("AAPL", bar(), Signal::CrossAbove, now);
        st.mark_sent("AAPL", bar(), Signal::CrossAbove, now);

        assert_eq!(st.alerts.len(), 1);
        assert!(st.already_sent("AAPL", bar(), Signal::CrossAbove));
        assert!(!st.already_sent("AAPL", bar(), Signal::OutsideAbove));
        assert!(!st.already_sent("MSFT", bar(), Signal::CrossAbove));
        assert!(!st.already_sent("AAPL", bar() + Duration::minutes(5), Signal::CrossAbove));
    }

    #[test]
    fn prune_drops_old_bars() {
        let mut st = PersistedState::default();
        let now = bar();
        st.mark_sent("AAPL", bar() - Duration::days(20), Signal::CrossBelow, now);
        st.mark_sent("AAPL", bar(), Signal::CrossBelow, now);

        assert_eq!(st.prune(bar() - Duration::days(14)), 1);
        assert_eq!(st.alerts.len(), 1);
        assert_eq!(st.alerts[0].bar_ts, bar());
    }

    #[test]
    fn cutoff_keeps_fresh_markers() {
        let now = bar() + Duration::minutes(5);
        let mut st = PersistedState::default();
        st.mark_sent("AAPL", bar(), Signal::CrossAbove, now);

        let cutoff = retention_cutoff(now, 0).unwrap();
        assert_eq!(cutoff, now);
        assert_eq!(retention_cutoff(now, 14).unwrap(), now - Duration::days(14));

        let cutoff = retention_cutoff(now, 1).unwrap();
        assert_eq!(st.prune(cutoff), 0);
        assert!(st.already_sent("AAPL", bar(), Signal::CrossAbove));
    }

    #[test]
    fn cutoff_rejects_negative_or_huge_retention() {
        let now = bar();
        assert!(retention_cutoff(now, -1).is_err());
        assert!(retention_cutoff(now, 100_000_000).is_err());
        assert!(retention_cutoff(now, i64::MAX).is_err());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_none());
        assert!(store.load_or_default().unwrap().alerts.is_empty());
    }

    #[test]
    fn save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".state").join("bb_alerts.json");
        let store = StateStore::new(&path);

        let mut st = PersistedState::default();
        st.mark_sent("MES=F", bar(), Signal::CrossAbove, bar());
        store.save(&st).unwrap();

        let back = store.load().unwrap().unwrap();
        assert_eq!(back.version, 1);
        assert_eq!(back.alerts, st.alerts);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bb_alerts.json");
        fs::write(&path, "{not json").unwrap();
        assert!(StateStore::new(&path).load().is_err());
    }
}
