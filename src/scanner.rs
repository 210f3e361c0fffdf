use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::market::ChartClient;
use crate::notifier::{format_alert, Notifier};
use crate::state::{retention_cutoff, PersistedState, StateStore};
use crate::strategy::{BandCross, BandParams, Evaluation};
use crate::symbols::tv_symbol;
use crate::time::fmt_bar_time;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub tickers: usize,
    pub alerts_sent: usize,
    pub duplicates: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped,
    Quiet,
    Duplicate,
    Sent,
    Undelivered,
}

struct Scanner {
    cfg: Config,
    chart: ChartClient,
    notifier: Notifier,
    strategy: BandCross,
    store: StateStore,
}

impl Scanner {
    fn new(cfg: Config) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.http_timeout_secs);
        Ok(Self {
            chart: ChartClient::new(cfg.market_data_base_url.clone(), timeout)?,
            notifier: Notifier::new(
                cfg.discord_webhook_url.clone(),
                cfg.webhook_username.clone(),
                cfg.dry_run,
                timeout,
            )?,
            strategy: BandCross::new(BandParams {
                length: cfg.bb_length,
                mult: cfg.bb_mult,
                loose: cfg.loose_mode,
            }),
            store: StateStore::new(&cfg.state_path),
            cfg,
        })
    }
}

/// One pass over every configured ticker.
pub async fn run(cfg: Config) -> Result<RunSummary> {
    let scanner = Scanner::new(cfg)?;
    let mut state = scanner.store.load_or_default()?;

    info!(
        tickers = %scanner.cfg.tickers.join(", "),
        len = scanner.cfg.bb_length,
        mult = scanner.cfg.bb_mult,
        interval = %scanner.cfg.interval,
        backfill = scanner.cfg.backfill_lookback,
        loose = scanner.cfg.loose_mode,
        debug = scanner.cfg.debug,
        dry_run = scanner.cfg.dry_run,
        "scanner.start"
    );

    let mut summary = RunSummary {
        tickers: scanner.cfg.tickers.len(),
        ..RunSummary::default()
    };

    let delay = Duration::from_millis(scanner.cfg.ticker_delay_ms);
    for (i, symbol) in scanner.cfg.tickers.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match scanner.process_symbol(&mut state, symbol).await {
            Ok(Outcome::Sent) => summary.alerts_sent += 1,
            Ok(Outcome::Duplicate) => summary.duplicates += 1,
            Ok(Outcome::Undelivered) => summary.failures += 1,
            Ok(Outcome::Skipped | Outcome::Quiet) => {}
            Err(e) => {
                summary.failures += 1;
                error!(symbol = %symbol, error = %format!("{e:#}"), "scanner.symbol_failed");
            }
        }
    }

    let cutoff = retention_cutoff(Utc::now(), scanner.cfg.state_retention_days)?;
    let pruned = state.prune(cutoff);
    scanner.store.save(&state)?;

    info!(
        tickers = summary.tickers,
        alerts_sent = summary.alerts_sent,
        duplicates = summary.duplicates,
        failures = summary.failures,
        pruned,
        "scanner.done"
    );
    Ok(summary)
}

impl Scanner {
    async fn process_symbol(&self, state: &mut PersistedState, symbol: &str) -> Result<Outcome> {
        let cfg = &self.cfg;
        let tv = tv_symbol(symbol);

        let candles = self
            .chart
            .closed_candles(symbol, cfg.interval, &cfg.range, Utc::now())
            .await?;
        if candles.is_empty() {
            warn!(symbol = %symbol, interval = %cfg.interval, "no closed candles");
            return Ok(Outcome::Skipped);
        }

        let points = self.strategy.points(&candles);

        if cfg.backfill_lookback > 0 && points.len() >= 2 {
            match self.strategy.backfill(&points, cfg.backfill_lookback) {
                Some((sig, at)) => debug!(
                    symbol = %tv,
                    signal = sig.label(),
                    bar = %fmt_bar_time(at.ts, &cfg.tz)?,
                    "backfill: last crossing"
                ),
                None => debug!(
                    symbol = %tv,
                    bars = cfg.backfill_lookback.max(2).min(points.len()),
                    "backfill: no crossing"
                ),
            }
        }

        let (signal, cur) = match self.strategy.evaluate(&points) {
            Evaluation::Insufficient { bars_with_bands } => {
                info!(symbol = %symbol, candles = candles.len(), bars_with_bands, "insufficient bars after band calc");
                return Ok(Outcome::Skipped);
            }
            Evaluation::Quiet { prev, cur } => {
                debug!(
                    symbol = %tv,
                    bar = %fmt_bar_time(cur.ts, &cfg.tz)?,
                    prev_close = prev.close,
                    prev_upper = prev.bands.upper,
                    prev_lower = prev.bands.lower,
                    cur_close = cur.close,
                    cur_upper = cur.bands.upper,
                    cur_lower = cur.bands.lower,
                    "no signal"
                );
                return Ok(Outcome::Quiet);
            }
            Evaluation::Fired { signal, cur, .. } => (signal, cur),
        };

        if state.already_sent(symbol, cur.ts, signal) {
            debug!(symbol = %tv, signal = signal.key(), bar = %cur.ts.to_rfc3339(), "duplicate suppressed");
            return Ok(Outcome::Duplicate);
        }

        let content = format_alert(symbol, cfg.interval, signal, &cur, &cfg.tz)?;
        if !self.notifier.alert(&content).await? {
            return Ok(Outcome::Undelivered);
        }

        info!(symbol = %tv, signal = signal.key(), close = cur.close, "alert sent");
        state.mark_sent(symbol, cur.ts, signal, Utc::now());
        self.store.save(state)?;
        Ok(Outcome::Sent)
    }
}
