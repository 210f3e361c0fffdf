pub mod bollinger;

use crate::domain::{BandPoint, Candle, Signal};

#[derive(Debug, Clone, Copy)]
pub struct BandParams {
    pub length: usize,
    pub mult: f64,
    /// Fall back to "outside the bands" when there is no strict cross.
    pub loose: bool,
}

/// Result of evaluating one ticker's closed candles.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Fewer than two bars carry bands.
    Insufficient { bars_with_bands: usize },
    Quiet { prev: BandPoint, cur: BandPoint },
    Fired { signal: Signal, prev: BandPoint, cur: BandPoint },
}

#[derive(Debug, Clone)]
pub struct BandCross {
    pub params: BandParams,
}

impl BandCross {
    pub fn new(params: BandParams) -> Self {
        Self { params }
    }

    /// Candles must be ascending and closed. Bars without bands are dropped.
    pub fn points(&self, candles: &[Candle]) -> Vec<BandPoint> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        bollinger::bollinger(&closes, self.params.length, self.params.mult)
            .into_iter()
            .zip(candles)
            .filter_map(|(bands, c)| {
                bands.map(|bands| BandPoint {
                    ts: c.ts,
                    close: c.close,
                    bands,
                })
            })
            .collect()
    }

    /// Checks the latest closed bar against the one before it.
    pub fn evaluate(&self, points: &[BandPoint]) -> Evaluation {
        let [.., prev, cur] = points else {
            return Evaluation::Insufficient {
                bars_with_bands: points.len(),
            };
        };

        let signal = bollinger::detect_cross(prev, cur).or_else(|| {
            if self.params.loose {
                bollinger::detect_outside(cur)
            } else {
                None
            }
        });

        match signal {
            Some(signal) => Evaluation::Fired {
                signal,
                prev: *prev,
                cur: *cur,
            },
            None => Evaluation::Quiet {
                prev: *prev,
                cur: *cur,
            },
        }
    }

    /// Last crossing among the most recent `lookback` bars (at least two).
    pub fn backfill(&self, points: &[BandPoint], lookback: usize) -> Option<(Signal, BandPoint)> {
        let take = lookback.max(2).min(points.len());
        bollinger::last_cross(&points[points.len() - take..])
    }
}
