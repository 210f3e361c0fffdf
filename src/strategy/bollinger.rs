use crate::domain::{BandPoint, Bands, Signal};

// --- indicator utilities (pure, unit-testable) ---

/// Bollinger bands over close prices.
///
/// Returns one entry per close. Entries before a full `length` window are
/// `None`. Deviation is the population form (divide by N).
pub fn bollinger(closes: &[f64], length: usize, mult: f64) -> Vec<Option<Bands>> {
    if length == 0 {
        return vec![None; closes.len()];
    }

    closes
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < length {
                return None;
            }
            let window = &closes[i + 1 - length..=i];
            let n = length as f64;
            let basis = window.iter().sum::<f64>() / n;
            let variance = window
                .iter()
                .map(|c| {
                    let d = c - basis;
                    d * d
                })
                .sum::<f64>()
                / n;
            let sd = variance.sqrt();
            Some(Bands {
                basis,
                upper: basis + mult * sd,
                lower: basis - mult * sd,
            })
        })
        .collect()
}

/// Strict crossing between two consecutive bars. Upper takes precedence.
pub fn detect_cross(prev: &BandPoint, cur: &BandPoint) -> Option<Signal> {
    if prev.close <= prev.bands.upper && cur.close > cur.bands.upper {
        return Some(Signal::CrossAbove);
    }
    if prev.close >= prev.bands.lower && cur.close < cur.bands.lower {
        return Some(Signal::CrossBelow);
    }
    None
}

/// Close outside the bands, regardless of where the previous bar was.
pub fn detect_outside(cur: &BandPoint) -> Option<Signal> {
    if cur.close > cur.bands.upper {
        Some(Signal::OutsideAbove)
    } else if cur.close < cur.bands.lower {
        Some(Signal::OutsideBelow)
    } else {
        None
    }
}

/// Most recent strict crossing within `points`, with the bar it fired on.
pub fn last_cross(points: &[BandPoint]) -> Option<(Signal, BandPoint)> {
    points
        .windows(2)
        .rev()
        .find_map(|w| detect_cross(&w[0], &w[1]).map(|sig| (sig, w[1])))
}
