pub const DEFAULT_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "TSLA", "SPY", "QQQ", "NVDA", // equities / ETFs
    "MES=F", "MNQ=F", "MGC=F", "MCL=F", "MHG=F", "SIL=F", // micro futures
    "EURUSD=X", "GBPUSD=X", "JPY=X", "USDJPY=X", "USDCAD=X", "AUDUSD=X", // FX
];

fn tradingview_exchange(symbol: &str) -> Option<&'static str> {
    Some(match symbol {
        "AAPL" | "MSFT" | "TSLA" | "AMZN" | "QQQ" | "NVDA" => "NASDAQ",
        "SPY" => "AMEX",
        "MES=F" | "MNQ=F" => "CME_MINI",
        "MGC=F" | "MHG=F" | "SIL=F" => "COMEX",
        "MCL=F" => "NYMEX",
        _ => return None,
    })
}

/// Display form used in alerts (`NASDAQ:AAPL`); unknown symbols pass through.
pub fn tv_symbol(symbol: &str) -> String {
    match tradingview_exchange(symbol) {
        Some(exch) => format!("{exch}:{symbol}"),
        None => symbol.to_string(),
    }
}
