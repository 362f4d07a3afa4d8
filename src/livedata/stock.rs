//! Stock market data: Yahoo Finance chart aggregation and the prompt summary.

use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{format_timestamp, LiveDataClient};
use crate::core::errors::ApiError;

pub const LABEL: &str = "Live Stock Market API";
pub const PATH: &str = "stock-market";

const INDICES: &[(&str, &str)] = &[
    ("^GSPC", "S&P 500"),
    ("^DJI", "Dow Jones"),
    ("^IXIC", "NASDAQ"),
    ("^NSEI", "NIFTY 50"),
    ("^BSESN", "SENSEX"),
];

const SYMBOLS: &[&str] = &[
    "AAPL",
    "MSFT",
    "GOOGL",
    "AMZN",
    "TSLA",
    "META",
    "NVDA",
    "JPM",
    "V",
    "WMT",
    "RELIANCE.NS",
    "TCS.NS",
    "INFY.NS",
    "HDFCBANK.NS",
    "ICICIBANK.NS",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub change: String,
    pub change_percent: String,
    pub is_positive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    pub indices: Vec<Quote>,
    pub top_gainers: Vec<Quote>,
    pub top_losers: Vec<Quote>,
    pub last_updated: String,
}

/// Fetcher side: one call to our aggregation endpoint, rendered or empty.
pub async fn fetch_summary(client: &LiveDataClient) -> String {
    match client.get_envelope::<StockData>(PATH).await {
        Ok(data) => render_summary(&data),
        Err(err) => {
            tracing::warn!("stock data unavailable: {}", err);
            String::new()
        }
    }
}

pub fn render_summary(data: &StockData) -> String {
    let mut summary = String::from("\n\n📊 LIVE STOCK MARKET DATA:\n");

    if !data.indices.is_empty() {
        summary.push_str("\nMajor Indices:\n");
        for idx in &data.indices {
            let arrow = if idx.is_positive { '↑' } else { '↓' };
            summary.push_str(&format!(
                "• {}: {} ({} {}%)\n",
                idx.name, idx.price, arrow, idx.change_percent
            ));
        }
    }

    if !data.top_gainers.is_empty() {
        summary.push_str("\nTop Gainers:\n");
        for stock in data.top_gainers.iter().take(3) {
            summary.push_str(&format!(
                "• {}: {} (↑ {}%)\n",
                stock.symbol, stock.price, stock.change_percent
            ));
        }
    }

    if !data.top_losers.is_empty() {
        summary.push_str("\nTop Losers:\n");
        for stock in data.top_losers.iter().take(3) {
            summary.push_str(&format!(
                "• {}: {} (↓ {}%)\n",
                stock.symbol, stock.price, stock.change_percent
            ));
        }
    }

    summary.push_str(&format!(
        "\nLast Updated: {}",
        format_timestamp(&data.last_updated)
    ));
    summary
}

/// Aggregator side: quotes for the major indices and a fixed symbol basket,
/// fetched concurrently. Symbols that fail to resolve are skipped.
pub async fn aggregate(client: &reqwest::Client, timeout: Duration) -> Result<StockData, ApiError> {
    let index_futures = INDICES
        .iter()
        .map(|(symbol, name)| fetch_quote(client, timeout, symbol, Some(name)));
    let symbol_futures = SYMBOLS
        .iter()
        .map(|symbol| fetch_quote(client, timeout, symbol, None));

    let (index_results, symbol_results) =
        tokio::join!(join_all(index_futures), join_all(symbol_futures));

    let indices: Vec<Quote> = index_results.into_iter().flatten().collect();
    let stocks: Vec<Quote> = symbol_results.into_iter().flatten().collect();
    let (top_gainers, top_losers) = rank_movers(stocks, 5);

    Ok(StockData {
        indices,
        top_gainers,
        top_losers,
        last_updated: chrono::Utc::now().to_rfc3339(),
    })
}

/// Splits a quote list into the top-n gainers and losers by percent change.
fn rank_movers(quotes: Vec<Quote>, n: usize) -> (Vec<Quote>, Vec<Quote>) {
    let pct = |q: &Quote| q.change_percent.parse::<f64>().unwrap_or(0.0);

    let mut gainers = quotes.clone();
    gainers.sort_by(|a, b| pct(b).partial_cmp(&pct(a)).unwrap_or(std::cmp::Ordering::Equal));
    gainers.truncate(n);

    let mut losers = quotes;
    losers.sort_by(|a, b| pct(a).partial_cmp(&pct(b)).unwrap_or(std::cmp::Ordering::Equal));
    losers.truncate(n);

    (gainers, losers)
}

async fn fetch_quote(
    client: &reqwest::Client,
    timeout: Duration,
    symbol: &str,
    display_name: Option<&str>,
) -> Option<Quote> {
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?interval=1d&range=1d",
        urlencoding::encode(symbol)
    );

    let response = match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!("quote fetch failed for {}: {}", symbol, err);
            return None;
        }
    };
    let payload: Value = response.json().await.ok()?;
    let meta = payload
        .get("chart")?
        .get("result")?
        .get(0)?
        .get("meta")?
        .clone();

    let previous_close = meta
        .get("previousClose")
        .or_else(|| meta.get("chartPreviousClose"))
        .and_then(|v| v.as_f64())?;
    let current = meta.get("regularMarketPrice").and_then(|v| v.as_f64())?;
    if previous_close == 0.0 {
        return None;
    }
    let change = current - previous_close;
    let change_percent = change / previous_close * 100.0;

    let name = display_name
        .map(str::to_string)
        .or_else(|| {
            meta.get("shortName")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| symbol.to_string());

    Some(Quote {
        symbol: symbol.trim_end_matches(".NS").to_string(),
        name,
        price: format!("{:.2}", current),
        change: format!("{:.2}", change),
        change_percent: format!("{:.2}", change_percent),
        is_positive: change >= 0.0,
        currency: meta
            .get("currency")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, pct: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price: "100.00".to_string(),
            change: format!("{:.2}", pct),
            change_percent: format!("{:.2}", pct),
            is_positive: pct >= 0.0,
            currency: None,
        }
    }

    #[test]
    fn movers_are_ranked_by_percent_change() {
        let quotes = vec![
            quote("A", 1.0),
            quote("B", -3.5),
            quote("C", 4.2),
            quote("D", 0.1),
        ];
        let (gainers, losers) = rank_movers(quotes, 2);
        assert_eq!(gainers[0].symbol, "C");
        assert_eq!(gainers[1].symbol, "A");
        assert_eq!(losers[0].symbol, "B");
        assert_eq!(losers[1].symbol, "D");
    }

    #[test]
    fn summary_includes_indices_and_movers() {
        let data = StockData {
            indices: vec![quote("NIFTY", 0.5)],
            top_gainers: vec![quote("AAPL", 2.0), quote("MSFT", 1.5)],
            top_losers: vec![quote("TSLA", -4.0)],
            last_updated: "2026-01-05T10:00:00Z".to_string(),
        };
        let summary = render_summary(&data);
        assert!(summary.contains("LIVE STOCK MARKET DATA"));
        assert!(summary.contains("Major Indices:"));
        assert!(summary.contains("• AAPL: 100.00 (↑ 2.00%)"));
        assert!(summary.contains("• TSLA: 100.00 (↓ -4.00%)"));
        assert!(summary.contains("Last Updated: 05/01/2026"));
    }

    #[test]
    fn summary_omits_empty_sections() {
        let data = StockData {
            indices: vec![],
            top_gainers: vec![],
            top_losers: vec![],
            last_updated: "2026-01-05T10:00:00Z".to_string(),
        };
        let summary = render_summary(&data);
        assert!(!summary.contains("Major Indices:"));
        assert!(!summary.contains("Top Gainers:"));
    }
}
