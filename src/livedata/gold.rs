//! Gold prices: spot-price aggregation with INR conversion, and the summary.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{format_timestamp, LiveDataClient};
use crate::core::config::GoldConfig;
use crate::core::errors::ApiError;

pub const LABEL: &str = "Live Gold Price API";
pub const PATH: &str = "gold-prices";

const TROY_OUNCE_GRAMS: f64 = 31.1035;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurityPrice {
    #[serde(rename = "perGram")]
    pub per_gram: String,
    #[serde(rename = "per10Grams")]
    pub per_10_grams: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurityTable {
    #[serde(rename = "24K")]
    pub k24: PurityPrice,
    #[serde(rename = "22K")]
    pub k22: PurityPrice,
    #[serde(rename = "18K")]
    pub k18: PurityPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldData {
    #[serde(rename = "pricePerOunceUSD")]
    pub price_per_ounce_usd: String,
    #[serde(rename = "pricePerGramUSD")]
    pub price_per_gram_usd: String,
    #[serde(rename = "exchangeRate")]
    pub exchange_rate: String,
    pub prices: PurityTable,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

pub async fn fetch_summary(client: &LiveDataClient) -> String {
    match client.get_envelope::<GoldData>(PATH).await {
        Ok(data) => render_summary(&data),
        Err(err) => {
            tracing::warn!("gold data unavailable: {}", err);
            String::new()
        }
    }
}

pub fn render_summary(data: &GoldData) -> String {
    let mut summary = String::from("\n\n🥇 LIVE GOLD PRICES:\n");
    summary.push_str(&format!(
        "\nInternational Price: ${}/oz\n",
        data.price_per_ounce_usd
    ));
    summary.push_str(&format!("Exchange Rate: ₹{}/USD\n", data.exchange_rate));
    summary.push_str("\nIndian Gold Prices (per 10 grams):\n");
    summary.push_str(&format!("• 24K (Pure): ₹{}\n", data.prices.k24.per_10_grams));
    summary.push_str(&format!("• 22K: ₹{}\n", data.prices.k22.per_10_grams));
    summary.push_str(&format!("• 18K: ₹{}\n", data.prices.k18.per_10_grams));
    summary.push_str(&format!(
        "\nLast Updated: {}",
        format_timestamp(&data.last_updated)
    ));
    summary
}

/// Aggregator side: spot price in USD/oz plus the USD→INR rate. Both
/// upstreams degrade to the configured fallback values rather than failing.
pub async fn aggregate(
    client: &reqwest::Client,
    timeout: Duration,
    config: &GoldConfig,
) -> Result<GoldData, ApiError> {
    let price_usd_per_oz = fetch_spot_price(client, timeout)
        .await
        .unwrap_or(config.fallback_price_usd_per_oz);
    let usd_to_inr = fetch_usd_to_inr(client, timeout)
        .await
        .unwrap_or(config.fallback_usd_to_inr);

    Ok(compute(price_usd_per_oz, usd_to_inr))
}

/// Pure price math: troy-ounce to gram conversion and the purity table.
pub fn compute(price_usd_per_oz: f64, usd_to_inr: f64) -> GoldData {
    let per_gram_usd = price_usd_per_oz / TROY_OUNCE_GRAMS;
    let per_gram_inr = per_gram_usd * usd_to_inr;

    let purity = |factor: f64| PurityPrice {
        per_gram: format!("{:.2}", per_gram_inr * factor),
        per_10_grams: format!("{:.2}", per_gram_inr * 10.0 * factor),
    };

    GoldData {
        price_per_ounce_usd: format!("{:.2}", price_usd_per_oz),
        price_per_gram_usd: format!("{:.2}", per_gram_usd),
        exchange_rate: format!("{:.2}", usd_to_inr),
        prices: PurityTable {
            k24: purity(1.0),
            k22: purity(22.0 / 24.0),
            k18: purity(18.0 / 24.0),
        },
        last_updated: chrono::Utc::now().to_rfc3339(),
    }
}

async fn fetch_spot_price(client: &reqwest::Client, timeout: Duration) -> Option<f64> {
    let response = client
        .get("https://api.metals.live/v1/spot/gold")
        .timeout(timeout)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let payload: Value = response.json().await.ok()?;
    // The API returns an array; the first entry carries the spot price.
    let price = payload.get(0)?.get("price")?.as_f64()?;
    (price > 0.0).then_some(price)
}

async fn fetch_usd_to_inr(client: &reqwest::Client, timeout: Duration) -> Option<f64> {
    let response = client
        .get("https://api.exchangerate-api.com/v4/latest/USD")
        .timeout(timeout)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let payload: Value = response.json().await.ok()?;
    payload.get("rates")?.get("INR")?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purity_table_scales_from_24k() {
        let data = compute(3110.35, 80.0);
        // 3110.35 / 31.1035 = 100 USD/gram, * 80 = 8000 INR/gram.
        assert_eq!(data.price_per_gram_usd, "100.00");
        assert_eq!(data.prices.k24.per_gram, "8000.00");
        assert_eq!(data.prices.k24.per_10_grams, "80000.00");
        assert_eq!(data.prices.k22.per_gram, format!("{:.2}", 8000.0 * 22.0 / 24.0));
        assert_eq!(data.prices.k18.per_gram, format!("{:.2}", 8000.0 * 18.0 / 24.0));
    }

    #[test]
    fn summary_lists_all_three_purities() {
        let data = compute(2650.0, 83.5);
        let summary = render_summary(&data);
        assert!(summary.contains("LIVE GOLD PRICES"));
        assert!(summary.contains("• 24K (Pure):"));
        assert!(summary.contains("• 22K:"));
        assert!(summary.contains("• 18K:"));
        assert!(summary.contains("Exchange Rate: ₹83.50/USD"));
    }
}
