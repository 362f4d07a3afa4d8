//! Live-data sources: stock market, gold prices, news, politics.
//!
//! Each domain module carries both halves of the pipeline: the upstream
//! aggregator behind our own `/api/...` endpoint, and the fetcher that turns
//! that endpoint's envelope into a bounded prompt summary. A fetcher never
//! fails the chat turn; anything that goes wrong degrades to an empty string.

pub mod gold;
pub mod news;
pub mod politics;
pub mod stock;

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::config::LiveDataConfig;
use crate::intent::QueryIntent;

/// The `{success, data, error}` envelope every aggregation endpoint speaks.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Collapses the duck-typed wire shape into a real result, so "degrade to
    /// empty" decisions happen on a typed value rather than a raw object.
    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            self.data
                .ok_or_else(|| "envelope marked success but carried no data".to_string())
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "unknown upstream error".to_string()))
        }
    }
}

/// One non-empty formatted block destined for the system prompt, plus the
/// human-readable label shown in the available-sources list.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub label: &'static str,
    pub body: String,
}

#[derive(Clone)]
pub struct LiveDataClient {
    client: reqwest::Client,
    base_url: String,
}

impl LiveDataClient {
    pub fn new(config: &LiveDataConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) async fn get_envelope<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("{} returned {}", path, response.status()));
        }
        let envelope: Envelope<T> = response.json().await.map_err(|e| e.to_string())?;
        envelope.into_result()
    }

    /// Fan-out/fan-in over the flagged domains. All selected fetchers start
    /// together and the join completes before context assembly may begin, so
    /// total latency is bounded by the slowest fetcher. Empty results are
    /// dropped here; callers never see a section without content.
    pub async fn gather(&self, intent: &QueryIntent) -> Vec<SourceSummary> {
        let (stock, gold, news, politics) = tokio::join!(
            async {
                if intent.needs_stock {
                    stock::fetch_summary(self).await
                } else {
                    String::new()
                }
            },
            async {
                if intent.needs_gold {
                    gold::fetch_summary(self).await
                } else {
                    String::new()
                }
            },
            async {
                if intent.needs_news {
                    news::fetch_summary(self).await
                } else {
                    String::new()
                }
            },
            async {
                if intent.needs_politics {
                    politics::fetch_summary(self).await
                } else {
                    String::new()
                }
            },
        );

        [
            (stock::LABEL, stock),
            (gold::LABEL, gold),
            (news::LABEL, news),
            (politics::LABEL, politics),
        ]
        .into_iter()
        .filter(|(_, body)| !body.is_empty())
        .map(|(label, body)| SourceSummary { label, body })
        .collect()
    }
}

/// Renders an RFC3339 `lastUpdated` field for the summary templates. Falls
/// back to the raw string if the upstream sent something unparseable.
pub(crate) fn format_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%d/%m/%Y, %H:%M:%S UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Pulls items from an RSS feed via the rss2json bridge. Returns the feed
/// title and raw item objects; callers shape them per domain.
pub(crate) async fn fetch_rss_items(
    client: &reqwest::Client,
    timeout: Duration,
    feed_url: &str,
) -> Option<(Option<String>, Vec<serde_json::Value>)> {
    let url = format!(
        "https://api.rss2json.com/v1/api.json?rss_url={}",
        urlencoding::encode(feed_url)
    );
    let response = client.get(&url).timeout(timeout).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let payload: serde_json::Value = response.json().await.ok()?;
    let feed_title = payload
        .get("feed")
        .and_then(|f| f.get("title"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let items = payload.get("items")?.as_array()?.clone();
    Some((feed_title, items))
}

pub(crate) fn strip_html(input: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));
    re.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Language, QueryIntent};

    fn unreachable_client() -> LiveDataClient {
        // Port 9 (discard) is not served locally; connections are refused.
        LiveDataClient::new(&LiveDataConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            upstream_timeout_secs: 1,
        })
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_every_fetcher_to_empty() {
        let client = unreachable_client();
        assert_eq!(stock::fetch_summary(&client).await, "");
        assert_eq!(gold::fetch_summary(&client).await, "");
        assert_eq!(news::fetch_summary(&client).await, "");
        assert_eq!(politics::fetch_summary(&client).await, "");
    }

    #[tokio::test]
    async fn gather_with_no_flags_fetches_nothing() {
        let client = unreachable_client();
        let intent = QueryIntent {
            needs_stock: false,
            needs_gold: false,
            needs_news: false,
            needs_politics: false,
            needs_rag: true,
            language: Language::English,
        };
        assert!(client.gather(&intent).await.is_empty());
    }

    #[tokio::test]
    async fn gather_drops_summaries_from_failed_fetchers() {
        let client = unreachable_client();
        let intent = QueryIntent {
            needs_stock: true,
            needs_gold: true,
            needs_news: false,
            needs_politics: false,
            needs_rag: false,
            language: Language::English,
        };
        // Both flagged fetchers fail against the dead endpoint; neither may
        // surface an empty-bodied section.
        assert!(client.gather(&intent).await.is_empty());
    }

    #[test]
    fn envelope_success_yields_data() {
        let env = Envelope {
            success: true,
            data: Some(7),
            error: None,
        };
        assert_eq!(env.into_result(), Ok(7));
    }

    #[test]
    fn envelope_failure_yields_error_message() {
        let env: Envelope<i32> = Envelope {
            success: false,
            data: None,
            error: Some("upstream down".to_string()),
        };
        assert_eq!(env.into_result(), Err("upstream down".to_string()));
    }

    #[test]
    fn envelope_success_without_data_is_an_error() {
        let env: Envelope<i32> = Envelope {
            success: true,
            data: None,
            error: None,
        };
        assert!(env.into_result().is_err());
    }

    #[test]
    fn html_tags_are_stripped() {
        assert_eq!(
            strip_html("<p>Breaking: <b>markets</b> rally</p>"),
            "Breaking: markets rally"
        );
    }

    #[test]
    fn unparseable_timestamp_passes_through() {
        assert_eq!(format_timestamp("not-a-date"), "not-a-date");
    }
}
