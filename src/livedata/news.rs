//! General news headlines: RSS aggregation with a curated sample fallback.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{fetch_rss_items, format_timestamp, strip_html, LiveDataClient};
use crate::core::errors::ApiError;
use crate::util::truncate_chars;

pub const LABEL: &str = "Live News API";
pub const PATH: &str = "latest-news";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    pub url: String,
    pub published_at: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsData {
    pub articles: Vec<Article>,
    pub last_updated: String,
    /// "live" when at least one article came from a real feed, else "sample".
    pub source: String,
}

pub async fn fetch_summary(client: &LiveDataClient) -> String {
    match client.get_envelope::<NewsData>(PATH).await {
        Ok(data) => render_summary(&data),
        Err(err) => {
            tracing::warn!("news data unavailable: {}", err);
            String::new()
        }
    }
}

pub fn render_summary(data: &NewsData) -> String {
    let mut summary = String::from("\n\n📰 LATEST NEWS:\n");
    for (index, article) in data.articles.iter().take(5).enumerate() {
        summary.push_str(&format!("\n{}. {}\n", index + 1, article.title));
        if let Some(description) = &article.description {
            summary.push_str(&format!("   {}...\n", truncate_chars(description, 100)));
        }
        summary.push_str(&format!("   Source: {}\n", article.source));
    }
    summary.push_str(&format!(
        "\nLast Updated: {}",
        format_timestamp(&data.last_updated)
    ));
    summary
}

pub async fn aggregate(client: &reqwest::Client, timeout: Duration) -> Result<NewsData, ApiError> {
    let mut articles = Vec::new();

    if let Some((feed_title, items)) =
        fetch_rss_items(client, timeout, "https://feeds.bbci.co.uk/news/rss.xml").await
    {
        let source = feed_title.unwrap_or_else(|| "BBC News".to_string());
        for item in items.iter().take(10) {
            if let Some(article) = rss_item_to_article(item, &source) {
                articles.push(article);
            }
        }
    }

    let source = if articles.iter().any(|a| a.url != "#") {
        "live"
    } else {
        "sample"
    };
    if articles.is_empty() {
        tracing::warn!("all news upstreams failed, serving sample articles");
        articles = sample_articles();
    }

    Ok(NewsData {
        articles,
        last_updated: chrono::Utc::now().to_rfc3339(),
        source: source.to_string(),
    })
}

fn rss_item_to_article(item: &serde_json::Value, source: &str) -> Option<Article> {
    let title = item.get("title")?.as_str()?.to_string();
    let description = item
        .get("description")
        .and_then(|v| v.as_str())
        .map(|raw| truncate_chars(&strip_html(raw), 200).to_string());
    Some(Article {
        title,
        description,
        source: source.to_string(),
        url: item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("#")
            .to_string(),
        published_at: item
            .get("pubDate")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        category: "world".to_string(),
    })
}

fn sample_articles() -> Vec<Article> {
    let now = chrono::Utc::now().to_rfc3339();
    let entry = |title: &str, description: &str, source: &str, category: &str| Article {
        title: title.to_string(),
        description: Some(description.to_string()),
        source: source.to_string(),
        url: "#".to_string(),
        published_at: now.clone(),
        category: category.to_string(),
    };

    vec![
        entry(
            "Global Markets Show Mixed Signals Amid Economic Uncertainty",
            "Stock markets around the world displayed varied performance as investors weigh inflation data and central bank policies.",
            "Financial Times",
            "business",
        ),
        entry(
            "Tech Giants Report Strong Quarterly Earnings",
            "Major technology companies exceeded analyst expectations, driven by AI investments and cloud services growth.",
            "Reuters",
            "technology",
        ),
        entry(
            "Climate Summit Reaches Historic Agreement",
            "World leaders commit to ambitious emission reduction targets at the latest international climate conference.",
            "Associated Press",
            "environment",
        ),
        entry(
            "Healthcare Innovation: New Treatments Show Promise",
            "Breakthrough medical research reveals promising results for treating chronic conditions.",
            "Health News",
            "health",
        ),
        entry(
            "Sports: Major Championship Results and Updates",
            "Latest scores and highlights from ongoing sports events around the world.",
            "Sports Network",
            "sports",
        ),
    ]
}
