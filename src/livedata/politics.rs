//! Political updates: two RSS feeds with a curated sample fallback.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{fetch_rss_items, format_timestamp, strip_html, LiveDataClient};
use crate::core::errors::ApiError;
use crate::util::truncate_chars;

pub const LABEL: &str = "Live Politics API";
pub const PATH: &str = "politics";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    pub url: String,
    pub published_at: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticsData {
    pub articles: Vec<Article>,
    pub last_updated: String,
    pub source: String,
}

pub async fn fetch_summary(client: &LiveDataClient) -> String {
    match client.get_envelope::<PoliticsData>(PATH).await {
        Ok(data) => render_summary(&data),
        Err(err) => {
            tracing::warn!("politics data unavailable: {}", err);
            String::new()
        }
    }
}

pub fn render_summary(data: &PoliticsData) -> String {
    let mut summary = String::from("\n\n🏛️ POLITICAL UPDATES:\n");
    for (index, article) in data.articles.iter().take(5).enumerate() {
        summary.push_str(&format!("\n{}. {}\n", index + 1, article.title));
        if let Some(description) = &article.description {
            summary.push_str(&format!("   {}...\n", truncate_chars(description, 100)));
        }
        summary.push_str(&format!(
            "   Source: {} | Region: {}\n",
            article.source, article.region
        ));
    }
    summary.push_str(&format!(
        "\nLast Updated: {}",
        format_timestamp(&data.last_updated)
    ));
    summary
}

pub async fn aggregate(
    client: &reqwest::Client,
    timeout: Duration,
) -> Result<PoliticsData, ApiError> {
    let mut articles = Vec::new();

    if let Some((_, items)) = fetch_rss_items(
        client,
        timeout,
        "https://feeds.bbci.co.uk/news/politics/rss.xml",
    )
    .await
    {
        for item in items.iter().take(10) {
            if let Some(article) = rss_item_to_article(item, "BBC Politics", "UK") {
                articles.push(article);
            }
        }
    }

    // Thin primary feed: top up from a second source.
    if articles.len() < 5 {
        if let Some((_, items)) = fetch_rss_items(
            client,
            timeout,
            "https://rss.nytimes.com/services/xml/rss/nyt/Politics.xml",
        )
        .await
        {
            for item in items.iter().take(5) {
                if let Some(article) = rss_item_to_article(item, "NY Times Politics", "US") {
                    articles.push(article);
                }
            }
        }
    }

    let source = if articles.iter().any(|a| a.url != "#") {
        "live"
    } else {
        "sample"
    };
    if articles.is_empty() {
        tracing::warn!("all politics upstreams failed, serving sample articles");
        articles = sample_articles();
    }

    Ok(PoliticsData {
        articles,
        last_updated: chrono::Utc::now().to_rfc3339(),
        source: source.to_string(),
    })
}

fn rss_item_to_article(item: &serde_json::Value, source: &str, region: &str) -> Option<Article> {
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
        region: region.to_string(),
    })
}

fn sample_articles() -> Vec<Article> {
    let now = chrono::Utc::now().to_rfc3339();
    let entry = |title: &str, description: &str, source: &str, region: &str| Article {
        title: title.to_string(),
        description: Some(description.to_string()),
        source: source.to_string(),
        url: "#".to_string(),
        published_at: now.clone(),
        region: region.to_string(),
    };

    vec![
        entry(
            "Parliament Debates New Economic Policy Framework",
            "Lawmakers discuss proposed changes to fiscal policy aimed at boosting economic growth and addressing inflation concerns.",
            "Political Times",
            "National",
        ),
        entry(
            "International Summit Addresses Global Security Concerns",
            "World leaders convene to discuss collaborative approaches to emerging security challenges.",
            "World Politics",
            "International",
        ),
        entry(
            "Election Commission Announces Updated Voting Procedures",
            "New measures aim to streamline the voting process and improve accessibility for all eligible voters.",
            "Election Watch",
            "National",
        ),
        entry(
            "Policy Reform Bill Advances Through Committee Stage",
            "Proposed legislation addressing regulatory modernization moves forward after extended deliberation.",
            "Legislative Daily",
            "National",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_includes_region_line() {
        let data = PoliticsData {
            articles: sample_articles(),
            last_updated: "2026-01-05T10:00:00Z".to_string(),
            source: "sample".to_string(),
        };
        let summary = render_summary(&data);
        assert!(summary.contains("POLITICAL UPDATES"));
        assert!(summary.contains("Source: Political Times | Region: National"));
    }

    #[test]
    fn sample_fallback_is_non_empty() {
        assert!(!sample_articles().is_empty());
    }
}
