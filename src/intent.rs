//! Query intent detection.
//!
//! Maps a raw user utterance to the set of live-data domains it touches and a
//! coarse language guess. Keyword matching is a plain case-insensitive
//! substring scan with no word boundaries; false positives on embedded
//! substrings are accepted, known behavior.

use serde::Serialize;

const STOCK_KEYWORDS: &[&str] = &[
    "stock",
    "stocks",
    "market",
    "share",
    "shares",
    "nifty",
    "sensex",
    "dow",
    "nasdaq",
    "s&p",
    "trading",
    "invest",
    "portfolio",
    "equity",
    "bull",
    "bear",
    "ipo",
    "dividend",
    "शेयर",
    "स्टॉक",
    "سٹاک",
];

const GOLD_KEYWORDS: &[&str] = &[
    "gold",
    "gold price",
    "gold rate",
    "sona",
    "bullion",
    "precious metal",
    "24k",
    "22k",
    "18k",
    "karat",
    "carat",
    "jewel",
    "jewelry",
    "सोना",
    "سونا",
];

const NEWS_KEYWORDS: &[&str] = &[
    "news",
    "latest",
    "headlines",
    "breaking",
    "current events",
    "happening",
    "recent",
    "update",
    "updates",
    "khabar",
    "समाचार",
    "ख़बर",
    "خبر",
];

const POLITICS_KEYWORDS: &[&str] = &[
    "politics",
    "political",
    "election",
    "government",
    "parliament",
    "congress",
    "minister",
    "president",
    "prime minister",
    "policy",
    "vote",
    "voting",
    "campaign",
    "party",
    "democrat",
    "republican",
    "bjp",
    "legislation",
    "siyasat",
    "राजनीति",
    "चुनाव",
    "سیاست",
];

/// Latin-script tokens that mark transliterated Hindi/Urdu. Matched as whole
/// whitespace-delimited words, unlike the domain keywords above.
const HINGLISH_MARKERS: &[&str] = &[
    "hai", "hain", "kya", "kaise", "kyun", "kyon", "aap", "tum", "mera", "meri", "nahi", "nahin",
    "acha", "accha", "theek", "batao", "bataiye", "chahiye", "karo", "karna", "mein", "wala",
    "wali", "bhi", "aur", "lekin", "magar", "abhi", "kitna", "kitni", "kaun",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Hinglish,
    Urdu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
            Language::Hinglish => "hinglish",
            Language::Urdu => "urdu",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueryIntent {
    pub needs_stock: bool,
    pub needs_gold: bool,
    pub needs_news: bool,
    pub needs_politics: bool,
    pub needs_rag: bool,
    pub language: Language,
}

impl QueryIntent {
    pub fn any_live_data(&self) -> bool {
        self.needs_stock || self.needs_gold || self.needs_news || self.needs_politics
    }
}

/// Classifies a user query. Pure and infallible: an empty query yields
/// all-false domain flags, which defaults the turn to document RAG.
pub fn classify(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

    let needs_stock = matches_any(STOCK_KEYWORDS);
    let needs_gold = matches_any(GOLD_KEYWORDS);
    let needs_news = matches_any(NEWS_KEYWORDS);
    let needs_politics = matches_any(POLITICS_KEYWORDS);

    QueryIntent {
        needs_stock,
        needs_gold,
        needs_news,
        needs_politics,
        needs_rag: !needs_stock && !needs_gold && !needs_news && !needs_politics,
        language: detect_language(query),
    }
}

/// Script-range detection with a transliteration fallback. Priority order:
/// Devanagari, Arabic script, Hinglish marker words, English.
pub fn detect_language(query: &str) -> Language {
    if query.chars().any(is_devanagari) {
        return Language::Hindi;
    }
    if query.chars().any(is_arabic_script) {
        return Language::Urdu;
    }

    let lower = query.to_lowercase();
    let has_marker = lower
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|token| HINGLISH_MARKERS.contains(&token));
    if has_marker {
        return Language::Hinglish;
    }

    Language::English
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_arabic_script(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c) || ('\u{0750}'..='\u{077F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_keywords_set_flag_case_insensitively() {
        assert!(classify("What is the NIFTY doing?").needs_stock);
        assert!(classify("should I InVeSt now").needs_stock);
        assert!(!classify("tell me about rivers").needs_stock);
    }

    #[test]
    fn cross_script_keywords_match() {
        assert!(classify("aaj sona kitna hai").needs_gold);
        assert!(classify("سیاست کی تازہ صورتحال").needs_politics);
        assert!(classify("आज के समाचार").needs_news);
    }

    #[test]
    fn substring_matching_has_no_word_boundaries() {
        // "congress" inside a longer word still trips the politics list.
        assert!(classify("the congressional hearing").needs_politics);
        // "sona" embedded in another word trips the gold list.
        assert!(classify("visiting Sonagiri next week").needs_gold);
    }

    #[test]
    fn needs_rag_is_nor_of_domain_flags() {
        let cases = [
            "plain document question",
            "gold rate today",
            "nifty and gold together",
            "election news update politics stocks gold",
            "",
        ];
        for query in cases {
            let intent = classify(query);
            assert_eq!(
                intent.needs_rag,
                !(intent.needs_stock
                    || intent.needs_gold
                    || intent.needs_news
                    || intent.needs_politics),
                "query: {query:?}"
            );
        }
    }

    #[test]
    fn empty_query_defaults_to_rag_and_english() {
        let intent = classify("");
        assert!(intent.needs_rag);
        assert!(!intent.any_live_data());
        assert_eq!(intent.language, Language::English);
    }

    #[test]
    fn devanagari_wins_over_other_signals() {
        // Contains a Hinglish marker too; the script check takes priority.
        assert_eq!(detect_language("क्या hai yeh"), Language::Hindi);
    }

    #[test]
    fn arabic_script_detected_as_urdu() {
        assert_eq!(detect_language("آج کیا خبر ہے"), Language::Urdu);
    }

    #[test]
    fn latin_marker_words_detected_as_hinglish() {
        assert_eq!(detect_language("gold rate kya hai?"), Language::Hinglish);
        // Markers are whole tokens, so English words containing them don't count.
        assert_eq!(detect_language("the chair is here"), Language::English);
    }

    #[test]
    fn plain_english_defaults() {
        assert_eq!(detect_language("summarize my report"), Language::English);
    }

    #[test]
    fn gold_rate_scenario() {
        let intent = classify("What is today's gold rate?");
        assert!(intent.needs_gold);
        assert!(!intent.needs_stock);
        assert!(!intent.needs_news);
        assert!(!intent.needs_politics);
        assert!(!intent.needs_rag);
    }
}
