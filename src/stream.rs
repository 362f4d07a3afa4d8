//! Incremental SSE stream consumption and citation extraction.
//!
//! `SseParser` is an explicit state machine over newline-delimited `data: `
//! frames: one pending-buffer variable carries a partial line (or a partial
//! JSON frame) across chunk arrivals, so a frame split by a network read
//! boundary is retried on the next chunk instead of being dropped. After the
//! stream ends, `Evidence:` and `Confidence:` blocks are pulled out of the
//! accumulated text with best-effort regex matches.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen; later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.push_bytes(chunk.as_bytes())
    }

    /// Feeds one network chunk, returning the content deltas of every frame
    /// completed by it, in arrival order.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let tail = self.buffer.split_off(pos + 1);
            let mut line_bytes = std::mem::replace(&mut self.buffer, tail);
            line_bytes.pop();
            if line_bytes.last() == Some(&b'\r') {
                line_bytes.pop();
            }

            // Complete lines are valid UTF-8 boundaries; only the unterminated
            // tail of the buffer can hold a split multi-byte character.
            let line = String::from_utf8_lossy(&line_bytes).into_owned();
            if line.starts_with(':') || line.trim().is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            let payload = payload.trim();
            if payload == "[DONE]" {
                self.done = true;
                break;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(frame) => {
                    if let Some(content) = delta_content(&frame) {
                        if !content.is_empty() {
                            deltas.push(content.to_string());
                        }
                    }
                }
                Err(_) => {
                    // Partial frame split across a read boundary: put the line
                    // back in front of the buffer and wait for the next chunk.
                    let mut restored = line_bytes;
                    restored.push(b'\n');
                    restored.append(&mut self.buffer);
                    self.buffer = restored;
                    break;
                }
            }
        }
        deltas
    }
}

fn delta_content(frame: &Value) -> Option<&str> {
    frame
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}

/// One citation fragment. A fragment line may contribute any subset of the
/// three fields; absence of a field is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// Extracts the `Evidence:` block, up to a following `Confidence:` marker or
/// end of text, one item per contributing line.
pub fn extract_evidence(content: &str) -> Vec<EvidenceItem> {
    static SECTION_RE: OnceLock<Regex> = OnceLock::new();
    static DOC_RE: OnceLock<Regex> = OnceLock::new();
    static PAGE_RE: OnceLock<Regex> = OnceLock::new();
    static TEXT_RE: OnceLock<Regex> = OnceLock::new();

    let section_re = SECTION_RE.get_or_init(|| {
        Regex::new(r"(?s)Evidence:\n(.*?)(?:\n\nConfidence:|\z)").expect("valid regex")
    });
    let doc_re = DOC_RE.get_or_init(|| Regex::new(r"Document:\s*(.+)").expect("valid regex"));
    let page_re = PAGE_RE.get_or_init(|| Regex::new(r"Page/Section:\s*(.+)").expect("valid regex"));
    let text_re =
        TEXT_RE.get_or_init(|| Regex::new(r#"Source text:\s*"(.+)""#).expect("valid regex"));

    let Some(section) = section_re
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for line in section.lines().filter(|l| !l.trim().is_empty()) {
        let capture = |re: &Regex| {
            re.captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };
        let item = EvidenceItem {
            document: capture(doc_re),
            page: capture(page_re),
            text: capture(text_re),
        };
        if item.document.is_some() || item.page.is_some() || item.text.is_some() {
            items.push(item);
        }
    }
    items
}

/// Extracts the confidence level, case-insensitively. No match is no error.
pub fn extract_confidence(content: &str) -> Option<Confidence> {
    static CONF_RE: OnceLock<Regex> = OnceLock::new();
    let re = CONF_RE
        .get_or_init(|| Regex::new(r"(?i)Confidence:\s*(High|Medium|Low)").expect("valid regex"));
    re.captures(content)
        .and_then(|c| c.get(1))
        .and_then(|m| Confidence::parse(m.as_str()))
}

/// The post-processed result of one completed assistant turn.
#[derive(Debug, Clone)]
pub struct AssistantAnswer {
    pub content: String,
    pub evidence: Vec<EvidenceItem>,
    pub confidence: Option<Confidence>,
}

/// Couples the frame parser with the per-turn accumulator. Exclusively owned
/// by the single in-flight stream task for the turn; no locking needed.
#[derive(Debug, Default)]
pub struct StreamCollector {
    parser: SseParser,
    content: String,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one chunk and returns the deltas it completed. The accumulator
    /// is append-only, so chunks must be applied in arrival order.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let deltas = self.parser.push_bytes(chunk);
        for delta in &deltas {
            self.content.push_str(delta);
        }
        deltas
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the stream reached its natural `[DONE]` end.
    pub fn completed(&self) -> bool {
        self.parser.is_done()
    }

    pub fn finish(self) -> AssistantAnswer {
        let evidence = extract_evidence(&self.content);
        let confidence = extract_confidence(&self.content);
        AssistantAnswer {
            content: self.content,
            evidence,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut parser = SseParser::new();
        let chunk = format!("{}{}", frame("Hello"), frame(" world"));
        assert_eq!(parser.push(&chunk), vec!["Hello", " world"]);
    }

    #[test]
    fn frame_split_mid_json_is_reassembled() {
        let mut parser = SseParser::new();
        let full = frame("split across reads");
        let (a, b) = full.split_at(20);

        assert!(parser.push(a).is_empty());
        assert_eq!(parser.push(b), vec!["split across reads"]);
    }

    #[test]
    fn done_sentinel_stops_parsing() {
        let mut parser = SseParser::new();
        let chunk = format!("{}data: [DONE]\n{}", frame("before"), frame("after"));
        assert_eq!(parser.push(&chunk), vec!["before"]);
        assert!(parser.is_done());
        assert!(parser.push(&frame("late")).is_empty());
    }

    #[test]
    fn comments_blanks_and_crlf_are_tolerated() {
        let mut parser = SseParser::new();
        let chunk = format!(": keep-alive\r\n\r\n{}", frame("ok").replace('\n', "\r\n"));
        assert_eq!(parser.push(&chunk), vec!["ok"]);
    }

    #[test]
    fn multibyte_delta_split_between_chunks() {
        let mut parser = SseParser::new();
        let full = frame("सोना महंगा");
        let bytes = full.as_bytes();
        // Split inside a Devanagari character's UTF-8 encoding.
        let split = bytes.len() - 7;

        assert!(parser.push_bytes(&bytes[..split]).is_empty());
        assert_eq!(parser.push_bytes(&bytes[split..]), vec!["सोना महंगा"]);
    }

    #[test]
    fn frames_without_content_yield_nothing() {
        let mut parser = SseParser::new();
        let chunk = "data: {\"choices\":[{\"delta\":{}}]}\n";
        assert!(parser.push(chunk).is_empty());
    }

    #[test]
    fn evidence_and_confidence_round_trip() {
        let answer = "The rate is 7200.\n\nEvidence:\n- Document: rates.txt\n- Page/Section: 4\n- Source text: \"per gram rate is 7200\"\n\nConfidence: High\n";
        let evidence = extract_evidence(answer);
        assert_eq!(evidence.len(), 3);
        assert_eq!(evidence[0].document.as_deref(), Some("rates.txt"));
        assert_eq!(evidence[1].page.as_deref(), Some("4"));
        assert_eq!(evidence[2].text.as_deref(), Some("per gram rate is 7200"));
        assert_eq!(extract_confidence(answer), Some(Confidence::High));
    }

    #[test]
    fn confidence_is_case_insensitive() {
        assert_eq!(extract_confidence("Confidence: medium"), Some(Confidence::Medium));
        assert_eq!(extract_confidence("confidence missing"), None);
    }

    #[test]
    fn missing_sections_yield_empty_results() {
        let answer = "Just a plain answer with no structure.";
        assert!(extract_evidence(answer).is_empty());
        assert_eq!(extract_confidence(answer), None);
    }

    #[test]
    fn evidence_stops_at_confidence_marker() {
        let answer =
            "Evidence:\n- Document: a.txt\n\nConfidence: Low\n- Document: not-evidence.txt\n";
        let evidence = extract_evidence(answer);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].document.as_deref(), Some("a.txt"));
    }

    #[test]
    fn collector_accumulates_and_finishes() {
        let mut collector = StreamCollector::new();
        let body = "Answer text.\n\nEvidence:\n- Document: notes.txt\n\nConfidence: Low";
        for piece in ["Answer text.\n\nEvidence:\n- Docum", "ent: notes.txt\n\nConfidence: Low"] {
            collector.push_bytes(frame(piece).as_bytes());
        }
        collector.push_bytes(b"data: [DONE]\n");

        assert!(collector.completed());
        assert_eq!(collector.content(), body);
        let answer = collector.finish();
        assert_eq!(answer.evidence.len(), 1);
        assert_eq!(answer.confidence, Some(Confidence::Low));
    }
}
