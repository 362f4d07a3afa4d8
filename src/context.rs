//! System-prompt assembly.
//!
//! Takes the joined fetcher output and the usable document excerpts and
//! produces the single system instruction for the completion call. The
//! response-format template is always emitted, even with zero sources; in
//! that case the model is told to point the user at the available sources.

use serde::{Deserialize, Serialize};

use crate::intent::Language;
use crate::livedata::SourceSummary;
use crate::util::truncate_chars;

pub const DOCUMENTS_LABEL: &str = "Uploaded Documents (RAG)";

/// A document record as the chat endpoint receives it. Content may be a
/// placeholder marker for types the uploader could not extract text from;
/// placeholders carry no usable evidence and are skipped everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl DocumentInput {
    pub fn has_usable_content(&self) -> bool {
        !self.content.trim().is_empty() && !is_placeholder(&self.content)
    }
}

pub fn is_placeholder(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with("[PDF Document:") || trimmed.starts_with("[Image:")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Per-document excerpt budget, in characters.
    pub doc_excerpt_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            doc_excerpt_limit: 5000,
        }
    }
}

pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Builds the system prompt: identity, language directive, source list,
    /// rules, format template, then the live-data and document sections (each
    /// only when it has content).
    pub fn assemble(
        &self,
        language: Language,
        summaries: &[SourceSummary],
        documents: &[DocumentInput],
    ) -> String {
        let usable_docs: Vec<&DocumentInput> = documents
            .iter()
            .filter(|doc| doc.has_usable_content())
            .collect();

        let mut sources: Vec<&str> = summaries.iter().map(|s| s.label).collect();
        if !usable_docs.is_empty() {
            sources.push(DOCUMENTS_LABEL);
        }

        let mut prompt = String::from(
            "You are FS RAG, a hybrid AI assistant that combines RAG \
             (Retrieval-Augmented Generation) with live data APIs. You provide \
             accurate, evidence-based answers using multiple data sources.\n",
        );

        prompt.push_str("\nLANGUAGE:\n");
        prompt.push_str(language_directive(language));
        prompt.push('\n');

        prompt.push_str("\nAVAILABLE DATA SOURCES:\n");
        if sources.is_empty() {
            prompt.push_str("• General Knowledge (no specific data source)\n");
        } else {
            for source in &sources {
                prompt.push_str(&format!("• {}\n", source));
            }
        }

        prompt.push_str(
            "\nCRITICAL RULES:\n\
             1. For document-based questions: ONLY answer based on information found in the provided documents\n\
             2. For live data questions (stocks, gold, news, politics): Use the real-time data provided below\n\
             3. If combining both: Clearly separate information from each source\n\
             4. ALWAYS indicate the data source used in your response\n\
             5. NEVER make up or hallucinate information\n\
             6. If the answer is not available from any source, respond with: \
             \"This information is not available from the current data sources.\"\n",
        );

        prompt.push_str(
            "\nRESPONSE FORMAT:\n\
             Start every response with a data source indicator:\n\n\
             📌 **Data Source(s):** [List the sources used]\n\n\
             Then provide your answer followed by:\n\n\
             For document-based answers:\n\
             Evidence:\n\
             - Document: [document name]\n\
             - Page/Section: [if available]\n\
             - Source text: \"[exact quote from document]\"\n\n\
             Confidence:\n\
             [High/Medium/Low] - based on how directly the evidence supports the answer\n\n\
             For live data answers:\n\
             - Include the live data in a clear, formatted way\n\
             - Note the last updated timestamp\n",
        );

        if !summaries.is_empty() {
            prompt.push_str("\n--- LIVE DATA FROM APIs ---");
            for summary in summaries {
                prompt.push_str(&summary.body);
            }
            prompt.push('\n');
        }

        if !usable_docs.is_empty() {
            prompt.push_str("\n--- UPLOADED DOCUMENTS ---\n");
            for (index, doc) in usable_docs.iter().enumerate() {
                prompt.push_str(&format!(
                    "\nDocument {}: \"{}\"\nContent:\n{}\n---\n",
                    index + 1,
                    doc.name,
                    truncate_chars(&doc.content, self.config.doc_excerpt_limit)
                ));
            }
        }

        prompt.push_str(
            "\nIf no documents are provided and no live data is relevant, inform the \
             user about what data sources are available and how to access them.\n",
        );

        prompt
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::English => {
            "The user is writing in English. Reply in English. Do not translate \
             the answer into another language unless the user asks for it."
        }
        Language::Hindi => {
            "The user is writing in Hindi. Reply in Hindi using Devanagari script, \
             matching the user's language and script. Do not translate the answer \
             into another language unless the user asks for it."
        }
        Language::Hinglish => {
            "The user is writing in Hinglish (Hindi in Roman script mixed with \
             English). Reply in the same Roman mixed style. Do not translate the \
             answer into another language unless the user asks for it."
        }
        Language::Urdu => {
            "The user is writing in Urdu. Reply in Urdu using Arabic/Nastaliq \
             script, matching the user's language and script. Do not translate the \
             answer into another language unless the user asks for it."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livedata::gold;

    fn doc(name: &str, content: &str) -> DocumentInput {
        DocumentInput {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn gold_scenario_includes_gold_section_only() {
        let summary = SourceSummary {
            label: gold::LABEL,
            body: gold::render_summary(&gold::compute(2650.0, 83.5)),
        };
        let prompt = ContextAssembler::default().assemble(Language::English, &[summary], &[]);

        assert!(prompt.contains("--- LIVE DATA FROM APIs ---"));
        assert!(prompt.contains("LIVE GOLD PRICES"));
        assert!(prompt.contains("• Live Gold Price API"));
        assert!(!prompt.contains("--- UPLOADED DOCUMENTS ---"));
        assert!(!prompt.contains("Uploaded Documents (RAG)"));
    }

    #[test]
    fn no_sources_still_emits_format_template_and_guidance() {
        let prompt = ContextAssembler::default().assemble(Language::English, &[], &[]);

        assert!(prompt.contains("RESPONSE FORMAT:"));
        assert!(prompt.contains("• General Knowledge (no specific data source)"));
        assert!(!prompt.contains("--- LIVE DATA FROM APIs ---"));
        assert!(prompt.contains("inform the user about what data sources are available"));
    }

    #[test]
    fn document_excerpts_are_truncated_to_budget() {
        let long = "x".repeat(20_000);
        let prompt = ContextAssembler::default().assemble(
            Language::English,
            &[],
            &[doc("big.txt", &long)],
        );

        let content_start = prompt.find("Content:\n").unwrap() + "Content:\n".len();
        let excerpt_end = prompt[content_start..].find("\n---\n").unwrap();
        assert_eq!(excerpt_end, 5000);
    }

    #[test]
    fn placeholder_documents_are_not_usable() {
        let docs = [
            doc("report.pdf", "[PDF Document: report.pdf]"),
            doc("photo.png", "[Image: photo.png]"),
            doc("empty.txt", "   "),
        ];
        let prompt = ContextAssembler::default().assemble(Language::English, &[], &docs);

        assert!(!prompt.contains("--- UPLOADED DOCUMENTS ---"));
        assert!(prompt.contains("• General Knowledge (no specific data source)"));
    }

    #[test]
    fn usable_documents_add_the_rag_source() {
        let docs = [doc("notes.txt", "The quarterly target is 12 percent.")];
        let prompt = ContextAssembler::default().assemble(Language::English, &[], &docs);

        assert!(prompt.contains("• Uploaded Documents (RAG)"));
        assert!(prompt.contains("Document 1: \"notes.txt\""));
        assert!(prompt.contains("The quarterly target is 12 percent."));
    }

    #[test]
    fn language_directive_follows_detection() {
        let hindi = ContextAssembler::default().assemble(Language::Hindi, &[], &[]);
        assert!(hindi.contains("Devanagari"));

        let urdu = ContextAssembler::default().assemble(Language::Urdu, &[], &[]);
        assert!(urdu.contains("Nastaliq"));

        let hinglish = ContextAssembler::default().assemble(Language::Hinglish, &[], &[]);
        assert!(hinglish.contains("Roman mixed"));
    }
}
