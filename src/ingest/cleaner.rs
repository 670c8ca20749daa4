//! LLM-based removal of navigation and boilerplate from loaded documents.

use std::sync::Arc;

use crate::models::{ChatMessage, Document};
use crate::providers::Completer;
use crate::utils::strip_think_tags;

/// Maximum acceptable shrinkage before the cleaned text is treated as a summary.
const MAX_REDUCTION_PERCENT: f64 = 30.0;

/// Phrases that betray a summary in the opening lines of cleaned output.
const SUMMARY_MARKERS: &[&str] = &[
    "here's",
    "key points",
    "overview",
    "summary",
    "this article",
    "this guide",
];

const CLEANING_PROMPT: &str = "\
You are a document cleaner. Return the EXACT original Markdown document, \
removing ONLY navigation and UI elements.

DO NOT:
- Create summaries or overviews
- Add introductory text such as \"Here's\" or \"This article covers\"
- Modify, rephrase, or reformat any technical content
- Add or remove sections or paragraphs

YOUR ONLY JOB:
1. Remove navigation link rows, footers with site links, social media links,
   newsletter subscription blocks, advertisements, and \"Related Posts\" sections.
2. Keep everything else exactly as is.

If you create a summary or add introductory text, you have failed. \
Return only the cleaned document, nothing else.";

/// Cleans document content through a single chat completion, with guardrails
/// that fall back to the original text whenever the model misbehaves.
pub struct ContentCleaner {
    completer: Arc<dyn Completer>,
}

impl ContentCleaner {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Clean a document in place. On provider failure or guardrail rejection
    /// the document keeps its original content and stays `cleaned: false`.
    pub async fn clean(&self, document: &mut Document) {
        let messages = [
            ChatMessage::system(CLEANING_PROMPT),
            ChatMessage::user(&document.content),
        ];

        let response = match self.completer.complete(&messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(source = %document.source, error = %e, "cleaning failed, keeping original");
                return;
            }
        };

        let cleaned = strip_think_tags(&response);

        if let Some(reason) = rejection_reason(&document.content, &cleaned) {
            tracing::warn!(source = %document.source, reason, "rejecting cleaned output, keeping original");
            return;
        }

        tracing::debug!(
            source = %document.source,
            original = document.content.chars().count(),
            cleaned = cleaned.chars().count(),
            "document cleaned"
        );
        document.apply_cleaned(cleaned);
    }
}

/// Why a cleaned candidate must be discarded, or None when it is acceptable.
fn rejection_reason(original: &str, cleaned: &str) -> Option<&'static str> {
    if cleaned.trim().is_empty() {
        return Some("empty output");
    }

    let original_len = original.chars().count() as f64;
    let cleaned_len = cleaned.chars().count() as f64;
    if original_len > 0.0 {
        let reduction = (original_len - cleaned_len) / original_len * 100.0;
        if reduction > MAX_REDUCTION_PERCENT {
            return Some("excessive content reduction");
        }
    }

    let first_two_lines: String = cleaned
        .lines()
        .take(2)
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    if SUMMARY_MARKERS
        .iter()
        .any(|marker| first_two_lines.contains(marker))
    {
        return Some("summary markers in opening lines");
    }

    let original_headings = heading_count(original);
    let cleaned_headings = heading_count(cleaned);
    if original_headings.abs_diff(cleaned_headings) > 1 {
        return Some("heading structure changed");
    }

    None
}

fn heading_count(text: &str) -> usize {
    text.lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .count()
}
