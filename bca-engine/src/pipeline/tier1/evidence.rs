// Tier 1: Bounded evidence context
//
// Concept: Select the most relevant evidence items for one layer and cap the
// text volume that reaches the prompt.
//
// Relevance = number of distinct name terms (layer, factor, segment; >= 4 chars)
// found in the item's title + body. Stable sort keeps provider order on ties.

use crate::pipeline::types::{EvidenceItem, SubjectKnowledge};
use std::collections::HashSet;

/// Suffix appended to truncated bodies
const TRUNCATION_MARK: char = '…';
const MIN_TERM_LEN: usize = 4;

/// Lower-cased distinct terms from node names
pub fn relevance_terms(names: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .flat_map(|name| name.split(|c: char| !c.is_alphanumeric()))
        .map(str::to_lowercase)
        .filter(|term| term.chars().count() >= MIN_TERM_LEN)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

fn relevance(item: &EvidenceItem, terms: &[String]) -> usize {
    let haystack = format!("{} {}", item.title, item.body).to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

/// Truncate on a char boundary, appending `…` when anything was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = text[..byte_idx].trim_end().to_string();
            out.push(TRUNCATION_MARK);
            out
        }
        None => text.to_string(),
    }
}

/// Evidence selected for one layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceContext {
    pub items: Vec<EvidenceItem>,
    /// Items available before selection
    pub available: usize,
}

/// Word volume and lexical diversity of an evidence context
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WordStats {
    pub total_words: usize,
    pub unique_words: usize,
}

impl WordStats {
    /// unique / total, 0 when empty
    pub fn diversity(&self) -> f64 {
        if self.total_words == 0 {
            0.0
        } else {
            self.unique_words as f64 / self.total_words as f64
        }
    }
}

impl EvidenceContext {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn word_stats(&self) -> WordStats {
        let mut total_words = 0;
        let mut unique = HashSet::new();
        for item in &self.items {
            for word in item
                .title
                .split_whitespace()
                .chain(item.body.split_whitespace())
            {
                let normalized: String = word
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect();
                if normalized.is_empty() {
                    continue;
                }
                total_words += 1;
                unique.insert(normalized);
            }
        }
        WordStats {
            total_words,
            unique_words: unique.len(),
        }
    }

    /// Prompt block: numbered items with optional source
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "No evidence available.".to_string();
        }
        let mut out = String::new();
        for (idx, item) in self.items.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", idx + 1, item.title));
            if let Some(url) = &item.source_url {
                out.push_str(&format!("Source: {}\n", url));
            }
            out.push_str(&item.body);
            out.push_str("\n\n");
        }
        out.trim_end().to_string()
    }

    /// One-line summary stored on the LayerScore
    pub fn summary(&self) -> String {
        if self.items.is_empty() {
            return "No evidence available".to_string();
        }
        let titles: Vec<&str> = self.items.iter().take(3).map(|i| i.title.as_str()).collect();
        let more = self.items.len().saturating_sub(titles.len());
        let mut summary = format!(
            "{} of {} evidence items used: {}",
            self.items.len(),
            self.available,
            titles.join("; ")
        );
        if more > 0 {
            summary.push_str(&format!(" (+{} more)", more));
        }
        summary
    }
}

/// Pick up to `max_items` most relevant items and truncate each body
pub fn select_evidence(
    knowledge: &SubjectKnowledge,
    terms: &[String],
    max_items: usize,
    char_budget: usize,
) -> EvidenceContext {
    let mut ranked: Vec<(usize, &EvidenceItem)> = knowledge
        .items
        .iter()
        .map(|item| (relevance(item, terms), item))
        .collect();
    // sort_by is stable: equal relevance keeps provider order
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let items = ranked
        .into_iter()
        .take(max_items)
        .map(|(_, item)| EvidenceItem {
            title: item.title.clone(),
            body: truncate_chars(&item.body, char_budget),
            source_url: item.source_url.clone(),
        })
        .collect();

    EvidenceContext {
        items,
        available: knowledge.items.len(),
    }
}
