//! In-process FAQ cache and keyword-overlap matcher.
//!
//! Scoring: every FAQ keyword found in the query as a whole word (or word
//! sequence) scores [`KEYWORD_SCORE`]; every distinct significant word of the
//! FAQ question found in the query scores [`QUESTION_WORD_SCORE`]. The best
//! entry must reach the configured minimum score. Ties go to the lower
//! priority number, then to the entry loaded first.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use crate::models::Faq;

pub const KEYWORD_SCORE: u32 = 2;
pub const QUESTION_WORD_SCORE: u32 = 1;

/// Question words shorter than this never count.
const MIN_QUESTION_WORD_LEN: usize = 4;

const STOP_WORDS: &[&str] = &[
    "about", "also", "been", "could", "does", "doing", "from", "have", "here", "into", "just",
    "like", "more", "most", "much", "need", "only", "should", "some", "than", "that", "their",
    "them", "then", "there", "they", "this", "want", "were", "what", "when", "where", "which",
    "will", "with", "would", "your",
];

/// A FAQ that cleared the match threshold.
#[derive(Debug, Clone)]
pub struct FaqMatch {
    pub faq: Faq,
    pub score: u32,
}

/// Shared, read-mostly FAQ set. Cloning shares the same cache.
#[derive(Clone)]
pub struct FaqStore {
    faqs: Arc<RwLock<Vec<Faq>>>,
    min_score: u32,
}

impl FaqStore {
    pub fn new(faqs: Vec<Faq>, min_score: u32) -> Self {
        let store = Self {
            faqs: Arc::new(RwLock::new(Vec::new())),
            min_score: min_score.max(1),
        };
        store.replace_all(faqs);
        store
    }

    /// Replace the cached set, keeping entries in priority order.
    pub fn replace_all(&self, mut faqs: Vec<Faq>) {
        faqs.sort_by_key(|f| f.priority);
        *self.faqs.write().unwrap_or_else(|e| e.into_inner()) = faqs;
    }

    /// Add a newly persisted FAQ after every entry of equal or higher priority.
    pub fn insert(&self, faq: Faq) {
        let mut faqs = self.faqs.write().unwrap_or_else(|e| e.into_inner());
        let pos = faqs.partition_point(|f| f.priority <= faq.priority);
        faqs.insert(pos, faq);
    }

    pub fn len(&self) -> usize {
        self.faqs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active FAQs in priority order, optionally restricted to a category
    /// (case-insensitive).
    pub fn list(&self, category: Option<&str>) -> Vec<Faq> {
        self.faqs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|f| f.is_active)
            .filter(|f| category.map_or(true, |c| f.category.eq_ignore_ascii_case(c)))
            .cloned()
            .collect()
    }

    /// Distinct categories of active FAQs, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.faqs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|f| f.is_active)
            .map(|f| f.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// FAQ knowledge block injected into the system prompt.
    pub fn knowledge_text(&self) -> String {
        let faqs = self.list(None);
        if faqs.is_empty() {
            return String::new();
        }

        let mut text = String::from("Frequently Asked Questions:\n");
        for faq in faqs {
            text.push_str(&format!("Q: {}\nA: {}\n\n", faq.question, faq.answer));
        }
        text.trim_end().to_string()
    }

    /// Best-scoring active FAQ for `query`, if any clears the threshold.
    pub fn find_match(&self, query: &str) -> Option<FaqMatch> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return None;
        }

        let faqs = self.faqs.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<(u32, &Faq)> = None;

        // Entries are in priority order, so a strict `>` keeps the earlier
        // (higher priority) entry on ties.
        for faq in faqs.iter().filter(|f| f.is_active) {
            let score = score_faq(faq, &query_tokens);
            if score < self.min_score {
                continue;
            }
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, faq));
            }
        }

        best.map(|(score, faq)| FaqMatch {
            faq: faq.clone(),
            score,
        })
    }
}

fn score_faq(faq: &Faq, query_tokens: &[String]) -> u32 {
    let keyword_hits = faq
        .keywords
        .iter()
        .filter(|keyword| contains_phrase(query_tokens, &tokenize(keyword)))
        .count() as u32;

    let question_words: HashSet<String> = tokenize(&faq.question)
        .into_iter()
        .filter(|w| w.chars().count() >= MIN_QUESTION_WORD_LEN)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect();

    let question_hits = question_words
        .iter()
        .filter(|word| query_tokens.iter().any(|t| tokens_match(t, word)))
        .count() as u32;

    keyword_hits * KEYWORD_SCORE + question_hits * QUESTION_WORD_SCORE
}

/// Lowercased alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Equal, or equal up to a trailing plural `s`.
fn tokens_match(a: &str, b: &str) -> bool {
    a == b || a.strip_suffix('s') == Some(b) || b.strip_suffix('s') == Some(a)
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(phrase.len())
        .any(|window| window.iter().zip(phrase).all(|(h, p)| tokens_match(h, p)))
}
