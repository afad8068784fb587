//! Query engine over a loaded index, ranking the way the search widget does:
//! token matching on title and text, title matches boosted, prefix
//! completion on the last word and a substring scan as fallback.

use crate::entry::{Category, SearchEntry};
use crate::index::{DocId, InvertedIndex, SearchIndex, TermId};
use crate::tokenizer::{stem, tokenize_raw};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const SNIPPET_BEFORE: usize = 60;
const SNIPPET_AFTER: usize = 160;
const PREFIX_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    /// Every query word must match.
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub combine: Combine,
    pub prefix: bool,
    pub title_boost: f32,
    pub unique_locations: bool,
    pub category: Option<Category>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            combine: Combine::And,
            prefix: true,
            title_boost: 100.0,
            unique_locations: true,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub index: usize,
    pub score: f32,
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub total_hits: usize,
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    fn empty(query: &str) -> Self {
        Self { query: query.to_string(), total_hits: 0, hits: Vec::new() }
    }

    /// Hits grouped under their page label, pages in order of their best hit.
    pub fn group_by_page(&self) -> Vec<(&str, Vec<&SearchHit>)> {
        let mut groups: Vec<(&str, Vec<&SearchHit>)> = Vec::new();
        for hit in &self.hits {
            match groups.iter_mut().find(|(page, _)| *page == hit.page) {
                Some((_, hits)) => hits.push(hit),
                None => groups.push((hit.page.as_str(), vec![hit])),
            }
        }
        groups
    }
}

struct Acc {
    score: f32,
    matched: usize,
    last_group: usize,
}

pub struct SearchEngine {
    index: Arc<SearchIndex>,
    terms: InvertedIndex,
}

impl SearchEngine {
    pub fn new(index: Arc<SearchIndex>) -> Self {
        let terms = InvertedIndex::build(&index);
        Self { index, terms }
    }

    pub fn index(&self) -> &Arc<SearchIndex> { &self.index }

    pub fn terms(&self) -> &InvertedIndex { &self.terms }

    pub fn search(&self, query: &str, opts: &SearchOptions) -> SearchResults {
        let words = query_words(query);
        if words.is_empty() {
            return SearchResults::empty(query);
        }

        let in_category = |doc: DocId| {
            opts.category.map_or(true, |c| self.index.get(doc as usize).is_some_and(|e| e.category == c))
        };
        let mut scored = self.score_tokens(&words, opts);
        scored.retain(|(doc, _)| in_category(*doc));
        if scored.is_empty() {
            scored = self.score_substring(query, opts);
            scored.retain(|(doc, _)| in_category(*doc));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));

        if opts.unique_locations {
            let mut seen = HashSet::new();
            scored.retain(|(doc, _)| {
                self.index.get(*doc as usize).is_some_and(|e| seen.insert(e.location.as_str()))
            });
        }

        let total_hits = scored.len();
        let hits = scored
            .into_iter()
            .take(opts.limit.max(1))
            .filter_map(|(doc, score)| {
                let entry = self.index.get(doc as usize)?;
                Some(hit_for(doc as usize, score, entry, &words))
            })
            .collect();
        tracing::debug!(query, total_hits, "search");
        SearchResults { query: query.to_string(), total_hits, hits }
    }

    /// Candidate terms per query word: the exact stem, plus completions of
    /// the last word as typed when prefix matching is on.
    fn expand(&self, words: &[String], prefix: bool) -> Vec<Vec<(TermId, f32)>> {
        let last = words.len() - 1;
        words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let mut group: Vec<(TermId, f32)> = Vec::new();
                if let Some(tid) = self.terms.term_id(&stem(word)) {
                    group.push((tid, 1.0));
                }
                if prefix && i == last {
                    for tid in self.terms.completions(word) {
                        if !group.iter().any(|(t, _)| *t == tid) {
                            group.push((tid, PREFIX_WEIGHT));
                        }
                    }
                }
                group
            })
            .collect()
    }

    fn score_tokens(&self, words: &[String], opts: &SearchOptions) -> Vec<(DocId, f32)> {
        let groups = self.expand(words, opts.prefix);
        let mut acc: HashMap<DocId, Acc> = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            for &(tid, weight) in group {
                let idf = self.terms.idf(tid);
                for p in self.terms.postings(tid) {
                    let contrib = weight * idf * (opts.title_boost * tf_weight(p.title_tf) + tf_weight(p.text_tf));
                    let a = acc.entry(p.doc_id).or_insert(Acc { score: 0.0, matched: 0, last_group: usize::MAX });
                    a.score += contrib;
                    if a.last_group != g {
                        a.last_group = g;
                        a.matched += 1;
                    }
                }
            }
        }
        let needed = match opts.combine {
            Combine::And => groups.len(),
            Combine::Or => 1,
        };
        acc.into_iter().filter(|(_, a)| a.matched >= needed).map(|(doc, a)| (doc, a.score)).collect()
    }

    fn score_substring(&self, query: &str, opts: &SearchOptions) -> Vec<(DocId, f32)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.index
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                let mut score = 0.0;
                if e.title.to_lowercase().contains(&needle) {
                    score += opts.title_boost;
                }
                if e.text.to_lowercase().contains(&needle) {
                    score += 1.0;
                }
                (score > 0.0).then_some((i as DocId, score))
            })
            .collect()
    }
}

fn tf_weight(tf: u32) -> f32 {
    if tf > 0 { 1.0 + (tf as f32).ln() } else { 0.0 }
}

fn query_words(query: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for (w, _) in tokenize_raw(query) {
        if !words.contains(&w) {
            words.push(w);
        }
    }
    words
}

fn hit_for(index: usize, score: f32, entry: &SearchEntry, words: &[String]) -> SearchHit {
    SearchHit {
        index,
        score,
        location: entry.location.clone(),
        page: entry.page.clone(),
        title: entry.title.clone(),
        category: entry.category,
        snippet: snippet(&entry.text, words),
    }
}

/// Window of `text` around the first query word, words wrapped in `<em>`.
pub fn snippet(text: &str, words: &[String]) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    // Lowercasing may change byte lengths; fall back to the start of the text then.
    let first_idx = if lower.len() == text.len() {
        words.iter().filter_map(|w| lower.find(w.as_str())).min()
    } else {
        None
    };
    let window = match first_idx {
        Some(idx) => {
            let start = floor_boundary(text, idx.saturating_sub(SNIPPET_BEFORE));
            let end = floor_boundary(text, (idx + SNIPPET_AFTER).min(text.len()));
            &text[start..end]
        }
        None => &text[..floor_boundary(text, SNIPPET_BEFORE + SNIPPET_AFTER)],
    };
    Some(highlight_terms(window, words))
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// HTML-escape `snippet` and wrap every occurrence of `terms` in `<em>`.
///
/// All terms go into one alternation, longest first, so a match never lands
/// inside markup added for another term.
pub fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut alts: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    alts.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    alts.dedup();
    let pattern = alts.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let pat = match regex::RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(pat) if !alts.is_empty() => pat,
        _ => return html_escape::encode_text(snippet).into_owned(),
    };

    let mut out = String::with_capacity(snippet.len() + 16);
    let mut last = 0;
    for m in pat.find_iter(snippet) {
        out.push_str(&html_escape::encode_text(&snippet[last..m.start()]));
        out.push_str("<em>");
        out.push_str(&html_escape::encode_text(m.as_str()));
        out.push_str("</em>");
        last = m.end();
    }
    out.push_str(&html_escape::encode_text(&snippet[last..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_is_case_insensitive() {
        let out = highlight_terms("Rust and rust", &["rust".to_string()]);
        assert_eq!(out, "<em>Rust</em> and <em>rust</em>");
    }

    #[test]
    fn highlight_never_matches_inside_its_own_markup() {
        let terms = ["run".to_string(), "em".to_string()];
        assert_eq!(highlight_terms("run the model", &terms), "<em>run</em> the model");
        assert_eq!(highlight_terms("item", &terms), "it<em>em</em>");
        let terms = ["install".to_string(), "m".to_string()];
        assert_eq!(highlight_terms("Install", &terms), "<em>Install</em>");
    }

    #[test]
    fn highlight_escapes_text_around_matches() {
        let out = highlight_terms("Vector{T} <: AbstractArray & more", &["abstractarray".to_string()]);
        assert_eq!(out, "Vector{T} &lt;: <em>AbstractArray</em> &amp; more");
        assert_eq!(highlight_terms("a < b", &[]), "a &lt; b");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}needle", "é".repeat(80));
        let s = snippet(&text, &["needle".to_string()]).unwrap();
        assert!(s.ends_with("<em>needle</em>"));
        assert!(snippet("", &["x".to_string()]).is_none());
    }

    #[test]
    fn query_words_are_deduplicated() {
        assert_eq!(query_words("Run the run RUN"), vec!["run"]);
        assert!(query_words("the and of").is_empty());
    }
}
