use crate::entry::{Category, SearchEntry};
use crate::tokenizer::{stem, tokenize_raw};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

pub type TermId = u32;
/// Position of an entry in its [`SearchIndex`].
pub type DocId = u32;

/// The ordered collection of entries, serialized as `{"docs": [...]}`.
///
/// Built once through [`IndexBuilder`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    docs: Vec<SearchEntry>,
}

impl SearchIndex {
    pub fn builder() -> IndexBuilder {
        IndexBuilder::default()
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn get(&self, i: usize) -> Option<&SearchEntry> { self.docs.get(i) }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchEntry> { self.docs.iter() }

    pub fn entries(&self) -> &[SearchEntry] { &self.docs }

    /// Distinct page labels in first-seen order.
    pub fn pages(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for e in &self.docs {
            if !seen.contains(&e.page.as_str()) {
                seen.push(e.page.as_str());
            }
        }
        seen
    }

    pub fn entries_for_page<'a>(&'a self, page: &'a str) -> impl Iterator<Item = &'a SearchEntry> + 'a {
        self.docs.iter().filter(move |e| e.page == page)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &SearchEntry> + '_ {
        self.docs.iter().filter(move |e| e.category == category)
    }

    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.docs {
            *counts.entry(e.category).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a SearchIndex {
    type Item = &'a SearchEntry;
    type IntoIter = std::slice::Iter<'a, SearchEntry>;

    fn into_iter(self) -> Self::IntoIter { self.docs.iter() }
}

/// Appends entries in processing order, then freezes them into a [`SearchIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    docs: Vec<SearchEntry>,
}

impl IndexBuilder {
    pub fn push(&mut self, entry: SearchEntry) -> &mut Self {
        self.docs.push(entry);
        self
    }

    pub fn push_page(&mut self, location: &str, page: &str, text: &str) -> &mut Self {
        self.push(SearchEntry::page(location, page, text))
    }

    pub fn push_section(&mut self, location: &str, page: &str, title: &str) -> &mut Self {
        self.push(SearchEntry::section(location, page, title))
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn finish(self) -> SearchIndex {
        SearchIndex { docs: self.docs }
    }
}

impl Extend<SearchEntry> for IndexBuilder {
    fn extend<T: IntoIterator<Item = SearchEntry>>(&mut self, iter: T) {
        self.docs.extend(iter);
    }
}

impl FromIterator<SearchEntry> for SearchIndex {
    fn from_iter<T: IntoIterator<Item = SearchEntry>>(iter: T) -> Self {
        SearchIndex { docs: iter.into_iter().collect() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub title_tf: u32,
    pub text_tf: u32,
}

/// Term dictionary over the title and text of every entry.
///
/// Both maps are ordered so prefix lookups are a range scan. `dictionary`
/// holds stems; `words` maps every unstemmed surface word to its stem's id,
/// so a partly typed word still completes when it is longer than its stem.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    pub dictionary: BTreeMap<String, TermId>,
    pub words: BTreeMap<String, TermId>,
    pub df: Vec<u32>,
    pub postings: Vec<Vec<Posting>>, // sorted by doc_id
    pub num_docs: u32,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn build(index: &SearchIndex) -> Self {
        let mut inv = InvertedIndex::new();
        for (doc_id, entry) in index.iter().enumerate() {
            let doc_id = doc_id as DocId;
            let mut counts: HashMap<TermId, (u32, u32)> = HashMap::new();
            for (word, _pos) in tokenize_raw(&entry.title) {
                let tid = inv.intern(word);
                counts.entry(tid).or_insert((0, 0)).0 += 1;
            }
            for (word, _pos) in tokenize_raw(&entry.text) {
                let tid = inv.intern(word);
                counts.entry(tid).or_insert((0, 0)).1 += 1;
            }
            for (tid, (title_tf, text_tf)) in counts {
                inv.df[tid as usize] += 1;
                inv.postings[tid as usize].push(Posting { doc_id, title_tf, text_tf });
            }
        }
        for plist in inv.postings.iter_mut() {
            plist.sort_by_key(|p| p.doc_id);
        }
        inv.num_docs = index.len() as u32;
        tracing::debug!(num_docs = inv.num_docs, num_terms = inv.dictionary.len(), "built term index");
        inv
    }

    fn intern(&mut self, word: String) -> TermId {
        if let Some(&tid) = self.words.get(&word) {
            return tid;
        }
        let term = stem(&word);
        let tid = match self.dictionary.get(&term) {
            Some(&tid) => tid,
            None => {
                let tid = self.df.len() as TermId;
                self.dictionary.insert(term, tid);
                self.df.push(0);
                self.postings.push(Vec::new());
                tid
            }
        };
        self.words.insert(word, tid);
        tid
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    /// Every stem starting with `prefix`, in dictionary order.
    pub fn terms_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, TermId)> + 'a {
        prefix_scan(&self.dictionary, prefix)
    }

    /// Term ids whose stem or any indexed surface word starts with `prefix`,
    /// each reported once.
    pub fn completions(&self, prefix: &str) -> Vec<TermId> {
        let mut out: Vec<TermId> = Vec::new();
        for (_, tid) in prefix_scan(&self.dictionary, prefix).chain(prefix_scan(&self.words, prefix)) {
            if !out.contains(&tid) {
                out.push(tid);
            }
        }
        out
    }

    pub fn postings(&self, tid: TermId) -> &[Posting] {
        self.postings.get(tid as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn idf(&self, tid: TermId) -> f32 {
        let n = self.num_docs.max(1) as f32;
        let df_t = self.df.get(tid as usize).copied().unwrap_or(1).max(1) as f32;
        (1.0 + n / df_t).ln()
    }
}

fn prefix_scan<'a>(map: &'a BTreeMap<String, TermId>, prefix: &'a str) -> impl Iterator<Item = (&'a str, TermId)> + 'a {
    map.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(t, _)| t.starts_with(prefix))
        .map(|(t, &id)| (t.as_str(), id))
}
