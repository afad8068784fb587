use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // `.` and `-` separate words, so `Engine.run-all` yields three words.
    static ref WORD: Regex = Regex::new(r"(?u)[\p{L}\p{N}_][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","it's","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Lower-cased words with stopwords removed, unstemmed. Positions count every
/// word, including the dropped stopwords.
pub fn tokenize_raw(text: &str) -> Vec<(String, usize)> {
    let normalized = normalize(text);
    WORD.find_iter(&normalized)
        .enumerate()
        .filter(|(_, m)| !is_stopword(m.as_str()))
        .map(|(pos, m)| (m.as_str().to_string(), pos))
        .collect()
}

/// Tokenize text into (term, position): NFKC, lowercase, stopword removal, stemming.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    tokenize_raw(text)
        .into_iter()
        .map(|(word, pos)| (stem(&word), pos))
        .collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).to_string()
}
