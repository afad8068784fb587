//! Static documentation search index: record types, on-disk formats,
//! validation and a query engine over a loaded index.

pub mod entry;
pub mod error;
pub mod index;
pub mod location;
pub mod persist;
pub mod search;
pub mod tokenizer;
pub mod validate;

pub use entry::{Category, SearchEntry};
pub use error::IndexError;
pub use index::{DocId, IndexBuilder, InvertedIndex, Posting, SearchIndex, TermId};
pub use search::{Combine, SearchEngine, SearchHit, SearchOptions, SearchResults};
