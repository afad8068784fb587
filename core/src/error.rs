use thiserror::Error;

/// Problems with the shape or encoding of a search index artifact.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    #[error("expected a `var <name> = {{...}}` assignment, found `{0}`")]
    NotAnAssignment(String),

    #[error("missing `docs` collection in index object")]
    MissingDocs,

    #[error("unsupported index format `{0}` (expected js, json or bincode)")]
    UnknownFormat(String),

    #[error("index failed validation with {0} error(s)")]
    Invalid(usize),
}
