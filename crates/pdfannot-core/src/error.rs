use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Annotation targets page {page} but the document has {page_count} pages")]
    InvalidPage { page: usize, page_count: usize },

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Session is busy: {0}")]
    Busy(&'static str),
}
