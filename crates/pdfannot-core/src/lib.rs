//! Client-side PDF annotation engine
//!
//! This crate holds the annotation model for a single editing session and
//! the export transform that flattens the captured marks into the PDF's page
//! content streams:
//! - `annotation`: the ordered in-memory annotation sequence
//! - `gesture`: pointer-gesture capture and commit-time checks
//! - `coords`: screen-space to PDF-user-space conversion
//! - `export`: the pure (bytes, annotations) -> bytes transform
//! - `session`: single-owner editor state with a busy/idle guard

pub mod annotation;
pub mod coords;
pub mod error;
pub mod export;
pub mod gesture;
pub mod session;

pub use annotation::{AnnotId, Annotation, AnnotationList};
pub use coords::CanvasCalibration;
pub use error::AnnotateError;
pub use export::export_annotated;
pub use gesture::{text_annotation, GestureTracker, Tool};
pub use session::{EditorSession, SessionPhase};

use lopdf::{Document, ObjectId};

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<usize, AnnotateError> {
    let doc = Document::load_mem(bytes).map_err(|e| AnnotateError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len())
}

/// Dimensions of a page (zero-based index) as [x, y, width, height].
pub fn page_dimensions(bytes: &[u8], page: usize) -> Result<[f64; 4], AnnotateError> {
    let doc = Document::load_mem(bytes).map_err(|e| AnnotateError::Parse(e.to_string()))?;
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let page_id = pages
        .get(page)
        .copied()
        .ok_or(AnnotateError::InvalidPage {
            page,
            page_count: pages.len(),
        })?;
    export::media_box(&doc, page_id)
}
