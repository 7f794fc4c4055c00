//! Editor session for a single active document
//!
//! The session is the one owner of the annotation sequence: gesture commits
//! append to it, undo pops it, and the export transform reads it. Load and
//! export run behind an explicit phase so a second invocation while one is
//! in flight is refused instead of interleaving.

use tracing::{debug, info, warn};

use crate::annotation::{AnnotId, Annotation, AnnotationList};
use crate::coords::CanvasCalibration;
use crate::error::AnnotateError;
use crate::export::export_annotated;
use crate::gesture::{text_annotation, GestureTracker, Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Exporting,
}

/// Editing state for one loaded document.
#[derive(Debug)]
pub struct EditorSession {
    document_name: String,
    document_bytes: Vec<u8>,
    page_count: usize,
    annotations: AnnotationList,
    gesture: GestureTracker,
    calibration: CanvasCalibration,
    phase: SessionPhase,
}

impl EditorSession {
    /// Open a document from raw bytes. A parse failure establishes no
    /// session state.
    pub fn open(name: &str, bytes: Vec<u8>) -> Result<Self, AnnotateError> {
        let page_count = crate::page_count(&bytes).inspect_err(|e| {
            warn!(document = name, error = %e, "failed to load document");
        })?;
        info!(document = name, pages = page_count, "document loaded");

        Ok(Self {
            document_name: name.to_string(),
            document_bytes: bytes,
            page_count,
            annotations: AnnotationList::new(),
            gesture: GestureTracker::new(),
            calibration: CanvasCalibration::default(),
            phase: SessionPhase::Idle,
        })
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_bytes(&self) -> &[u8] {
        &self.document_bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn has_changes(&self) -> bool {
        !self.annotations.is_empty()
    }

    pub fn annotations(&self) -> &AnnotationList {
        &self.annotations
    }

    /// Annotations belonging to the visible page, in insertion order.
    pub fn annotations_on_page(&self, page: usize) -> Vec<&Annotation> {
        self.annotations.for_page(page)
    }

    pub fn calibration(&self) -> CanvasCalibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, calibration: CanvasCalibration) {
        self.calibration = calibration;
    }

    /// Pointer-down: start a drag gesture with the active tool.
    pub fn begin_stroke(&mut self, tool: Tool, page: usize, x: f64, y: f64, color: &str) {
        self.gesture.begin(tool, page, x, y, color);
    }

    /// Pointer-move: feed a position into the pending gesture.
    pub fn extend_stroke(&mut self, x: f64, y: f64) {
        self.gesture.extend(x, y);
    }

    /// Pointer-up: commit the gesture if it passes its check.
    pub fn finish_stroke(&mut self) -> Option<AnnotId> {
        let annotation = self.gesture.finish()?;
        let id = self.annotations.append(annotation);
        debug!(id, total = self.annotations.len(), "annotation committed");
        Some(id)
    }

    pub fn cancel_stroke(&mut self) {
        self.gesture.cancel();
    }

    /// Snapshot of the in-progress mark for live overlay rendering.
    pub fn stroke_preview(&self) -> Option<Annotation> {
        self.gesture.preview()
    }

    /// Commit free text from the floating input. Blank text is discarded.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_text(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        text: &str,
        font_size: f64,
        is_bold: bool,
        is_italic: bool,
        is_underline: bool,
        color: Option<String>,
    ) -> Option<AnnotId> {
        let annotation = text_annotation(
            page,
            x,
            y,
            text,
            font_size,
            is_bold,
            is_italic,
            is_underline,
            color,
        )?;
        Some(self.annotations.append(annotation))
    }

    /// Remove the most recently committed annotation. Not a full undo stack:
    /// only the last append can be taken back, and there is no redo.
    pub fn undo(&mut self) -> bool {
        self.annotations.remove_last().is_some()
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    /// Page dimensions as [x, y, width, height] for overlay sizing.
    pub fn page_dimensions(&self, page: usize) -> Result<[f64; 4], AnnotateError> {
        crate::page_dimensions(&self.document_bytes, page)
    }

    /// Swap in a new document, discarding the current annotation sequence.
    /// On a parse failure the current document and annotations are kept.
    pub fn replace_document(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), AnnotateError> {
        if self.phase != SessionPhase::Idle {
            return Err(AnnotateError::Busy("another operation is in flight"));
        }
        self.phase = SessionPhase::Loading;
        let result = crate::page_count(&bytes);
        self.phase = SessionPhase::Idle;

        match result {
            Ok(page_count) => {
                info!(document = name, pages = page_count, "document replaced");
                self.document_name = name.to_string();
                self.document_bytes = bytes;
                self.page_count = page_count;
                self.annotations.clear();
                self.gesture.cancel();
                Ok(())
            }
            Err(e) => {
                warn!(document = name, error = %e, "failed to load replacement document");
                Err(e)
            }
        }
    }

    /// Flatten the annotation sequence into the document and return the new
    /// bytes. Failure leaves the annotation sequence untouched, so the user
    /// is back in the annotated-but-not-exported state.
    pub fn export(&mut self) -> Result<Vec<u8>, AnnotateError> {
        if self.phase != SessionPhase::Idle {
            return Err(AnnotateError::Busy("another operation is in flight"));
        }
        self.phase = SessionPhase::Exporting;
        let result = export_annotated(&self.document_bytes, &self.annotations, &self.calibration);
        self.phase = SessionPhase::Idle;

        match &result {
            Ok(bytes) => info!(
                annotations = self.annotations.len(),
                output_bytes = bytes.len(),
                "export complete"
            ),
            Err(e) => warn!(error = %e, "export failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_test_pdf, create_test_pdf_with_pages};

    fn open_session() -> EditorSession {
        EditorSession::open("test.pdf", create_test_pdf()).unwrap()
    }

    #[test]
    fn test_open_parses_page_count() {
        let session = EditorSession::open("two.pdf", create_test_pdf_with_pages(2)).unwrap();
        assert_eq!(session.page_count(), 2);
        assert_eq!(session.document_name(), "two.pdf");
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.has_changes());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let err = EditorSession::open("bad.pdf", vec![0u8; 32]).unwrap_err();
        assert!(matches!(err, AnnotateError::Parse(_)));
    }

    #[test]
    fn test_stroke_commit_appends() {
        let mut session = open_session();
        session.begin_stroke(Tool::Draw, 0, 10.0, 10.0, "#000000");
        session.extend_stroke(20.0, 20.0);

        let id = session.finish_stroke().expect("two-point stroke commits");
        assert!(session.has_changes());
        assert_eq!(session.annotations_on_page(0)[0].id(), id);
    }

    #[test]
    fn test_discarded_gesture_stores_nothing() {
        let mut session = open_session();
        session.begin_stroke(Tool::Highlight, 0, 10.0, 10.0, "#FFFF00");
        session.extend_stroke(10.0, 50.0); // zero width

        assert!(session.finish_stroke().is_none());
        assert!(!session.has_changes());
    }

    #[test]
    fn test_commit_text_rejects_blank() {
        let mut session = open_session();
        assert!(session
            .commit_text(0, 1.0, 2.0, "  ", 16.0, false, false, false, None)
            .is_none());
        assert!(session
            .commit_text(0, 1.0, 2.0, "Hi", 16.0, false, false, false, None)
            .is_some());
    }

    #[test]
    fn test_undo_pops_last_append_only() {
        let mut session = open_session();
        session
            .commit_text(0, 1.0, 2.0, "first", 16.0, false, false, false, None)
            .unwrap();
        session
            .commit_text(0, 1.0, 2.0, "second", 16.0, false, false, false, None)
            .unwrap();

        assert!(session.undo());
        let remaining = session.annotations_on_page(0);
        assert_eq!(remaining.len(), 1);
        match remaining[0] {
            Annotation::Text { text, .. } => assert_eq!(text.as_str(), "first"),
            other => panic!("expected the first text annotation, got {:?}", other),
        }

        assert!(session.undo());
        assert!(!session.undo(), "undo on an empty sequence is a no-op");
    }

    #[test]
    fn test_export_failure_is_non_destructive() {
        let mut session = open_session();
        session
            .commit_text(5, 1.0, 2.0, "lost page", 16.0, false, false, false, None)
            .unwrap();

        let err = session.export().unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::InvalidPage {
                page: 5,
                page_count: 1
            }
        ));
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.phase(), SessionPhase::Idle);

        // The session still works: fix the state and export again.
        session.undo();
        session
            .commit_text(0, 1.0, 2.0, "kept", 16.0, false, false, false, None)
            .unwrap();
        let bytes = session.export().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_export_with_no_annotations_roundtrips() {
        let mut session = open_session();
        let bytes = session.export().unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_replace_document_clears_annotations() {
        let mut session = open_session();
        session
            .commit_text(0, 1.0, 2.0, "old", 16.0, false, false, false, None)
            .unwrap();

        session
            .replace_document("next.pdf", create_test_pdf_with_pages(3))
            .unwrap();
        assert_eq!(session.document_name(), "next.pdf");
        assert_eq!(session.page_count(), 3);
        assert!(!session.has_changes());
    }

    #[test]
    fn test_replace_failure_keeps_current_document() {
        let mut session = open_session();
        session
            .commit_text(0, 1.0, 2.0, "keep me", 16.0, false, false, false, None)
            .unwrap();

        let err = session
            .replace_document("bad.pdf", b"not a pdf".to_vec())
            .unwrap_err();
        assert!(matches!(err, AnnotateError::Parse(_)));
        assert_eq!(session.document_name(), "test.pdf");
        assert_eq!(session.page_count(), 1);
        assert!(session.has_changes());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_page_dimensions() {
        let session = open_session();
        let dims = session.page_dimensions(0).unwrap();
        assert_eq!(dims, [0.0, 0.0, 612.0, 792.0]);

        let err = session.page_dimensions(4).unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidPage { .. }));
    }
}
