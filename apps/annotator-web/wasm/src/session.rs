//! Annotation session exposed to JavaScript
//!
//! This module provides a WASM-exposed session for annotating a single PDF.
//! It wraps the core `EditorSession`; gesture events and toolbar state come
//! in from the overlay, the flattened PDF bytes go back out for download.

use js_sys::Uint8Array;
use pdfannot_core::{AnnotateError, CanvasCalibration, EditorSession, Tool};
use wasm_bindgen::prelude::*;

fn js_err(e: AnnotateError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Map a toolbar tool name to the capture tool.
fn parse_tool(name: &str) -> Tool {
    match name.to_lowercase().as_str() {
        "draw" => Tool::Draw,
        "highlight" => Tool::Highlight,
        "text" => Tool::Text,
        "signature" => Tool::Signature,
        _ => Tool::Draw, // Default fallback
    }
}

/// Session for annotating a single PDF document
#[wasm_bindgen]
pub struct AnnotateSession {
    inner: EditorSession,
}

#[wasm_bindgen]
impl AnnotateSession {
    /// Create a new session with the given PDF
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<AnnotateSession, JsValue> {
        let inner = EditorSession::open(name, bytes.to_vec()).map_err(js_err)?;
        Ok(AnnotateSession { inner })
    }

    /// Get page count
    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.page_count() as u32
    }

    /// Get document name
    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.inner.document_name().to_string()
    }

    /// Check if there are uncommitted-to-file annotations
    #[wasm_bindgen(getter, js_name = hasChanges)]
    pub fn has_changes(&self) -> bool {
        self.inner.has_changes()
    }

    /// Get document bytes for PDF.js rendering
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> Uint8Array {
        let bytes = self.inner.document_bytes();
        let array = Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(bytes);
        array
    }

    /// Pointer-down: start a drag gesture with the active tool.
    /// Tool values: "draw", "highlight", "text", "signature"
    #[wasm_bindgen(js_name = beginStroke)]
    pub fn begin_stroke(&mut self, tool: &str, page: u32, x: f64, y: f64, color: &str) {
        self.inner
            .begin_stroke(parse_tool(tool), page as usize, x, y, color);
    }

    /// Pointer-move: feed a position into the pending gesture.
    #[wasm_bindgen(js_name = extendStroke)]
    pub fn extend_stroke(&mut self, x: f64, y: f64) {
        self.inner.extend_stroke(x, y);
    }

    /// Pointer-up: returns true when the gesture passed its commit check
    /// and was stored.
    #[wasm_bindgen(js_name = finishStroke)]
    pub fn finish_stroke(&mut self) -> bool {
        self.inner.finish_stroke().is_some()
    }

    /// Drop the pending gesture without committing.
    #[wasm_bindgen(js_name = cancelStroke)]
    pub fn cancel_stroke(&mut self) {
        self.inner.cancel_stroke();
    }

    /// Commit free text from the floating input. Returns false for blank
    /// text, which is discarded.
    #[wasm_bindgen(js_name = commitText)]
    #[allow(clippy::too_many_arguments)]
    pub fn commit_text(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        text: &str,
        font_size: f64,
        is_bold: bool,
        is_italic: bool,
        is_underline: bool,
        color: Option<String>,
    ) -> bool {
        self.inner
            .commit_text(
                page as usize,
                x,
                y,
                text,
                font_size,
                is_bold,
                is_italic,
                is_underline,
                color,
            )
            .is_some()
    }

    /// Remove the most recently added annotation. Returns false when there
    /// was nothing to remove.
    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    /// Drop every annotation (document discarded in the UI).
    #[wasm_bindgen(js_name = clearAnnotations)]
    pub fn clear_annotations(&mut self) {
        self.inner.clear_annotations();
    }

    /// Committed annotations for one page as a JSON array, for the overlay.
    #[wasm_bindgen(js_name = annotationsJson)]
    pub fn annotations_json(&self, page: u32) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.annotations_on_page(page as usize))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// The in-progress mark as JSON, or null when no gesture is pending.
    #[wasm_bindgen(js_name = previewJson)]
    pub fn preview_json(&self) -> Option<String> {
        let preview = self.inner.stroke_preview()?;
        serde_json::to_string(&preview).ok()
    }

    /// Page dimensions for overlay sizing (zero-based page index).
    #[wasm_bindgen(js_name = pageDimensions)]
    pub fn page_dimensions(&self, page: u32) -> Result<JsValue, JsValue> {
        let dims = self
            .inner
            .page_dimensions(page as usize)
            .map_err(js_err)?;

        let result = js_sys::Object::new();
        js_sys::Reflect::set(&result, &"x".into(), &dims[0].into())?;
        js_sys::Reflect::set(&result, &"y".into(), &dims[1].into())?;
        js_sys::Reflect::set(&result, &"width".into(), &dims[2].into())?;
        js_sys::Reflect::set(&result, &"height".into(), &dims[3].into())?;
        Ok(result.into())
    }

    /// Override the screen-to-page correction constants. Required when the
    /// rendering surface's scale factor differs from the default pipeline.
    #[wasm_bindgen(js_name = setCalibration)]
    pub fn set_calibration(&mut self, x_offset: f64, text_baseline_offset: f64) {
        self.inner.set_calibration(CanvasCalibration {
            x_offset,
            text_baseline_offset,
        });
    }

    /// Load a different document into this session, discarding all
    /// annotations. On failure the current document is kept.
    #[wasm_bindgen(js_name = replaceDocument)]
    pub fn replace_document(&mut self, name: &str, bytes: &[u8]) -> Result<(), JsValue> {
        self.inner
            .replace_document(name, bytes.to_vec())
            .map_err(js_err)
    }

    /// Flatten all annotations into the document and return the new PDF
    /// bytes. The caller hands these to the download trigger.
    pub fn export(&mut self) -> Result<Uint8Array, JsValue> {
        let bytes = self.inner.export().map_err(js_err)?;
        let array = Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(&bytes);
        Ok(array)
    }
}
