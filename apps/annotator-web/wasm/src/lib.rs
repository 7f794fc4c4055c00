//! Annotator - client-side PDF annotation
//!
//! WASM bindings over `pdfannot-core` for the browser front end. The page
//! viewer, upload widget, toolbar, and download trigger live in JavaScript;
//! this crate owns the annotation state and the export transform.

use wasm_bindgen::prelude::*;

pub mod session;

pub use session::AnnotateSession;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Annotator WASM initialized".into());
}
