//! Flattening annotations into PDF page content streams
//!
//! The export transform is a pure function from (original PDF bytes,
//! annotation sequence) to annotated PDF bytes. Each annotation is drawn
//! into its target page's content stream; nothing is written anywhere else.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::annotation::{Annotation, AnnotationList};
use crate::coords::CanvasCalibration;
use crate::error::AnnotateError;

/// Resource name for the regular text font (Helvetica).
const FONT_REGULAR: &str = "AnF1";
/// Resource name for the bold text font (Helvetica-Bold).
const FONT_BOLD: &str = "AnF2";
/// Resource name for the half-opacity graphics state used by highlights.
const GS_HIGHLIGHT: &str = "AnGS";

const HIGHLIGHT_OPACITY: f32 = 0.5;
const STROKE_WIDTH: f64 = 2.0;

/// Parse a hex color string (e.g. "#FF0000" or "FF0000") to RGB floats in
/// the [0, 1] range. Malformed strings fall back to black.
fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() >= 6 {
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0) as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0) as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0) as f32 / 255.0;
        (r, g, b)
    } else {
        (0.0, 0.0, 0.0)
    }
}

/// Escape special characters for PDF string literals.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Which shared resources a page's drawn content refers to.
#[derive(Debug, Clone, Copy, Default)]
struct PageNeeds {
    regular_font: bool,
    bold_font: bool,
    highlight_alpha: bool,
}

impl PageNeeds {
    fn any(&self) -> bool {
        self.regular_font || self.bold_font || self.highlight_alpha
    }
}

/// Document-wide objects shared by every page that needs them.
#[derive(Debug, Default)]
struct SharedObjects {
    regular_font: Option<ObjectId>,
    bold_font: Option<ObjectId>,
    highlight_gs: Option<ObjectId>,
}

/// Draw every annotation into its page's content stream and re-serialize.
///
/// Page indices are validated for the whole sequence before any page is
/// mutated, so a failed export never produces partial output. An empty
/// sequence still round-trips the document through the parser; the output is
/// a re-serialization, not a byte-for-byte copy.
pub fn export_annotated(
    pdf_bytes: &[u8],
    annotations: &AnnotationList,
    calibration: &CanvasCalibration,
) -> Result<Vec<u8>, AnnotateError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| AnnotateError::Parse(e.to_string()))?;

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for annotation in annotations.iter() {
        if annotation.page() >= pages.len() {
            return Err(AnnotateError::InvalidPage {
                page: annotation.page(),
                page_count: pages.len(),
            });
        }
    }

    let mut content: Vec<String> = vec![String::new(); pages.len()];
    let mut needs: Vec<PageNeeds> = vec![PageNeeds::default(); pages.len()];

    for annotation in annotations.iter() {
        let idx = annotation.page();
        let height = page_height(&doc, pages[idx])?;
        draw_annotation(
            &mut content[idx],
            &mut needs[idx],
            annotation,
            height,
            calibration,
        );
    }

    let shared = install_shared_objects(&mut doc, &needs);

    for (idx, page_id) in pages.iter().enumerate() {
        if content[idx].is_empty() {
            continue;
        }
        install_page_resources(&mut doc, *page_id, &needs[idx], &shared)?;
        let wrapped = format!("q\n{}Q\n", content[idx]);
        append_content_stream(&mut doc, *page_id, wrapped.into_bytes())?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| AnnotateError::Operation(e.to_string()))?;
    Ok(output)
}

fn draw_annotation(
    buf: &mut String,
    needs: &mut PageNeeds,
    annotation: &Annotation,
    page_height: f64,
    calibration: &CanvasCalibration,
) {
    match annotation {
        Annotation::Highlight {
            x,
            y,
            width,
            height,
            color,
            ..
        } => {
            needs.highlight_alpha = true;
            // Normalize the drag rect while still in screen space.
            let (sx, sw) = if *width < 0.0 {
                (x + width, -width)
            } else {
                (*x, *width)
            };
            let (sy, sh) = if *height < 0.0 {
                (y + height, -height)
            } else {
                (*y, *height)
            };
            let (px, py) = calibration.to_page(sx, sy, page_height);
            let (r, g, b) = parse_hex_color(color);
            // py is the rect's top edge; `re` is anchored at the bottom edge.
            buf.push_str(&format!(
                "q\n/{GS_HIGHLIGHT} gs\n{r} {g} {b} rg\n{px} {bottom} {sw} {sh} re f\nQ\n",
                bottom = py - sh,
            ));
        }
        Annotation::Text {
            x,
            y,
            text,
            font_size,
            is_bold,
            color,
            ..
        } => {
            // Only the bold flag selects a different base font; italic and
            // underline are carried in the model but do not change the
            // exported output.
            let font = if *is_bold {
                needs.bold_font = true;
                FONT_BOLD
            } else {
                needs.regular_font = true;
                FONT_REGULAR
            };
            let (px, py) = calibration.to_page_text(*x, *y, page_height);
            let (r, g, b) = color
                .as_deref()
                .map(parse_hex_color)
                .unwrap_or((0.0, 0.0, 0.0));
            buf.push_str(&format!(
                "BT\n/{font} {font_size} Tf\n{r} {g} {b} rg\n{px} {py} Td\n({escaped}) Tj\nET\n",
                escaped = escape_pdf_string(text),
            ));
        }
        Annotation::Draw { points, color, .. } => {
            let rgb = color
                .as_deref()
                .map(parse_hex_color)
                .unwrap_or((0.0, 0.0, 0.0));
            draw_polyline(buf, points, rgb, page_height, calibration);
        }
        // A signature stroke is always black, whatever was on the palette.
        Annotation::Signature { points, .. } => {
            draw_polyline(buf, points, (0.0, 0.0, 0.0), page_height, calibration);
        }
    }
}

/// Stroke a polyline as N-1 independent line segments, each endpoint
/// transformed identically.
fn draw_polyline(
    buf: &mut String,
    points: &[f64],
    (r, g, b): (f32, f32, f32),
    page_height: f64,
    calibration: &CanvasCalibration,
) {
    if points.len() < 4 {
        return;
    }
    buf.push_str(&format!("{r} {g} {b} RG\n{STROKE_WIDTH} w\n"));
    let mut i = 0;
    while i + 3 < points.len() {
        let (x1, y1) = calibration.to_page(points[i], points[i + 1], page_height);
        let (x2, y2) = calibration.to_page(points[i + 2], points[i + 3], page_height);
        buf.push_str(&format!("{x1} {y1} m\n{x2} {y2} l\nS\n"));
        i += 2;
    }
}

/// Add the font and graphics-state objects referenced by any page, once.
fn install_shared_objects(doc: &mut Document, needs: &[PageNeeds]) -> SharedObjects {
    let mut shared = SharedObjects::default();
    if needs.iter().any(|n| n.regular_font) {
        shared.regular_font = Some(add_standard_font(doc, b"Helvetica"));
    }
    if needs.iter().any(|n| n.bold_font) {
        shared.bold_font = Some(add_standard_font(doc, b"Helvetica-Bold"));
    }
    if needs.iter().any(|n| n.highlight_alpha) {
        let mut gs = Dictionary::new();
        gs.set("Type", Object::Name(b"ExtGState".to_vec()));
        gs.set("ca", Object::Real(HIGHLIGHT_OPACITY));
        gs.set("CA", Object::Real(HIGHLIGHT_OPACITY));
        shared.highlight_gs = Some(doc.add_object(Object::Dictionary(gs)));
    }
    shared
}

fn add_standard_font(doc: &mut Document, base_font: &[u8]) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Where a page's resource dictionary can be mutated.
enum ResourcesSlot {
    /// `Resources` is a dictionary directly inside the page dictionary.
    PageDirect,
    /// `Resources` is an indirect reference to this object.
    Indirect(ObjectId),
}

fn install_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    needs: &PageNeeds,
    shared: &SharedObjects,
) -> Result<(), AnnotateError> {
    if !needs.any() {
        return Ok(());
    }

    let slot = prepare_resources_slot(doc, page_id)?;

    if let (true, Some(font_id)) = (needs.regular_font, shared.regular_font) {
        set_resource_entry(doc, &slot, page_id, b"Font", FONT_REGULAR, font_id)?;
    }
    if let (true, Some(font_id)) = (needs.bold_font, shared.bold_font) {
        set_resource_entry(doc, &slot, page_id, b"Font", FONT_BOLD, font_id)?;
    }
    if let (true, Some(gs_id)) = (needs.highlight_alpha, shared.highlight_gs) {
        set_resource_entry(doc, &slot, page_id, b"ExtGState", GS_HIGHLIGHT, gs_id)?;
    }
    Ok(())
}

/// Locate the page's resource dictionary, materializing one on the page when
/// it is missing. Inherited resources are cloned onto the page first so
/// additions don't leak into sibling pages.
fn prepare_resources_slot(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<ResourcesSlot, AnnotateError> {
    enum Probe {
        Direct,
        Reference(ObjectId),
        Missing,
    }

    let probe = {
        let dict = page_dict(doc, page_id)?;
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(_)) => Probe::Direct,
            Ok(Object::Reference(id)) => Probe::Reference(*id),
            _ => Probe::Missing,
        }
    };

    match probe {
        Probe::Direct => Ok(ResourcesSlot::PageDirect),
        Probe::Reference(id) => {
            doc.get_object(id)
                .map_err(|e| AnnotateError::Operation(e.to_string()))?
                .as_dict()
                .map_err(|_| {
                    AnnotateError::Operation("Resources reference is not a dictionary".to_string())
                })?;
            Ok(ResourcesSlot::Indirect(id))
        }
        Probe::Missing => {
            let inherited = inherited_resources(doc, page_id);
            let page = page_dict_mut(doc, page_id)?;
            page.set("Resources", Object::Dictionary(inherited));
            Ok(ResourcesSlot::PageDirect)
        }
    }
}

/// Resources inherited from the page tree node, cloned. Empty when nothing
/// is found up the parent link.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    if let Ok(dict) = page_dict(doc, page_id) {
        if let Ok(parent_ref) = dict.get(b"Parent") {
            if let Ok(parent_id) = parent_ref.as_reference() {
                if let Ok(parent) = doc.get_object(parent_id) {
                    if let Ok(parent_dict) = parent.as_dict() {
                        match parent_dict.get(b"Resources") {
                            Ok(Object::Dictionary(d)) => return d.clone(),
                            Ok(Object::Reference(rid)) => {
                                if let Ok(resolved) = doc.get_object(*rid) {
                                    if let Ok(rdict) = resolved.as_dict() {
                                        return rdict.clone();
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }
    Dictionary::new()
}

/// Set `Resources/<category>/<name>` to a reference, creating the category
/// sub-dictionary when absent and following it when indirect.
fn set_resource_entry(
    doc: &mut Document,
    slot: &ResourcesSlot,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: ObjectId,
) -> Result<(), AnnotateError> {
    // The category sub-dictionary may itself be an indirect reference.
    let category_ref = {
        let resources = resources_dict(doc, slot, page_id)?;
        match resources.get(category) {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(id) = category_ref {
        let dict = doc
            .get_object_mut(id)
            .map_err(|e| AnnotateError::Operation(e.to_string()))?
            .as_dict_mut()
            .map_err(|_| {
                AnnotateError::Operation("resource category is not a dictionary".to_string())
            })?;
        dict.set(name, Object::Reference(target));
        return Ok(());
    }

    let resources = resources_dict_mut(doc, slot, page_id)?;
    match resources.get_mut(category) {
        Ok(Object::Dictionary(dict)) => {
            dict.set(name, Object::Reference(target));
        }
        _ => {
            let mut dict = Dictionary::new();
            dict.set(name, Object::Reference(target));
            resources.set(category, Object::Dictionary(dict));
        }
    }
    Ok(())
}

fn resources_dict<'a>(
    doc: &'a Document,
    slot: &ResourcesSlot,
    page_id: ObjectId,
) -> Result<&'a Dictionary, AnnotateError> {
    match slot {
        ResourcesSlot::PageDirect => match page_dict(doc, page_id)?.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(AnnotateError::Operation(
                "page has no direct resource dictionary".to_string(),
            )),
        },
        ResourcesSlot::Indirect(id) => doc
            .get_object(*id)
            .map_err(|e| AnnotateError::Operation(e.to_string()))?
            .as_dict()
            .map_err(|_| {
                AnnotateError::Operation("Resources reference is not a dictionary".to_string())
            }),
    }
}

fn resources_dict_mut<'a>(
    doc: &'a mut Document,
    slot: &ResourcesSlot,
    page_id: ObjectId,
) -> Result<&'a mut Dictionary, AnnotateError> {
    match slot {
        ResourcesSlot::PageDirect => match page_dict_mut(doc, page_id)?.get_mut(b"Resources") {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(AnnotateError::Operation(
                "page has no direct resource dictionary".to_string(),
            )),
        },
        ResourcesSlot::Indirect(id) => doc
            .get_object_mut(*id)
            .map_err(|e| AnnotateError::Operation(e.to_string()))?
            .as_dict_mut()
            .map_err(|_| {
                AnnotateError::Operation("Resources reference is not a dictionary".to_string())
            }),
    }
}

/// Append a new content stream to the page, preserving whatever streams are
/// already there.
fn append_content_stream(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), AnnotateError> {
    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    enum Plan {
        Absent,
        DirectArray,
        RefArray(ObjectId),
        Single(Object),
    }

    let plan = {
        let dict = page_dict(doc, page_id)?;
        match dict.get(b"Contents") {
            Err(_) => Plan::Absent,
            Ok(Object::Array(_)) => Plan::DirectArray,
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(_)) => Plan::RefArray(*id),
                _ => Plan::Single(Object::Reference(*id)),
            },
            Ok(other) => Plan::Single(other.clone()),
        }
    };

    match plan {
        Plan::Absent => {
            let page = page_dict_mut(doc, page_id)?;
            page.set("Contents", Object::Reference(stream_id));
        }
        Plan::DirectArray => {
            let page = page_dict_mut(doc, page_id)?;
            match page.get_mut(b"Contents") {
                Ok(Object::Array(arr)) => arr.push(Object::Reference(stream_id)),
                _ => {
                    return Err(AnnotateError::Operation(
                        "page Contents array disappeared".to_string(),
                    ))
                }
            }
        }
        Plan::RefArray(array_id) => {
            let obj = doc
                .get_object_mut(array_id)
                .map_err(|e| AnnotateError::Operation(e.to_string()))?;
            match obj {
                Object::Array(arr) => arr.push(Object::Reference(stream_id)),
                _ => {
                    return Err(AnnotateError::Operation(
                        "page Contents reference is not an array".to_string(),
                    ))
                }
            }
        }
        Plan::Single(existing) => {
            // A stream stored inline in the page dictionary has to move to
            // its own object before it can sit in a Contents array.
            let first = match existing {
                Object::Reference(_) => existing,
                other => Object::Reference(doc.add_object(other)),
            };
            let page = page_dict_mut(doc, page_id)?;
            page.set(
                "Contents",
                Object::Array(vec![first, Object::Reference(stream_id)]),
            );
        }
    }
    Ok(())
}

fn page_dict<'a>(doc: &'a Document, page_id: ObjectId) -> Result<&'a Dictionary, AnnotateError> {
    doc.get_object(page_id)
        .map_err(|e| AnnotateError::Operation(e.to_string()))?
        .as_dict()
        .map_err(|_| AnnotateError::Operation("Page is not a dictionary".to_string()))
}

fn page_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
) -> Result<&'a mut Dictionary, AnnotateError> {
    doc.get_object_mut(page_id)
        .map_err(|e| AnnotateError::Operation(e.to_string()))?
        .as_dict_mut()
        .map_err(|_| AnnotateError::Operation("Page is not a dictionary".to_string()))
}

/// Height of a page in user-space units, from its MediaBox.
fn page_height(doc: &Document, page_id: ObjectId) -> Result<f64, AnnotateError> {
    let rect = media_box(doc, page_id)?;
    Ok(rect[3])
}

/// MediaBox as [x, y, width, height], falling back to the parent node and
/// finally to US Letter.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4], AnnotateError> {
    let dict = page_dict(doc, page_id)?;

    if let Ok(media_box) = dict.get(b"MediaBox") {
        return parse_rect(doc, media_box);
    }

    if let Ok(parent_ref) = dict.get(b"Parent") {
        if let Ok(parent_id) = parent_ref.as_reference() {
            if let Ok(parent) = doc.get_object(parent_id) {
                if let Ok(parent_dict) = parent.as_dict() {
                    if let Ok(media_box) = parent_dict.get(b"MediaBox") {
                        return parse_rect(doc, media_box);
                    }
                }
            }
        }
    }

    Ok([0.0, 0.0, 612.0, 792.0])
}

/// Parse a PDF rectangle array into [x, y, width, height].
fn parse_rect(doc: &Document, obj: &Object) -> Result<[f64; 4], AnnotateError> {
    let arr = match obj {
        Object::Array(a) => a,
        Object::Reference(id) => {
            let resolved = doc
                .get_object(*id)
                .map_err(|e| AnnotateError::Operation(e.to_string()))?;
            resolved.as_array().map_err(|_| {
                AnnotateError::Operation("MediaBox reference is not an array".to_string())
            })?
        }
        _ => {
            return Err(AnnotateError::Operation(
                "MediaBox is not an array".to_string(),
            ))
        }
    };

    if arr.len() != 4 {
        return Err(AnnotateError::Operation(format!(
            "MediaBox has {} elements, expected 4",
            arr.len()
        )));
    }

    let mut values = [0.0f64; 4];
    for (i, obj) in arr.iter().enumerate() {
        values[i] = extract_number(doc, obj)?;
    }

    Ok([
        values[0],
        values[1],
        values[2] - values[0],
        values[3] - values[1],
    ])
}

fn extract_number(doc: &Document, obj: &Object) -> Result<f64, AnnotateError> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(*r as f64),
        Object::Reference(id) => {
            let resolved = doc
                .get_object(*id)
                .map_err(|e| AnnotateError::Operation(e.to_string()))?;
            extract_number(doc, resolved)
        }
        _ => Err(AnnotateError::Operation(
            "Expected number in rectangle".to_string(),
        )),
    }
}
