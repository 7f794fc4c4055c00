//! In-memory annotation model
//!
//! This module provides the data structures for the marks a user places on a
//! document: highlights, free text, freehand strokes, and signature strokes.
//! Geometry is stored in screen pixels of the rendering surface (top-left
//! origin, y-down); the conversion to PDF user space happens at export time.

use serde::{Deserialize, Serialize};

pub type AnnotId = u64;

/// A single user-authored mark, tagged with the zero-based page it belongs to.
///
/// Colors are stored as 6-hex-digit strings (e.g. "#FFFF00"). A `Signature`
/// carries no color at all: it is always exported in black.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Highlight {
        id: AnnotId,
        page: usize,
        x: f64,
        y: f64,
        /// Signed: negative while the drag ran up/left. Normalized at export.
        width: f64,
        height: f64,
        color: String,
    },
    Text {
        id: AnnotId,
        page: usize,
        x: f64,
        y: f64,
        text: String,
        font_size: f64,
        #[serde(default)]
        is_bold: bool,
        #[serde(default)]
        is_italic: bool,
        #[serde(default)]
        is_underline: bool,
        #[serde(default)]
        color: Option<String>,
    },
    Draw {
        id: AnnotId,
        page: usize,
        /// Flat alternating x,y screen coordinates; at least two points.
        points: Vec<f64>,
        #[serde(default)]
        color: Option<String>,
    },
    Signature {
        id: AnnotId,
        page: usize,
        points: Vec<f64>,
    },
}

impl Annotation {
    pub fn id(&self) -> AnnotId {
        match self {
            Annotation::Highlight { id, .. } => *id,
            Annotation::Text { id, .. } => *id,
            Annotation::Draw { id, .. } => *id,
            Annotation::Signature { id, .. } => *id,
        }
    }

    pub fn page(&self) -> usize {
        match self {
            Annotation::Highlight { page, .. } => *page,
            Annotation::Text { page, .. } => *page,
            Annotation::Draw { page, .. } => *page,
            Annotation::Signature { page, .. } => *page,
        }
    }
}

/// The ordered annotation sequence for the active document.
///
/// Append-at-end insertion order is the only ordering guarantee. Commit-time
/// validation happens in gesture capture; `append` itself always succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationList {
    next_id: AnnotId,
    annotations: Vec<Annotation>,
}

impl AnnotationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation, stamping it with the next id.
    pub fn append(&mut self, mut annotation: Annotation) -> AnnotId {
        let id = self.next_id;
        self.next_id += 1;

        match &mut annotation {
            Annotation::Highlight { id: a, .. } => *a = id,
            Annotation::Text { id: a, .. } => *a = id,
            Annotation::Draw { id: a, .. } => *a = id,
            Annotation::Signature { id: a, .. } => *a = id,
        }

        self.annotations.push(annotation);
        id
    }

    /// Pop the most recently appended annotation. No-op on an empty list.
    pub fn remove_last(&mut self) -> Option<Annotation> {
        self.annotations.pop()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// The subsequence belonging to `page`, in insertion order.
    pub fn for_page(&self, page: usize) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.page() == page)
            .collect()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.annotations.iter()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_annotation(page_range: std::ops::Range<usize>) -> impl Strategy<Value = Annotation> {
        (page_range, 0.0f64..800.0, 0.0f64..800.0).prop_map(|(page, x, y)| {
            Annotation::Highlight {
                id: 0,
                page,
                x,
                y,
                width: 50.0,
                height: 10.0,
                color: "#FFFF00".to_string(),
            }
        })
    }

    proptest! {
        /// Property: for_page partitions the list — every annotation lands in
        /// exactly one page bucket, and bucket order matches insertion order.
        #[test]
        fn for_page_partitions_in_order(
            annotations in prop::collection::vec(arb_annotation(0..4), 0..32),
        ) {
            let mut list = AnnotationList::new();
            for a in annotations {
                list.append(a);
            }

            let mut seen = 0;
            for page in 0..4 {
                let bucket = list.for_page(page);
                seen += bucket.len();
                prop_assert!(bucket.iter().all(|a| a.page() == page));
                // Insertion order within a bucket: ids strictly increase.
                for pair in bucket.windows(2) {
                    prop_assert!(pair[0].id() < pair[1].id());
                }
            }
            prop_assert_eq!(seen, list.len());
        }

        /// Property: append then remove_last returns the appended annotation.
        #[test]
        fn append_remove_roundtrip(
            prefix in prop::collection::vec(arb_annotation(0..2), 0..8),
            page in 0usize..4,
        ) {
            let mut list = AnnotationList::new();
            for a in prefix {
                list.append(a);
            }
            let before = list.len();

            let id = list.append(Annotation::Signature {
                id: 0,
                page,
                points: vec![0.0, 0.0, 5.0, 5.0],
            });
            let removed = list.remove_last().unwrap();

            prop_assert_eq!(removed.id(), id);
            prop_assert_eq!(removed.page(), page);
            prop_assert_eq!(list.len(), before);
        }
    }
}
