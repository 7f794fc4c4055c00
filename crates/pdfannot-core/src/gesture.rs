//! Pointer-gesture capture for the interactive editor
//!
//! A mark is built up by a pointer-down / pointer-move / pointer-up cycle
//! (free text instead arrives whole from the floating input). The checks that
//! decide whether the in-progress mark is committed to the annotation list
//! live here: a gesture that fails them is discarded, never stored.

use crate::annotation::Annotation;

/// The active editing tool. `Text` has no drag gesture; it commits through
/// [`text_annotation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Draw,
    Highlight,
    Text,
    Signature,
}

#[derive(Debug, Clone)]
enum Pending {
    Highlight {
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
    Stroke {
        page: usize,
        points: Vec<f64>,
        color: Option<String>,
        is_signature: bool,
    },
}

/// Tracks the single in-progress gesture. Only one gesture can be pending at
/// a time; a new `begin` replaces whatever was being drawn.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    pending: Option<Pending>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a gesture at the pointer-down position.
    pub fn begin(&mut self, tool: Tool, page: usize, x: f64, y: f64, color: &str) {
        self.pending = match tool {
            Tool::Draw => Some(Pending::Stroke {
                page,
                points: vec![x, y],
                color: Some(color.to_string()),
                is_signature: false,
            }),
            Tool::Signature => Some(Pending::Stroke {
                page,
                points: vec![x, y],
                color: None,
                is_signature: true,
            }),
            Tool::Highlight => Some(Pending::Highlight {
                page,
                x,
                y,
                width: 0.0,
                height: 0.0,
                color: color.to_string(),
            }),
            Tool::Text => None,
        };
    }

    /// Feed a pointer-move position into the pending gesture.
    pub fn extend(&mut self, x: f64, y: f64) {
        match &mut self.pending {
            Some(Pending::Stroke { points, .. }) => {
                points.push(x);
                points.push(y);
            }
            Some(Pending::Highlight {
                x: anchor_x,
                y: anchor_y,
                width,
                height,
                ..
            }) => {
                // Signed while dragging up/left; normalized at export time.
                *width = x - *anchor_x;
                *height = y - *anchor_y;
            }
            None => {}
        }
    }

    /// End the gesture. Returns the annotation to commit, or `None` if the
    /// gesture failed its commit-time check:
    /// strokes need strictly more than one point, highlights a non-zero width.
    pub fn finish(&mut self) -> Option<Annotation> {
        let pending = self.pending.take()?;
        match pending {
            Pending::Stroke {
                page,
                points,
                color,
                is_signature,
            } => {
                if points.len() / 2 <= 1 {
                    return None;
                }
                Some(if is_signature {
                    Annotation::Signature { id: 0, page, points }
                } else {
                    Annotation::Draw {
                        id: 0,
                        page,
                        points,
                        color,
                    }
                })
            }
            Pending::Highlight {
                page,
                x,
                y,
                width,
                height,
                color,
            } => {
                if width == 0.0 {
                    return None;
                }
                Some(Annotation::Highlight {
                    id: 0,
                    page,
                    x,
                    y,
                    width,
                    height,
                    color,
                })
            }
        }
    }

    /// Drop the pending gesture without committing.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// A snapshot of the in-progress mark for live overlay rendering.
    pub fn preview(&self) -> Option<Annotation> {
        match self.pending.clone()? {
            Pending::Stroke {
                page,
                points,
                color,
                is_signature,
            } => Some(if is_signature {
                Annotation::Signature { id: 0, page, points }
            } else {
                Annotation::Draw {
                    id: 0,
                    page,
                    points,
                    color,
                }
            }),
            Pending::Highlight {
                page,
                x,
                y,
                width,
                height,
                color,
            } => Some(Annotation::Highlight {
                id: 0,
                page,
                x,
                y,
                width,
                height,
                color,
            }),
        }
    }
}

/// Build a free-text annotation from the floating-input commit. Returns
/// `None` when the text is empty after trimming.
#[allow(clippy::too_many_arguments)]
pub fn text_annotation(
    page: usize,
    x: f64,
    y: f64,
    text: &str,
    font_size: f64,
    is_bold: bool,
    is_italic: bool,
    is_underline: bool,
    color: Option<String>,
) -> Option<Annotation> {
    if text.trim().is_empty() {
        return None;
    }
    Some(Annotation::Text {
        id: 0,
        page,
        x,
        y,
        text: text.to_string(),
        font_size,
        is_bold,
        is_italic,
        is_underline,
        color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_point_stroke_is_discarded() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Draw, 0, 10.0, 10.0, "#000000");
        assert!(tracker.finish().is_none());
        assert!(!tracker.has_pending());
    }

    #[test]
    fn test_two_point_stroke_commits() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Draw, 0, 10.0, 10.0, "#FF6B6B");
        tracker.extend(20.0, 25.0);

        match tracker.finish() {
            Some(Annotation::Draw { points, color, .. }) => {
                assert_eq!(points, vec![10.0, 10.0, 20.0, 25.0]);
                assert_eq!(color.as_deref(), Some("#FF6B6B"));
            }
            other => panic!("expected a draw annotation, got {:?}", other),
        }
    }

    #[test]
    fn test_signature_captures_no_color() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Signature, 1, 0.0, 0.0, "#FF0000");
        tracker.extend(5.0, 5.0);
        tracker.extend(9.0, 2.0);

        match tracker.finish() {
            Some(Annotation::Signature { page, points, .. }) => {
                assert_eq!(page, 1);
                assert_eq!(points.len(), 6);
            }
            other => panic!("expected a signature annotation, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_width_highlight_is_discarded() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Highlight, 0, 50.0, 60.0, "#FFFF00");
        // Pointer never moved horizontally.
        tracker.extend(50.0, 80.0);
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn test_one_pixel_highlight_commits() {
        for dx in [1.0, -1.0] {
            let mut tracker = GestureTracker::new();
            tracker.begin(Tool::Highlight, 0, 50.0, 60.0, "#FFFF00");
            tracker.extend(50.0 + dx, 70.0);

            match tracker.finish() {
                Some(Annotation::Highlight { width, height, .. }) => {
                    assert_eq!(width, dx);
                    assert_eq!(height, 10.0);
                }
                other => panic!("expected a highlight, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_negative_drag_highlight_keeps_signed_extent() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Highlight, 0, 100.0, 100.0, "#4ECDC4");
        tracker.extend(40.0, 70.0);

        match tracker.finish() {
            Some(Annotation::Highlight {
                x, y, width, height, ..
            }) => {
                assert_eq!((x, y), (100.0, 100.0));
                assert_eq!(width, -60.0);
                assert_eq!(height, -30.0);
            }
            other => panic!("expected a highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_text_tool_has_no_drag_gesture() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Text, 0, 10.0, 10.0, "#000000");
        assert!(!tracker.has_pending());
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn test_finish_without_begin_is_none() {
        let mut tracker = GestureTracker::new();
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn test_begin_replaces_pending_gesture() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Draw, 0, 0.0, 0.0, "#000000");
        tracker.extend(5.0, 5.0);
        tracker.begin(Tool::Highlight, 1, 1.0, 1.0, "#FFFF00");
        tracker.extend(4.0, 4.0);

        match tracker.finish() {
            Some(Annotation::Highlight { page, .. }) => assert_eq!(page, 1),
            other => panic!("expected the replacement highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut tracker = GestureTracker::new();
        tracker.begin(Tool::Draw, 0, 0.0, 0.0, "#000000");
        tracker.extend(5.0, 5.0);
        tracker.cancel();
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn test_blank_text_is_discarded() {
        assert!(text_annotation(0, 1.0, 2.0, "", 16.0, false, false, false, None).is_none());
        assert!(text_annotation(0, 1.0, 2.0, "   ", 16.0, false, false, false, None).is_none());
    }

    #[test]
    fn test_text_commit_keeps_style_flags() {
        let ann = text_annotation(
            2,
            100.0,
            200.0,
            "Hi",
            20.0,
            true,
            true,
            false,
            Some("#FF6B6B".to_string()),
        )
        .expect("non-blank text commits");

        match ann {
            Annotation::Text {
                page,
                text,
                font_size,
                is_bold,
                is_italic,
                is_underline,
                ..
            } => {
                assert_eq!(page, 2);
                assert_eq!(text, "Hi");
                assert_eq!(font_size, 20.0);
                assert!(is_bold && is_italic && !is_underline);
            }
            other => panic!("expected a text annotation, got {:?}", other),
        }
    }
}
