//! Coordinate transformation between the rendering surface and PDF page space
//!
//! Screen space has its origin at the top-left with y increasing downward;
//! PDF user space has its origin at the bottom-left with y increasing upward.

use serde::{Deserialize, Serialize};

/// Horizontal correction between the rendering surface and the page, in
/// user-space units.
pub const CANVAS_X_OFFSET: f64 = -80.0;

/// Vertical correction applied to free-text anchors only, compensating for
/// the gap between the on-screen anchor and the text baseline.
pub const TEXT_BASELINE_OFFSET: f64 = 12.0;

/// Empirical correction constants for one specific rendering surface.
///
/// These values are tied to the surface's scale factor relative to PDF
/// user-space units. Targeting a different rendering pipeline, DPI, or zoom
/// level requires recalibrating both offsets; they are configuration, not
/// derived geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasCalibration {
    pub x_offset: f64,
    pub text_baseline_offset: f64,
}

impl Default for CanvasCalibration {
    fn default() -> Self {
        Self {
            x_offset: CANVAS_X_OFFSET,
            text_baseline_offset: TEXT_BASELINE_OFFSET,
        }
    }
}

impl CanvasCalibration {
    /// Convert a screen point to PDF page coordinates (flip the Y axis).
    pub fn to_page(&self, screen_x: f64, screen_y: f64, page_height: f64) -> (f64, f64) {
        (screen_x + self.x_offset, page_height - screen_y)
    }

    /// Convert a free-text anchor to PDF page coordinates. Identical to
    /// [`to_page`](Self::to_page) except for the baseline correction.
    pub fn to_page_text(&self, screen_x: f64, screen_y: f64, page_height: f64) -> (f64, f64) {
        (
            screen_x + self.x_offset,
            page_height - screen_y - self.text_baseline_offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vector() {
        // page_height = 792, screen (100, 50) -> PDF (20, 742)
        let cal = CanvasCalibration::default();
        let (x, y) = cal.to_page(100.0, 50.0, 792.0);
        assert_eq!(x, 20.0);
        assert_eq!(y, 742.0);
    }

    #[test]
    fn test_text_anchor_lowered_by_baseline_offset() {
        let cal = CanvasCalibration::default();
        let (x, y) = cal.to_page(100.0, 50.0, 792.0);
        let (tx, ty) = cal.to_page_text(100.0, 50.0, 792.0);
        assert_eq!(tx, x);
        assert_eq!(ty, y - TEXT_BASELINE_OFFSET);
    }

    #[test]
    fn test_screen_top_maps_to_page_top() {
        let cal = CanvasCalibration {
            x_offset: 0.0,
            text_baseline_offset: 0.0,
        };
        let (_, y) = cal.to_page(0.0, 0.0, 792.0);
        assert_eq!(y, 792.0);
    }

    #[test]
    fn test_screen_bottom_maps_to_page_bottom() {
        let cal = CanvasCalibration {
            x_offset: 0.0,
            text_baseline_offset: 0.0,
        };
        let (_, y) = cal.to_page(0.0, 792.0, 792.0);
        assert_eq!(y, 0.0);
    }
}
