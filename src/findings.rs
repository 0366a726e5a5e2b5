//! Geometry and view state for the findings overlay.
//!
//! Bounding boxes arrive in a normalized 0-1000 coordinate space so they
//! stay valid at any display size. Conversion to CSS-style percentages
//! happens here and only here.

use crate::db::models::BoundingBox;

/// Size of the normalized coordinate space boxes are expressed in.
pub const COORD_SPACE: f64 = 1000.0;
/// Dividing a normalized coordinate by this yields a percentage.
const PERCENT_DIVISOR: f64 = COORD_SPACE / 100.0;

pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.5;

pub fn normalized_to_percent(value: f64) -> f64 {
    value / PERCENT_DIVISOR
}

/// A box ready for absolute positioning, all values in percent of the
/// rendered media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPercent {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

pub fn region_for(bbox: &BoundingBox) -> RegionPercent {
    RegionPercent {
        left: normalized_to_percent(bbox.xmin),
        top: normalized_to_percent(bbox.ymin),
        width: normalized_to_percent(bbox.xmax - bbox.xmin),
        height: normalized_to_percent(bbox.ymax - bbox.ymin),
    }
}

/// View state for one results screen.
///
/// The zoom factor is a single scalar applied to the media element and the
/// overlay container alike, so boxes can never drift against the image.
/// Zoom and selection deliberately survive switching the active asset.
#[derive(Debug, Clone)]
pub struct FindingsViewer {
    zoom: f64,
    selected: Option<usize>,
    active_asset: usize,
    show_overlay: bool,
}

impl Default for FindingsViewer {
    fn default() -> Self {
        Self {
            zoom: ZOOM_MIN,
            selected: None,
            active_asset: 0,
            show_overlay: true,
        }
    }
}

impl FindingsViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom + ZOOM_STEP).min(ZOOM_MAX);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = (self.zoom - ZOOM_STEP).max(ZOOM_MIN);
        self.zoom
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Singular selection shared by the overlay and the findings list:
    /// tapping the selected finding again deselects it.
    pub fn toggle_selection(&mut self, index: usize) {
        self.selected = if self.selected == Some(index) {
            None
        } else {
            Some(index)
        };
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn active_asset(&self) -> usize {
        self.active_asset
    }

    pub fn set_active_asset(&mut self, index: usize) {
        // Zoom and selection are left alone on purpose.
        self.active_asset = index;
    }

    pub fn toggle_overlay(&mut self) {
        self.show_overlay = !self.show_overlay;
    }

    /// Boxes only make spatial sense on stills. For a video asset the
    /// overlay is suppressed regardless of the toggle.
    pub fn overlay_visible(&self, active_is_video: bool) -> bool {
        self.show_overlay && !active_is_video
    }
}
