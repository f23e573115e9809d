//! Viewport geometry
//!
//! Computes the [`ViewportObservation`] an intersection observer reports for
//! an element on a vertically scrolling page. Used by hosts without a native
//! tracker and by the simulator.

use crate::types::ViewportObservation;
use serde::{Deserialize, Serialize};

/// Element box in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub top: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height: height.max(0.0) }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Scroll position and size of the visible area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Document offset of the top of the viewport
    pub scroll_top: f64,
    pub height: f64,
    /// Pre-fetch margin applied above and below
    pub margin: f64,
}

impl Viewport {
    pub fn new(height: f64, margin: f64) -> Self {
        Self {
            scroll_top: 0.0,
            height,
            margin,
        }
    }

    /// Same viewport at another scroll offset
    pub fn scrolled_to(self, scroll_top: f64) -> Self {
        Self { scroll_top, ..self }
    }

    /// Observation for `rect` at the current scroll position
    pub fn observe(&self, rect: &ElementRect) -> ViewportObservation {
        let top = rect.top - self.scroll_top;
        let bottom = top + rect.height;

        let root_top = -self.margin;
        let root_bottom = self.height + self.margin;

        let is_intersecting = if rect.height > 0.0 {
            top < root_bottom && bottom > root_top
        } else {
            top >= root_top && top <= root_bottom
        };

        let ratio = if !is_intersecting {
            0.0
        } else if rect.height > 0.0 {
            let overlap = bottom.min(root_bottom) - top.max(root_top);
            (overlap / rect.height).clamp(0.0, 1.0)
        } else {
            1.0
        };

        ViewportObservation::new(ratio, is_intersecting, top, bottom, self.height)
    }
}
