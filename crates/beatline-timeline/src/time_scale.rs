//! Seconds <-> pixels conversion and anchored zoom.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;

/// Pixels per second at zoom `1.0`.
pub const BASE_PIXELS_PER_SECOND: f64 = 40.0;
pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;
/// Zoom multiplier per Ctrl/Cmd + wheel tick.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;
/// Zoom multiplier per toolbar button press.
pub const BUTTON_ZOOM_FACTOR: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    zoom: f64,
    base_pixels_per_second: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            base_pixels_per_second: BASE_PIXELS_PER_SECOND,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl TimeScale {
    pub fn from_config(config: &TimelineConfig) -> Self {
        let mut scale = Self {
            zoom: 1.0,
            base_pixels_per_second: config.base_pixels_per_second,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        };
        scale.set_zoom(1.0);
        scale
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the zoom level, clamped into the configured range. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = self.clamp_zoom(zoom);
        self.zoom
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Pixel rate for an arbitrary zoom level, after clamping.
    pub fn pixels_per_second_at(&self, zoom: f64) -> f64 {
        self.base_pixels_per_second * self.clamp_zoom(zoom)
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.base_pixels_per_second * self.zoom
    }

    pub fn to_pixels(&self, seconds: f64) -> f64 {
        seconds * self.pixels_per_second()
    }

    pub fn to_seconds(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_second()
    }
}

/// Scroll state of the lanes container, in screen pixels.
///
/// Screen x is measured from the container's left edge; the time axis starts
/// after the lane header column of `label_width` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_left: f64,
    pub label_width: f64,
    pub width: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_left: 0.0,
            label_width: crate::config::DEFAULT_LABEL_WIDTH,
            width: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(label_width: f64, width: f64) -> Self {
        Self {
            scroll_left: 0.0,
            label_width,
            width,
        }
    }

    /// Converts a screen x into a timeline content x (0 = time zero).
    pub fn content_x(&self, screen_x: f64) -> f64 {
        screen_x + self.scroll_left - self.label_width
    }

    pub fn screen_x(&self, scale: &TimeScale, time: f64) -> f64 {
        self.label_width + scale.to_pixels(time) - self.scroll_left
    }

    pub fn time_at(&self, scale: &TimeScale, screen_x: f64) -> f64 {
        scale.to_seconds(self.content_x(screen_x)).max(0.0)
    }

    /// Time currently shown at the left edge of the time axis.
    pub fn visible_start(&self, scale: &TimeScale) -> f64 {
        self.time_at(scale, self.label_width)
    }

    pub fn visible_end(&self, scale: &TimeScale) -> f64 {
        self.time_at(scale, self.width.max(self.label_width))
    }

    pub fn apply_scroll(&mut self, scroll_left: f64) {
        self.scroll_left = if scroll_left.is_finite() {
            scroll_left.max(0.0)
        } else {
            0.0
        };
    }
}

/// Scroll offset that keeps `anchor_time` at `anchor_screen_x` under a new pixel rate.
pub fn anchored_scroll_left(
    label_width: f64,
    anchor_time: f64,
    new_pixels_per_second: f64,
    anchor_screen_x: f64,
) -> f64 {
    label_width + anchor_time * new_pixels_per_second - anchor_screen_x
}

/// Outcome of a zoom request: the applied level plus the scroll offset to
/// install on the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomChange {
    pub previous_zoom: f64,
    pub zoom: f64,
    pub anchor_time: f64,
    pub anchor_screen_x: f64,
    pub scroll_left: f64,
}

impl ZoomChange {
    pub fn changed(&self) -> bool {
        self.zoom != self.previous_zoom
    }
}

/// Changes zoom so that `anchor_time`, currently drawn at `anchor_screen_x`,
/// stays there once the returned scroll offset is applied.
pub fn zoom_anchored(
    scale: &mut TimeScale,
    viewport: &Viewport,
    requested_zoom: f64,
    anchor_time: f64,
    anchor_screen_x: f64,
) -> ZoomChange {
    let previous_zoom = scale.zoom();
    let zoom = scale.set_zoom(requested_zoom);
    let scroll_left = anchored_scroll_left(
        viewport.label_width,
        anchor_time,
        scale.pixels_per_second(),
        anchor_screen_x,
    );
    tracing::trace!(previous_zoom, zoom, anchor_time, scroll_left, "anchored zoom");
    ZoomChange {
        previous_zoom,
        zoom,
        anchor_time,
        anchor_screen_x,
        scroll_left,
    }
}
