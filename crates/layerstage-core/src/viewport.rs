use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Fixed logical size of the drawing surface, set by the generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Box of the element hosting the canvas, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A pointer position relative to the rendered surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePoint {
    pub x: f64,
    pub y: f64,
}

impl DevicePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Uniform scale that fits `canvas` inside `container`, never enlarging past 1x.
///
/// Returns `None` when either box has a zero or non-finite dimension.
pub fn fit_scale(container: ContainerSize, canvas: CanvasSize) -> Option<f64> {
    if !container.is_usable() || canvas.is_empty() {
        return None;
    }
    let scale_x = container.width / f64::from(canvas.width);
    let scale_y = container.height / f64::from(canvas.height);
    Some(scale_x.min(scale_y).min(1.0))
}

/// Maps between device pointer coordinates and canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub canvas: CanvasSize,
    /// Uniform scale applied to both axes.
    pub scale: f64,
    /// Surface translation in CSS pixels.
    pub offset_x: f64,
    pub offset_y: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            device_pixel_ratio: 1.0,
        }
    }

    /// Refit to a container box. Returns `true` if the scale changed.
    ///
    /// Unusable container sizes keep the previous scale.
    pub fn fit(&mut self, container: ContainerSize) -> bool {
        let Some(scale) = fit_scale(container, self.canvas) else {
            log::trace!(
                "Ignoring unusable container size {}x{}",
                container.width,
                container.height
            );
            return false;
        };
        if (scale - self.scale).abs() < f64::EPSILON {
            return false;
        }
        log::trace!("Viewport scale {} -> {}", self.scale, scale);
        self.scale = scale;
        true
    }

    /// Returns `true` if the canvas size changed. The caller refits afterwards.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) -> bool {
        if self.canvas == canvas {
            return false;
        }
        self.canvas = canvas;
        true
    }

    /// Returns `true` if the ratio changed. Non-positive ratios are ignored.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> bool {
        if !(ratio.is_finite() && ratio > 0.0) || (ratio - self.device_pixel_ratio).abs() < f64::EPSILON
        {
            return false;
        }
        self.device_pixel_ratio = ratio;
        true
    }

    fn has_transform(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0
    }

    /// Displayed surface size in CSS pixels.
    pub fn css_size(&self) -> (f64, f64) {
        (
            f64::from(self.canvas.width) * self.scale,
            f64::from(self.canvas.height) * self.scale,
        )
    }

    /// Backing store size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let (w, h) = self.css_size();
        (
            (w * self.device_pixel_ratio).round() as u32,
            (h * self.device_pixel_ratio).round() as u32,
        )
    }

    /// Convert a device pointer position to floored canvas-space units.
    ///
    /// `None` means "ignore this event": the pointer is outside the displayed
    /// surface or there is no usable transform.
    pub fn to_canvas_space(&self, device: DevicePoint) -> Option<Point> {
        if !self.has_transform() {
            return None;
        }
        let (w, h) = self.css_size();
        let local_x = device.x - self.offset_x;
        let local_y = device.y - self.offset_y;
        if !(0.0..w).contains(&local_x) || !(0.0..h).contains(&local_y) {
            return None;
        }
        Some(Point::new(local_x / self.scale, local_y / self.scale).floor())
    }

    /// Like [`to_canvas_space`](Self::to_canvas_space), but positions outside
    /// the surface are clamped to its nearest edge pixel.
    ///
    /// Used for leave events, which are reported just past the edge the
    /// pointer crossed.
    pub fn to_canvas_edge(&self, device: DevicePoint) -> Option<Point> {
        if !self.has_transform() || self.canvas.is_empty() {
            return None;
        }
        let max_x = f64::from(self.canvas.width) - 1.0;
        let max_y = f64::from(self.canvas.height) - 1.0;
        let x = ((device.x - self.offset_x) / self.scale).floor();
        let y = ((device.y - self.offset_y) / self.scale).floor();
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        Some(Point::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y)))
    }

    /// Convert a canvas-space point to a device pointer position.
    pub fn to_device_space(&self, point: Point) -> DevicePoint {
        DevicePoint::new(
            point.x * self.scale + self.offset_x,
            point.y * self.scale + self.offset_y,
        )
    }
}
