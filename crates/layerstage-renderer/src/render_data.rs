use serde::{Deserialize, Serialize};

use layerstage_core::layer::{LayerColor, LayerId};
use layerstage_core::{Point, Rect};

/// RGBA color, alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 1.0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_layer_color(color: LayerColor, alpha: f32) -> Self {
        Self::new(color.r, color.g, color.b, alpha)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// How a shape combines with what is already on its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composite {
    SourceOver,
    /// Clears destination pixels under the shape.
    Erase,
}

/// A retained draw primitive, in canvas-space units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Round-capped, round-joined polyline.
    Polyline {
        points: Vec<Point>,
        width: f64,
        color: Rgba,
        composite: Composite,
    },
    FilledRect {
        rect: Rect,
        color: Rgba,
    },
    StrokedRect {
        rect: Rect,
        width: f64,
        color: Rgba,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Rgba>,
        stroke: Option<Rgba>,
    },
    Text {
        center: Point,
        text: String,
        size: f64,
        color: Rgba,
    },
    Checkerboard {
        rect: Rect,
        cell: u32,
        light: Rgba,
        dark: Rgba,
    },
}

/// The visual node for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerVisual {
    pub layer_id: LayerId,
    pub visible: bool,
    /// Node translation (layer offset plus any in-progress drag).
    pub offset: Point,
    pub opacity: f32,
    pub shapes: Vec<Shape>,
}

/// Non-layer content, each kept in its own node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// Drawn behind every layer.
    Background,
    BboxHandles,
    ToolPreview,
    /// Shown when there are no layers.
    Placeholder,
}

/// Pointer cursor the host should show over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorStyle {
    #[default]
    Default,
    /// Hidden; the brush preview stands in for it.
    None,
    Crosshair,
}

/// Everything a surface shows, in a form the frontend can consume as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub physical_width: u32,
    pub physical_height: u32,
    pub scale: f64,
    pub cursor: CursorStyle,
    /// Back-to-front.
    pub layers: Vec<LayerVisual>,
    pub overlays: Vec<(OverlayKind, Vec<Shape>)>,
}
