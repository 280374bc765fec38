use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect};
use crate::tool::StrokeTool;

/// Stable layer identifier.
pub type LayerId = Uuid;

/// What a layer represents in the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Pixel content supplied from outside the canvas.
    Raster,
    /// Painted mask that scopes a regional prompt.
    RegionalMask,
    /// Region driven by a control adapter image.
    ControlRegion,
}

impl LayerKind {
    /// Only painted masks accept strokes, rectangles and drags from the canvas tools.
    pub fn accepts_drawing(self) -> bool {
        matches!(self, LayerKind::RegionalMask)
    }

    /// Masks share the global mask opacity instead of their own.
    pub fn uses_mask_opacity(self) -> bool {
        matches!(self, LayerKind::RegionalMask)
    }
}

/// A freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushLine {
    pub id: Uuid,
    pub tool: StrokeTool,
    pub stroke_width: f64,
    pub points: Vec<Point>,
}

/// A filled rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub id: Uuid,
    pub rect: Rect,
}

/// One piece of layer geometry, in layer-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerObject {
    Line(BrushLine),
    Rect(RectShape),
}

impl LayerObject {
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            LayerObject::Line(line) => Rect::from_points(&line.points),
            LayerObject::Rect(shape) => Some(shape.rect),
        }
    }
}

/// RGB display color for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for LayerColor {
    fn default() -> Self {
        Self {
            r: 121,
            g: 157,
            b: 219,
        }
    }
}

impl LayerColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A named, ordered geometric entity on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub objects: Vec<LayerObject>,
    /// Position offset applied on top of every object.
    pub x: f64,
    pub y: f64,
    /// Cached tight bound of geometry plus offset, owned by the synchronizer.
    #[serde(default)]
    pub bbox: Option<Rect>,
    pub visible: bool,
    pub opacity: f32,
    pub color: LayerColor,
}

impl Layer {
    pub fn new(name: &str, kind: LayerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            objects: Vec::new(),
            x: 0.0,
            y: 0.0,
            bbox: None,
            visible: true,
            opacity: 1.0,
            color: LayerColor::default(),
        }
    }

    pub fn regional_mask(name: &str) -> Self {
        Self::new(name, LayerKind::RegionalMask)
    }

    pub fn with_color(mut self, r: u8, g: u8, b: u8) -> Self {
        self.color = LayerColor::new(r, g, b);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_object(mut self, object: LayerObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn accepts_drawing(&self) -> bool {
        self.kind.accepts_drawing()
    }

    /// Bound of all objects in layer-local coordinates.
    pub fn local_bounds(&self) -> Option<Rect> {
        self.objects
            .iter()
            .filter_map(LayerObject::bounds)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Bound of all objects translated by the layer offset.
    pub fn computed_bbox(&self) -> Option<Rect> {
        self.local_bounds().map(|r| r.translate(self.x, self.y))
    }

    /// The most recent stroke, which point appends extend.
    pub fn last_line_mut(&mut self) -> Option<&mut BrushLine> {
        self.objects.iter_mut().rev().find_map(|o| match o {
            LayerObject::Line(line) => Some(line),
            LayerObject::Rect(_) => None,
        })
    }
}

/// Deserialize a layer array, keeping every valid element.
///
/// Elements that fail to parse are logged and dropped; one bad record never
/// discards the rest of the batch. A non-array value yields no layers.
pub fn parse_layers_lenient(value: &serde_json::Value) -> Vec<Layer> {
    let Some(items) = value.as_array() else {
        log::warn!("Expected a layer array, got {}", value);
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match Layer::deserialize(item) {
            Ok(layer) => Some(layer),
            Err(e) => {
                log::warn!("Dropping invalid layer at index {}: {}", i, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> LayerObject {
        LayerObject::Line(BrushLine {
            id: Uuid::new_v4(),
            tool: StrokeTool::Brush,
            stroke_width: 10.0,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        })
    }

    #[test]
    fn test_only_regional_masks_accept_drawing() {
        assert!(Layer::regional_mask("mask").accepts_drawing());
        assert!(!Layer::new("image", LayerKind::Raster).accepts_drawing());
        assert!(!Layer::new("control", LayerKind::ControlRegion).accepts_drawing());
    }

    #[test]
    fn test_computed_bbox_includes_offset() {
        let layer = Layer::regional_mask("mask")
            .with_object(line(&[(0.0, 0.0), (100.0, 20.0)]))
            .with_object(LayerObject::Rect(RectShape {
                id: Uuid::new_v4(),
                rect: Rect::new(50.0, 50.0, 10.0, 10.0),
            }))
            .with_position(5.0, -5.0);
        assert_eq!(layer.local_bounds(), Some(Rect::new(0.0, 0.0, 100.0, 60.0)));
        assert_eq!(layer.computed_bbox(), Some(Rect::new(5.0, -5.0, 100.0, 60.0)));
    }

    #[test]
    fn test_empty_layer_has_no_bbox() {
        assert_eq!(Layer::regional_mask("empty").computed_bbox(), None);
    }

    #[test]
    fn test_last_line_skips_rects() {
        let mut layer = Layer::regional_mask("mask")
            .with_object(line(&[(1.0, 1.0)]))
            .with_object(LayerObject::Rect(RectShape {
                id: Uuid::new_v4(),
                rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            }));
        let last = layer.last_line_mut().unwrap();
        assert_eq!(last.points, vec![Point::new(1.0, 1.0)]);
    }

    #[test]
    fn test_lenient_parse_keeps_valid_items() {
        let good = serde_json::to_value(Layer::regional_mask("good")).unwrap();
        let value = serde_json::json!([good, { "id": "not-a-uuid" }, 42]);
        let layers = parse_layers_lenient(&value);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "good");
        assert!(parse_layers_lenient(&serde_json::json!({"layers": []})).is_empty());
    }
}
