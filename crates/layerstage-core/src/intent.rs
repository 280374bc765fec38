//! Mutation intents: the only channel from canvas activity to layer state.
//!
//! Each variant serializes as `{"type": ..., "payload": {...}}` with camelCase
//! payload fields, matching what the external store consumes.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::layer::LayerId;
use crate::tool::StrokeTool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerTranslated {
    pub layer_id: LayerId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerBboxChanged {
    pub layer_id: LayerId,
    pub bbox: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStarted {
    pub layer_id: LayerId,
    /// Start and end of the initial segment: `[x0, y0, x1, y1]`.
    pub points: [f64; 4],
    pub tool: StrokeTool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointAppended {
    pub layer_id: LayerId,
    pub point: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectCommitted {
    pub layer_id: LayerId,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSizeChanged {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Intent {
    LayerTranslated(LayerTranslated),
    LayerBboxChanged(LayerBboxChanged),
    StrokeStarted(StrokeStarted),
    PointAppended(PointAppended),
    RectCommitted(RectCommitted),
    BrushSizeChanged(BrushSizeChanged),
}

impl Intent {
    pub fn stroke_started(layer_id: LayerId, at: Point, tool: StrokeTool) -> Self {
        Intent::StrokeStarted(StrokeStarted {
            layer_id,
            points: [at.x, at.y, at.x, at.y],
            tool,
        })
    }

    pub fn point_appended(layer_id: LayerId, point: Point) -> Self {
        Intent::PointAppended(PointAppended {
            layer_id,
            point: [point.x, point.y],
        })
    }

    pub fn rect_committed(layer_id: LayerId, rect: Rect) -> Self {
        Intent::RectCommitted(RectCommitted { layer_id, rect })
    }

    pub fn layer_translated(layer_id: LayerId, to: Point) -> Self {
        Intent::LayerTranslated(LayerTranslated {
            layer_id,
            x: to.x,
            y: to.y,
        })
    }

    pub fn bbox_changed(layer_id: LayerId, bbox: Option<Rect>) -> Self {
        Intent::LayerBboxChanged(LayerBboxChanged { layer_id, bbox })
    }

    pub fn brush_size_changed(size: u32) -> Self {
        Intent::BrushSizeChanged(BrushSizeChanged { size })
    }

    /// The layer this intent targets, if any.
    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            Intent::LayerTranslated(i) => Some(i.layer_id),
            Intent::LayerBboxChanged(i) => Some(i.layer_id),
            Intent::StrokeStarted(i) => Some(i.layer_id),
            Intent::PointAppended(i) => Some(i.layer_id),
            Intent::RectCommitted(i) => Some(i.layer_id),
            Intent::BrushSizeChanged(_) => None,
        }
    }

    /// Whether applying this intent changes layer geometry or offset.
    pub fn touches_geometry(&self) -> bool {
        matches!(
            self,
            Intent::LayerTranslated(_)
                | Intent::StrokeStarted(_)
                | Intent::PointAppended(_)
                | Intent::RectCommitted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_stroke_started_payload_shape() {
        let id = Uuid::nil();
        let intent = Intent::stroke_started(id, Point::new(3.0, 4.0), StrokeTool::Eraser);
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "strokeStarted",
                "payload": {
                    "layerId": "00000000-0000-0000-0000-000000000000",
                    "points": [3.0, 4.0, 3.0, 4.0],
                    "tool": "eraser"
                }
            })
        );
    }

    #[test]
    fn test_bbox_changed_serializes_null() {
        let json = serde_json::to_value(Intent::bbox_changed(Uuid::nil(), None)).unwrap();
        assert_eq!(json["type"], "layerBboxChanged");
        assert!(json["payload"]["bbox"].is_null());
    }

    #[test]
    fn test_rect_committed_payload_shape() {
        let json =
            serde_json::to_value(Intent::rect_committed(Uuid::nil(), Rect::new(10.0, 10.0, 40.0, 70.0)))
                .unwrap();
        assert_eq!(
            json["payload"]["rect"],
            serde_json::json!({ "x": 10.0, "y": 10.0, "width": 40.0, "height": 70.0 })
        );
    }

    #[test]
    fn test_geometry_classification() {
        let id = Uuid::new_v4();
        assert!(Intent::point_appended(id, Point::new(0.0, 0.0)).touches_geometry());
        assert!(!Intent::bbox_changed(id, None).touches_geometry());
        assert_eq!(Intent::brush_size_changed(5).layer_id(), None);
    }
}
