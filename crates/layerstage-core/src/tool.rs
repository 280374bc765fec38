use serde::{Deserialize, Serialize};

/// The active canvas tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Rect,
    Move,
}

impl Tool {
    /// Brush and eraser share the stroke pipeline and the brush size.
    pub fn is_brush_like(self) -> bool {
        matches!(self, Tool::Brush | Tool::Eraser)
    }

    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            Tool::Brush => Some(StrokeTool::Brush),
            Tool::Eraser => Some(StrokeTool::Eraser),
            Tool::Rect | Tool::Move => None,
        }
    }
}

/// The tool a stroke was painted with; erasing strokes cut out of the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeTool {
    Brush,
    Eraser,
}

/// Brush size after one modifier+wheel step.
///
/// The step grows exponentially with the current size so that large brushes
/// change quickly and small brushes can be tuned a pixel at a time. The step is
/// capped at 20px in either direction before being applied, and the result is
/// clamped to `[min, max]`.
pub fn calculate_new_brush_size(size: u32, delta: f64, min: u32, max: u32) -> u32 {
    if delta == 0.0 || !delta.is_finite() {
        return size.clamp(min, max);
    }
    let target = delta.signum() * 0.7363 * 1.0394_f64.powf(f64::from(size));
    let step = target.clamp(-20.0, 20.0);
    let next = (f64::from(size) + step).ceil();
    let clamped = next.clamp(f64::from(min), f64::from(max));
    clamped as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brush_like_tools() {
        assert!(Tool::Brush.is_brush_like());
        assert!(Tool::Eraser.is_brush_like());
        assert!(!Tool::Rect.is_brush_like());
        assert_eq!(Tool::Move.stroke_tool(), None);
        assert_eq!(Tool::Eraser.stroke_tool(), Some(StrokeTool::Eraser));
    }

    #[test]
    fn test_brush_size_grows_and_shrinks() {
        // 0.7363 * 1.0394^50 ~= 5.07
        assert_eq!(calculate_new_brush_size(50, 100.0, 1, 500), 56);
        assert_eq!(calculate_new_brush_size(50, -100.0, 1, 500), 45);
    }

    #[test]
    fn test_brush_size_step_is_capped() {
        assert_eq!(calculate_new_brush_size(200, 1.0, 1, 500), 220);
        assert_eq!(calculate_new_brush_size(200, -1.0, 1, 500), 180);
    }

    #[test]
    fn test_brush_size_clamped_to_range() {
        assert_eq!(calculate_new_brush_size(1, -10.0, 1, 500), 1);
        assert_eq!(calculate_new_brush_size(495, 10.0, 1, 500), 500);
        assert_eq!(calculate_new_brush_size(30, 0.0, 1, 500), 30);
    }

    #[test]
    fn test_tool_serde_names() {
        assert_eq!(serde_json::to_string(&Tool::Rect).unwrap(), "\"rect\"");
        let t: StrokeTool = serde_json::from_str("\"eraser\"").unwrap();
        assert_eq!(t, StrokeTool::Eraser);
    }
}
