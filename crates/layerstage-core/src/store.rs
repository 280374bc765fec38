use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::CanvasConfig;
use crate::geometry::Point;
use crate::intent::Intent;
use crate::layer::{parse_layers_lenient, BrushLine, Layer, LayerId, LayerObject, RectShape};
use crate::sync::{SyncReport, Synchronizer};
use crate::tool::Tool;
use crate::viewport::CanvasSize;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Layer {0} does not exist")]
    UnknownLayer(LayerId),

    #[error("Layer {0} does not accept drawing")]
    NotDrawable(LayerId),

    #[error("Layer {0} has no stroke to extend")]
    NoStroke(LayerId),

    #[error("Layer index {index} out of range for {len} layers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid canvas state JSON: {0}")]
    Json(String),
}

/// Snapshot of everything the canvas reads, plus the reducer for its intents.
///
/// Layers are mutated only through [`CanvasState::apply`] and the external
/// layer actions below; every mutation is followed by a synchronization pass
/// so cached bboxes are never stale.
#[derive(Debug, Serialize)]
pub struct CanvasState {
    layers: Vec<Layer>,
    selected_layer_id: Option<LayerId>,
    tool: Tool,
    brush_size: u32,
    pub global_mask_opacity: f32,
    pub canvas_size: CanvasSize,
    pub invert_scroll_direction: bool,
    #[serde(skip)]
    synchronizer: Synchronizer,
    /// Bbox notifications from layer actions that have no reducer return value.
    #[serde(skip)]
    outbox: Vec<Intent>,
    #[serde(skip)]
    revisions: HashMap<LayerId, u64>,
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Revisions are unique across every state instance.
fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Wire form accepted by [`CanvasState::from_json`]; layers are parsed leniently.
#[derive(Deserialize)]
#[serde(default)]
struct CanvasStateDocument {
    layers: serde_json::Value,
    selected_layer_id: Option<LayerId>,
    tool: Tool,
    brush_size: Option<u32>,
    global_mask_opacity: Option<f32>,
    canvas_size: Option<CanvasSize>,
    invert_scroll_direction: Option<bool>,
}

impl Default for CanvasStateDocument {
    fn default() -> Self {
        Self {
            layers: serde_json::Value::Array(Vec::new()),
            selected_layer_id: None,
            tool: Tool::default(),
            brush_size: None,
            global_mask_opacity: None,
            canvas_size: None,
            invert_scroll_direction: None,
        }
    }
}

impl CanvasState {
    pub fn new(canvas_size: CanvasSize, config: &CanvasConfig) -> Self {
        Self {
            layers: Vec::new(),
            selected_layer_id: None,
            tool: Tool::default(),
            brush_size: config.initial_brush_size(),
            global_mask_opacity: config.global_mask_opacity,
            canvas_size,
            invert_scroll_direction: config.invert_scroll_direction,
            synchronizer: Synchronizer::new(),
            outbox: Vec::new(),
            revisions: HashMap::new(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn selected_layer_id(&self) -> Option<LayerId> {
        self.selected_layer_id
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected_layer_id.and_then(|id| self.layer(id))
    }

    /// The selected layer, if it accepts drawing.
    pub fn drawable_selection(&self) -> Option<&Layer> {
        self.selected_layer().filter(|l| l.accepts_drawing())
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Changes whenever the layer's drawable content or offset changes.
    pub fn layer_revision(&self, id: LayerId) -> u64 {
        self.revisions.get(&id).copied().unwrap_or(0)
    }

    /// Drain `layerBboxChanged` notifications produced by layer actions
    /// (add, remove, restore) since the last call.
    pub fn take_notifications(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.outbox)
    }

    /// Front-most visible layer whose bbox contains `point`.
    pub fn layer_at(&self, point: &Point) -> Option<LayerId> {
        self.synchronizer.index().topmost_at(point)
    }

    // ── External layer actions ───────────────────────────────────────

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        self.layers.push(layer);
        self.revisions.insert(id, next_revision());
        self.synchronize_to_outbox();
        id
    }

    /// Remove a layer; clears the selection if it pointed at it.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        let layer = self.layers.remove(index);
        if self.selected_layer_id == Some(id) {
            self.selected_layer_id = None;
        }
        self.revisions.remove(&id);
        self.synchronize_to_outbox();
        Some(layer)
    }

    /// Move a layer to `to` in the list, changing only its stacking.
    pub fn move_layer(&mut self, id: LayerId, to: usize) -> Result<SyncReport, StoreError> {
        let len = self.layers.len();
        if to >= len {
            return Err(StoreError::IndexOutOfRange { index: to, len });
        }
        let from = self.index_of(id)?;
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        Ok(self.synchronize())
    }

    pub fn select_layer(&mut self, id: Option<LayerId>) -> Result<(), StoreError> {
        if let Some(id) = id {
            self.index_of(id)?;
        }
        self.selected_layer_id = id;
        Ok(())
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size;
    }

    // ── Intent reducer ───────────────────────────────────────────────

    /// Apply one intent and synchronize.
    ///
    /// Returns the `layerBboxChanged` notifications produced by the pass.
    pub fn apply(&mut self, intent: &Intent) -> Result<Vec<Intent>, StoreError> {
        log::debug!("Applying {:?}", intent);
        match intent {
            Intent::StrokeStarted(i) => {
                let brush_size = f64::from(self.brush_size);
                let layer = self.drawable_layer_mut(i.layer_id)?;
                let [x0, y0, x1, y1] = i.points;
                layer.objects.push(LayerObject::Line(BrushLine {
                    id: Uuid::new_v4(),
                    tool: i.tool,
                    stroke_width: brush_size,
                    points: vec![Point::new(x0, y0), Point::new(x1, y1)],
                }));
            }
            Intent::PointAppended(i) => {
                let layer = self.drawable_layer_mut(i.layer_id)?;
                let line = layer
                    .last_line_mut()
                    .ok_or(StoreError::NoStroke(i.layer_id))?;
                line.points.push(Point::new(i.point[0], i.point[1]));
            }
            Intent::RectCommitted(i) => {
                let layer = self.drawable_layer_mut(i.layer_id)?;
                layer.objects.push(LayerObject::Rect(RectShape {
                    id: Uuid::new_v4(),
                    rect: i.rect,
                }));
            }
            Intent::LayerTranslated(i) => {
                let layer = self.layer_mut(i.layer_id)?;
                layer.x = i.x;
                layer.y = i.y;
            }
            Intent::LayerBboxChanged(i) => {
                // Cached value only; the pass below restores the tight bound if this disagrees.
                self.layer_mut(i.layer_id)?.bbox = i.bbox;
            }
            Intent::BrushSizeChanged(i) => {
                self.brush_size = i.size;
            }
        }
        let Some(layer_id) = intent.layer_id() else {
            return Ok(Vec::new());
        };
        if intent.touches_geometry() {
            self.revisions.insert(layer_id, next_revision());
        }
        Ok(self.synchronize().notifications)
    }

    /// Apply a batch in order, collecting every bbox notification.
    pub fn apply_all<'a, I>(&mut self, intents: I) -> Result<Vec<Intent>, StoreError>
    where
        I: IntoIterator<Item = &'a Intent>,
    {
        let mut notifications = Vec::new();
        for intent in intents {
            notifications.extend(self.apply(intent)?);
        }
        Ok(notifications)
    }

    fn synchronize(&mut self) -> SyncReport {
        self.synchronizer.sync(&mut self.layers)
    }

    fn synchronize_to_outbox(&mut self) {
        let report = self.synchronize();
        self.outbox.extend(report.notifications);
    }

    fn index_of(&self, id: LayerId) -> Result<usize, StoreError> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(StoreError::UnknownLayer(id))
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, StoreError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::UnknownLayer(id))
    }

    fn drawable_layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, StoreError> {
        let layer = self.layer_mut(id)?;
        if !layer.accepts_drawing() {
            return Err(StoreError::NotDrawable(id));
        }
        Ok(layer)
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Restore a snapshot. Invalid layer records are dropped, valid ones kept.
    pub fn from_json(json: &str, config: &CanvasConfig) -> Result<Self, StoreError> {
        let doc: CanvasStateDocument =
            serde_json::from_str(json).map_err(|e| StoreError::Json(e.to_string()))?;
        let mut state = Self::new(
            doc.canvas_size.unwrap_or(CanvasSize::new(1024, 1024)),
            config,
        );
        state.layers = parse_layers_lenient(&doc.layers);
        for layer in &state.layers {
            state.revisions.insert(layer.id, next_revision());
        }
        state.tool = doc.tool;
        if let Some(size) = doc.brush_size {
            state.brush_size = size.clamp(config.min_brush_size, config.max_brush_size);
        }
        if let Some(opacity) = doc.global_mask_opacity {
            state.global_mask_opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(invert) = doc.invert_scroll_direction {
            state.invert_scroll_direction = invert;
        }
        state.selected_layer_id = doc
            .selected_layer_id
            .filter(|id| state.layers.iter().any(|l| l.id == *id));
        state.synchronize_to_outbox();
        Ok(state)
    }
}
