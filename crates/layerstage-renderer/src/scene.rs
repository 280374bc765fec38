//! Scene projection and the two renderer strategies.
//!
//! Rendering is split in two steps. [`plan_scene`] is a projection of
//! the canvas snapshot into layer visuals and overlays. A [`RetainedScene`]
//! then diffs that plan against what the surface already shows and sends only
//! the differences: new or changed layer nodes, removals, a restack when the
//! list order changed, and changed overlays. Rendering the same snapshot twice
//! therefore touches nothing the second time.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use layerstage_core::layer::{Layer, LayerObject};
use layerstage_core::session::{DragPreview, SessionPreview};
use layerstage_core::tool::StrokeTool;
use layerstage_core::{CanvasConfig, CanvasState, LayerId, Point, Rect, Tool, Viewport};

use crate::debounce::Debouncer;
use crate::render_data::{Composite, CursorStyle, LayerVisual, OverlayKind, Rgba, Shape};
use crate::surface::Surface;

pub const NO_LAYERS_MESSAGE: &str = "No Layers Added";

const BBOX_SELECTED: Rgba = Rgba::new(66, 153, 225, 1.0);
const BBOX_IDLE: Rgba = Rgba::new(255, 255, 255, 0.5);
const CHECKER_LIGHT: Rgba = Rgba::new(255, 255, 255, 0.15);
const CHECKER_DARK: Rgba = Rgba::new(0, 0, 0, 0.15);

/// Read-only inputs for one render pass.
#[derive(Debug, Clone, Copy)]
pub struct SceneInput<'a> {
    pub state: &'a CanvasState,
    pub viewport: &'a Viewport,
    pub session: &'a SessionPreview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive surface with tool feedback.
    Live,
    /// Secondary thumbnail surface; layers only, debounced.
    Preview,
}

/// Identity of a layer node. Equal keys mean an identical node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualKey {
    pub layer_id: LayerId,
    pub revision: u64,
    pub offset: Point,
    pub opacity: f32,
}

/// One layer of a plan. The visual is built only when the key is new to the
/// retained scene the plan was made against.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLayer {
    pub key: VisualKey,
    pub visual: Option<LayerVisual>,
}

/// Everything one pass wants on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePlan {
    pub order: Vec<LayerId>,
    pub layers: Vec<PlannedLayer>,
    pub overlays: Vec<(OverlayKind, Vec<Shape>)>,
    pub cursor: Option<CursorStyle>,
}

impl ScenePlan {
    /// Same surface content, regardless of which visuals were prebuilt.
    pub fn same_scene(&self, other: &ScenePlan) -> bool {
        self.order == other.order
            && self.cursor == other.cursor
            && self.overlays == other.overlays
            && self
                .layers
                .iter()
                .map(|l| l.key)
                .eq(other.layers.iter().map(|l| l.key))
    }
}

/// What a pass actually changed on the surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub redrawn: Vec<LayerId>,
    pub removed: Vec<LayerId>,
    pub restacked: bool,
    pub overlays: Vec<OverlayKind>,
}

impl RenderStats {
    pub fn is_empty(&self) -> bool {
        self.redrawn.is_empty() && self.removed.is_empty() && !self.restacked && self.overlays.is_empty()
    }
}

// ── Projection ───────────────────────────────────────────────────────

fn object_shape(object: &LayerObject, color: Rgba) -> Shape {
    match object {
        LayerObject::Line(line) => Shape::Polyline {
            points: line.points.clone(),
            width: line.stroke_width,
            color,
            composite: match line.tool {
                StrokeTool::Brush => Composite::SourceOver,
                StrokeTool::Eraser => Composite::Erase,
            },
        },
        LayerObject::Rect(shape) => Shape::FilledRect {
            rect: shape.rect,
            color,
        },
    }
}

fn drag_for(layer: &Layer, drag: Option<&DragPreview>) -> (f64, f64) {
    drag.filter(|d| d.layer_id == layer.id)
        .map_or((0.0, 0.0), |d| (d.dx, d.dy))
}

fn layer_opacity(layer: &Layer, global_mask_opacity: f32) -> f32 {
    if layer.kind.uses_mask_opacity() {
        global_mask_opacity
    } else {
        layer.opacity
    }
}

pub fn visual_key(state: &CanvasState, layer: &Layer, drag: Option<&DragPreview>) -> VisualKey {
    let (dx, dy) = drag_for(layer, drag);
    VisualKey {
        layer_id: layer.id,
        revision: state.layer_revision(layer.id),
        offset: Point::new(layer.x + dx, layer.y + dy),
        opacity: layer_opacity(layer, state.global_mask_opacity),
    }
}

/// The visual node for one layer.
pub fn layer_visual(layer: &Layer, global_mask_opacity: f32, drag: Option<&DragPreview>) -> LayerVisual {
    let (dx, dy) = drag_for(layer, drag);
    let opacity = layer_opacity(layer, global_mask_opacity);
    let color = Rgba::from_layer_color(layer.color, 1.0);
    let shapes = if layer.visible {
        layer.objects.iter().map(|o| object_shape(o, color)).collect()
    } else {
        Vec::new()
    };
    LayerVisual {
        layer_id: layer.id,
        visible: layer.visible,
        offset: Point::new(layer.x + dx, layer.y + dy),
        opacity,
        shapes,
    }
}

fn background(viewport: &Viewport, checker_size: u32) -> Vec<Shape> {
    let canvas = viewport.canvas;
    vec![Shape::Checkerboard {
        rect: Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height)),
        cell: checker_size,
        light: CHECKER_LIGHT,
        dark: CHECKER_DARK,
    }]
}

fn placeholder(input: &SceneInput<'_>) -> Vec<Shape> {
    if !input.state.layers().is_empty() {
        return Vec::new();
    }
    let canvas = input.viewport.canvas;
    vec![Shape::Text {
        center: Point::new(f64::from(canvas.width) / 2.0, f64::from(canvas.height) / 2.0),
        text: NO_LAYERS_MESSAGE.to_string(),
        size: 32.0,
        color: Rgba::WHITE.with_alpha(0.8),
    }]
}

fn bbox_handles(input: &SceneInput<'_>) -> Vec<Shape> {
    let state = input.state;
    if state.tool() != Tool::Move {
        return Vec::new();
    }
    // One device pixel wide at any scale.
    let width = 1.0 / input.viewport.scale.max(f64::EPSILON);
    state
        .layers()
        .iter()
        .filter(|layer| layer.visible)
        .filter_map(|layer| {
            let bbox = layer.bbox?;
            let (dx, dy) = drag_for(layer, input.session.drag.as_ref());
            let color = if state.selected_layer_id() == Some(layer.id) {
                BBOX_SELECTED
            } else {
                BBOX_IDLE
            };
            Some(Shape::StrokedRect {
                rect: bbox.translate(dx, dy),
                width,
                color,
            })
        })
        .collect()
}

fn tool_preview(input: &SceneInput<'_>) -> (Vec<Shape>, CursorStyle) {
    let state = input.state;
    let Some(layer) = state.drawable_selection() else {
        return (Vec::new(), CursorStyle::Default);
    };
    let fill = Rgba::from_layer_color(layer.color, state.global_mask_opacity);
    match state.tool() {
        Tool::Move => (Vec::new(), CursorStyle::Default),
        Tool::Rect => {
            let shapes = match (input.session.pointer_down_at, input.session.cursor) {
                (Some(down), Some(cursor)) => vec![Shape::FilledRect {
                    rect: Rect::from_corners(down, cursor),
                    color: fill,
                }],
                _ => Vec::new(),
            };
            (shapes, CursorStyle::Crosshair)
        }
        Tool::Brush | Tool::Eraser => {
            let Some(center) = input.session.cursor else {
                return (Vec::new(), CursorStyle::None);
            };
            let radius = f64::from(state.brush_size()) / 2.0;
            let fill = if state.tool() == Tool::Brush {
                fill
            } else {
                Rgba::WHITE
            };
            let shapes = vec![
                Shape::Circle {
                    center,
                    radius,
                    fill: Some(fill),
                    stroke: None,
                },
                Shape::Circle {
                    center,
                    radius: radius + 1.0,
                    fill: None,
                    stroke: Some(Rgba::BLACK),
                },
                Shape::Circle {
                    center,
                    radius: radius + 2.0,
                    fill: None,
                    stroke: Some(Rgba::WHITE),
                },
            ];
            (shapes, CursorStyle::None)
        }
    }
}

/// Project a snapshot for the given mode.
///
/// Layer shapes are rebuilt only for layers whose key differs from what
/// `known` already shows.
pub fn plan_scene(
    input: &SceneInput<'_>,
    mode: RenderMode,
    checker_size: u32,
    known: &RetainedScene,
) -> ScenePlan {
    let state = input.state;
    let drag = input.session.drag.as_ref();
    let layers: Vec<PlannedLayer> = state
        .layers()
        .iter()
        .map(|layer| {
            let key = visual_key(state, layer, drag);
            let visual = (known.key_of(layer.id) != Some(key))
                .then(|| layer_visual(layer, state.global_mask_opacity, drag));
            PlannedLayer { key, visual }
        })
        .collect();
    let order = layers.iter().map(|l| l.key.layer_id).collect();

    match mode {
        RenderMode::Live => {
            let (preview, cursor) = tool_preview(input);
            ScenePlan {
                order,
                layers,
                overlays: vec![
                    (OverlayKind::Background, background(input.viewport, checker_size)),
                    (OverlayKind::BboxHandles, bbox_handles(input)),
                    (OverlayKind::ToolPreview, preview),
                    (OverlayKind::Placeholder, placeholder(input)),
                ],
                cursor: Some(cursor),
            }
        }
        RenderMode::Preview => ScenePlan {
            order,
            layers,
            overlays: Vec::new(),
            cursor: None,
        },
    }
}

// ── Retained diffing ─────────────────────────────────────────────────

/// Mirror of what has been sent to the surface.
#[derive(Debug, Default)]
pub struct RetainedScene {
    order: Vec<LayerId>,
    keys: HashMap<LayerId, VisualKey>,
    overlays: HashMap<OverlayKind, Vec<Shape>>,
    cursor: Option<CursorStyle>,
}

impl RetainedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_of(&self, id: LayerId) -> Option<VisualKey> {
        self.keys.get(&id).copied()
    }

    pub fn apply(&mut self, plan: &ScenePlan, surface: &mut dyn Surface) -> RenderStats {
        let mut stats = RenderStats::default();

        let stale: Vec<LayerId> = self
            .keys
            .keys()
            .filter(|id| !plan.order.contains(id))
            .copied()
            .collect();
        for id in stale {
            surface.remove_layer(id);
            self.keys.remove(&id);
            stats.removed.push(id);
        }

        for planned in &plan.layers {
            let id = planned.key.layer_id;
            if self.keys.get(&id) == Some(&planned.key) {
                continue;
            }
            let Some(visual) = &planned.visual else {
                log::warn!("No visual planned for changed layer {}", id);
                continue;
            };
            surface.upsert_layer(visual);
            self.keys.insert(id, planned.key);
            stats.redrawn.push(id);
        }

        if plan.order != self.order {
            log::trace!("Arranging layers");
            surface.restack(&plan.order);
            self.order = plan.order.clone();
            stats.restacked = true;
        }

        for (kind, shapes) in &plan.overlays {
            let current = self.overlays.get(kind).map(Vec::as_slice).unwrap_or(&[]);
            if current != shapes.as_slice() {
                surface.set_overlay(*kind, shapes);
                self.overlays.insert(*kind, shapes.clone());
                stats.overlays.push(*kind);
            }
        }

        if let Some(cursor) = plan.cursor {
            if self.cursor != Some(cursor) {
                surface.set_cursor(cursor);
                self.cursor = Some(cursor);
            }
        }

        stats
    }
}

// ── Strategies ───────────────────────────────────────────────────────

pub trait SceneRenderer: std::fmt::Debug {
    fn mode(&self) -> RenderMode;

    /// Whether the surface should deliver pointer events.
    fn listening(&self) -> bool {
        self.mode() == RenderMode::Live
    }

    /// Render a snapshot. Returns what changed on the surface, or `None` if
    /// the update was deferred.
    fn render(
        &mut self,
        surface: &mut dyn Surface,
        input: &SceneInput<'_>,
        now: Instant,
    ) -> Option<RenderStats>;

    /// Flush deferred work whose time has come.
    fn poll(&mut self, surface: &mut dyn Surface, now: Instant) -> Option<RenderStats>;
}

/// Pick the strategy for a mount; the choice is fixed for the mount's lifetime.
pub fn renderer_for(mode: RenderMode, config: &CanvasConfig) -> Box<dyn SceneRenderer> {
    match mode {
        RenderMode::Live => Box::new(LiveRenderer::new(config)),
        RenderMode::Preview => Box::new(PreviewRenderer::new(config)),
    }
}

#[derive(Debug)]
pub struct LiveRenderer {
    scene: RetainedScene,
    checker_size: u32,
}

impl LiveRenderer {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            scene: RetainedScene::new(),
            checker_size: config.checker_size,
        }
    }
}

impl SceneRenderer for LiveRenderer {
    fn mode(&self) -> RenderMode {
        RenderMode::Live
    }

    fn render(
        &mut self,
        surface: &mut dyn Surface,
        input: &SceneInput<'_>,
        _now: Instant,
    ) -> Option<RenderStats> {
        let plan = plan_scene(input, RenderMode::Live, self.checker_size, &self.scene);
        let stats = self.scene.apply(&plan, surface);
        if !stats.is_empty() {
            log::trace!(
                "Rendered {} layer(s), {} overlay(s)",
                stats.redrawn.len(),
                stats.overlays.len()
            );
        }
        Some(stats)
    }

    fn poll(&mut self, _surface: &mut dyn Surface, _now: Instant) -> Option<RenderStats> {
        None
    }
}

#[derive(Debug)]
pub struct PreviewRenderer {
    scene: RetainedScene,
    debouncer: Debouncer,
    pending: Option<ScenePlan>,
    applied: Option<ScenePlan>,
    checker_size: u32,
}

impl PreviewRenderer {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            scene: RetainedScene::new(),
            debouncer: Debouncer::new(Duration::from_millis(config.preview_debounce_ms)),
            pending: None,
            applied: None,
            checker_size: config.checker_size,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl SceneRenderer for PreviewRenderer {
    fn mode(&self) -> RenderMode {
        RenderMode::Preview
    }

    fn render(
        &mut self,
        surface: &mut dyn Surface,
        input: &SceneInput<'_>,
        now: Instant,
    ) -> Option<RenderStats> {
        let plan = plan_scene(input, RenderMode::Preview, self.checker_size, &self.scene);
        let latest = self.pending.as_ref().or(self.applied.as_ref());
        if !latest.is_some_and(|latest| latest.same_scene(&plan)) {
            self.pending = Some(plan);
            self.debouncer.trigger(now);
        }
        self.poll(surface, now)
    }

    fn poll(&mut self, surface: &mut dyn Surface, now: Instant) -> Option<RenderStats> {
        if !self.debouncer.fire(now) {
            return None;
        }
        let plan = self.pending.take()?;
        log::trace!("Rendering preview");
        let stats = self.scene.apply(&plan, surface);
        self.applied = Some(plan);
        Some(stats)
    }
}
