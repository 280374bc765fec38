//! Pointer-driven drawing session.
//!
//! ```text
//! Idle -> Drawing       (down, brush/eraser, drawable selection)   emits strokeStarted
//! Idle -> Drawing       (move with button held, brush/eraser)      emits strokeStarted
//! Idle -> RectPending   (down, rect tool)
//! Idle -> Moving        (down, move tool, selection is topmost hit)
//! Drawing -> Drawing    (move >= spacing)                          emits pointAppended
//! Drawing -> Idle       (up)                                       emits terminal pointAppended if new
//! Drawing -> Idle       (leave with button held)                   emits edge pointAppended if new
//! RectPending -> Idle   (up)                                       emits rectCommitted
//! Moving -> Idle        (up or leave)                              emits layerTranslated if moved
//! Any -> Idle           (tool change, selection change)
//! ```
//!
//! The manager never touches layer state. It reads a [`CanvasState`] snapshot
//! and hands back at most one [`Intent`] per event.

use crate::config::CanvasConfig;
use crate::geometry::{Point, Rect};
use crate::intent::Intent;
use crate::layer::LayerId;
use crate::store::CanvasState;
use crate::tool::{calculate_new_brush_size, Tool};
use crate::viewport::{DevicePoint, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Leave,
}

/// A raw pointer sample from the host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    /// `None` when the host could not report a position.
    pub position: Option<DevicePoint>,
    /// Primary button held during this sample.
    pub primary_down: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, x: f64, y: f64, primary_down: bool) -> Self {
        Self {
            kind,
            position: Some(DevicePoint::new(x, y)),
            primary_down,
        }
    }

    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Down, x, y, true)
    }

    pub fn drag(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Move, x, y, true)
    }

    pub fn hover(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Move, x, y, false)
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Up, x, y, false)
    }

    pub fn leave(x: f64, y: f64, primary_down: bool) -> Self {
        Self::new(PointerEventKind::Leave, x, y, primary_down)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

/// Result of a wheel event.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelOutcome {
    pub intent: Option<Intent>,
    /// The host must cancel its default scroll handling.
    pub prevent_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    Idle,
    Drawing {
        layer_id: LayerId,
        last_committed: Point,
    },
    RectPending {
        layer_id: LayerId,
        down_at: Point,
    },
    Moving {
        layer_id: LayerId,
        down_at: Point,
        origin: Point,
        current: Point,
    },
}

/// An in-progress drag, shown by the renderer before it is committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    pub layer_id: LayerId,
    pub dx: f64,
    pub dy: f64,
}

/// Session data the renderer draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionPreview {
    pub cursor: Option<Point>,
    pub pointer_down_at: Option<Point>,
    pub drag: Option<DragPreview>,
}

#[derive(Debug)]
pub struct SessionManager {
    spacing: f64,
    min_brush_size: u32,
    max_brush_size: u32,
    state: SessionState,
    cursor: Option<Point>,
    /// Tool and selection the current session was started under.
    context: Option<(Tool, Option<LayerId>)>,
}

impl SessionManager {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            spacing: config.brush_spacing,
            min_brush_size: config.min_brush_size,
            max_brush_size: config.max_brush_size,
            state: SessionState::Idle,
            cursor: None,
            context: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, SessionState::Drawing { .. })
    }

    pub fn pointer_down_at(&self) -> Option<Point> {
        match self.state {
            SessionState::RectPending { down_at, .. } | SessionState::Moving { down_at, .. } => {
                Some(down_at)
            }
            SessionState::Idle | SessionState::Drawing { .. } => None,
        }
    }

    pub fn last_committed_point(&self) -> Option<Point> {
        match self.state {
            SessionState::Drawing { last_committed, .. } => Some(last_committed),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    pub fn preview(&self) -> SessionPreview {
        let drag = match self.state {
            SessionState::Moving {
                layer_id,
                down_at,
                current,
                ..
            } => Some(DragPreview {
                layer_id,
                dx: current.x - down_at.x,
                dy: current.y - down_at.y,
            }),
            _ => None,
        };
        SessionPreview {
            cursor: self.cursor,
            pointer_down_at: self.pointer_down_at(),
            drag,
        }
    }

    /// Drop any session in progress without emitting geometry.
    pub fn reset(&mut self) {
        if self.state != SessionState::Idle {
            log::trace!("Discarding session {:?}", self.state);
        }
        self.state = SessionState::Idle;
    }

    /// Reset the session if the tool or selection changed since it started.
    pub fn observe(&mut self, canvas: &CanvasState) {
        let context = (canvas.tool(), canvas.selected_layer_id());
        if self.context != Some(context) {
            if self.context.is_some() {
                self.reset();
            }
            self.context = Some(context);
        }
    }

    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        viewport: &Viewport,
        canvas: &CanvasState,
    ) -> Option<Intent> {
        self.observe(canvas);
        let resolved = event.position.and_then(|p| viewport.to_canvas_space(p));
        let intent = match event.kind {
            PointerEventKind::Down => {
                self.cursor = resolved.or(self.cursor);
                self.on_down(resolved?, canvas)
            }
            PointerEventKind::Move => {
                self.cursor = resolved.or(self.cursor);
                self.on_move(resolved?, event.primary_down, canvas)
            }
            PointerEventKind::Up => {
                let at = resolved.or(self.cursor);
                self.on_up(at, canvas)
            }
            PointerEventKind::Leave => {
                let at = event
                    .position
                    .and_then(|p| viewport.to_canvas_edge(p))
                    .or(self.cursor);
                self.cursor = None;
                self.on_leave(at, event.primary_down, canvas)
            }
        };
        if let Some(intent) = &intent {
            log::debug!("Session emitted {:?}", intent);
        }
        intent
    }

    pub fn handle_wheel(&mut self, event: &WheelEvent, canvas: &CanvasState) -> WheelOutcome {
        let mut outcome = WheelOutcome {
            intent: None,
            prevent_default: true,
        };
        if !canvas.tool().is_brush_like()
            || canvas.drawable_selection().is_none()
            || !event.modifiers.command()
        {
            return outcome;
        }
        let delta = if canvas.invert_scroll_direction {
            -event.delta_y
        } else {
            event.delta_y
        };
        let current = canvas.brush_size();
        let size =
            calculate_new_brush_size(current, delta, self.min_brush_size, self.max_brush_size);
        if size != current {
            outcome.intent = Some(Intent::brush_size_changed(size));
        }
        outcome
    }

    fn on_down(&mut self, at: Point, canvas: &CanvasState) -> Option<Intent> {
        // A down without a matching up leaves a stale session behind.
        self.reset();
        let layer = canvas.drawable_selection()?;
        let layer_id = layer.id;
        match canvas.tool() {
            Tool::Brush | Tool::Eraser => self.start_stroke(layer_id, at, canvas.tool()),
            Tool::Rect => {
                self.state = SessionState::RectPending {
                    layer_id,
                    down_at: at,
                };
                None
            }
            Tool::Move => {
                if canvas.layer_at(&at) == Some(layer_id) {
                    self.state = SessionState::Moving {
                        layer_id,
                        down_at: at,
                        origin: layer.position(),
                        current: at,
                    };
                }
                None
            }
        }
    }

    fn on_move(&mut self, at: Point, primary_down: bool, canvas: &CanvasState) -> Option<Intent> {
        match self.state {
            SessionState::Idle => {
                if !primary_down || !canvas.tool().is_brush_like() {
                    return None;
                }
                let layer_id = canvas.drawable_selection()?.id;
                self.start_stroke(layer_id, at, canvas.tool())
            }
            SessionState::Drawing {
                layer_id,
                last_committed,
            } => {
                if !primary_down {
                    // The up event was lost; the stroke is already capped at its last point.
                    self.reset();
                    return None;
                }
                if !Self::target_valid(canvas, layer_id) {
                    self.reset();
                    return None;
                }
                if last_committed.distance_to(&at) < self.spacing {
                    return None;
                }
                self.state = SessionState::Drawing {
                    layer_id,
                    last_committed: at,
                };
                Some(Intent::point_appended(layer_id, at))
            }
            SessionState::RectPending { .. } => None,
            SessionState::Moving {
                layer_id,
                down_at,
                origin,
                ..
            } => {
                self.state = SessionState::Moving {
                    layer_id,
                    down_at,
                    origin,
                    current: at,
                };
                None
            }
        }
    }

    fn on_up(&mut self, at: Option<Point>, canvas: &CanvasState) -> Option<Intent> {
        let state = self.state;
        self.reset();
        let at = at?;
        match state {
            SessionState::Idle => None,
            SessionState::Drawing {
                layer_id,
                last_committed,
            } => {
                if at == last_committed || !Self::target_valid(canvas, layer_id) {
                    return None;
                }
                Some(Intent::point_appended(layer_id, at))
            }
            SessionState::RectPending { layer_id, down_at } => {
                if !Self::target_valid(canvas, layer_id) {
                    return None;
                }
                Some(Intent::rect_committed(layer_id, Rect::from_corners(down_at, at)))
            }
            SessionState::Moving {
                layer_id,
                down_at,
                origin,
                ..
            } => Self::commit_move(canvas, layer_id, origin, at.x - down_at.x, at.y - down_at.y),
        }
    }

    fn on_leave(
        &mut self,
        at: Option<Point>,
        primary_down: bool,
        canvas: &CanvasState,
    ) -> Option<Intent> {
        let state = self.state;
        self.reset();
        match state {
            SessionState::Drawing {
                layer_id,
                last_committed,
            } => {
                if !primary_down || !canvas.tool().is_brush_like() {
                    return None;
                }
                let at = at?;
                if at == last_committed || !Self::target_valid(canvas, layer_id) {
                    return None;
                }
                Some(Intent::point_appended(layer_id, at))
            }
            SessionState::Moving {
                layer_id,
                down_at,
                origin,
                current,
            } => {
                let end = at.unwrap_or(current);
                Self::commit_move(canvas, layer_id, origin, end.x - down_at.x, end.y - down_at.y)
            }
            SessionState::Idle | SessionState::RectPending { .. } => None,
        }
    }

    fn start_stroke(&mut self, layer_id: LayerId, at: Point, tool: Tool) -> Option<Intent> {
        let stroke_tool = tool.stroke_tool()?;
        self.state = SessionState::Drawing {
            layer_id,
            last_committed: at,
        };
        Some(Intent::stroke_started(layer_id, at, stroke_tool))
    }

    fn commit_move(
        canvas: &CanvasState,
        layer_id: LayerId,
        origin: Point,
        dx: f64,
        dy: f64,
    ) -> Option<Intent> {
        if (dx == 0.0 && dy == 0.0) || !Self::target_valid(canvas, layer_id) {
            return None;
        }
        Some(Intent::layer_translated(layer_id, origin.translate(dx, dy)))
    }

    /// The session target still exists, is selected and accepts drawing.
    fn target_valid(canvas: &CanvasState, layer_id: LayerId) -> bool {
        canvas
            .drawable_selection()
            .is_some_and(|layer| layer.id == layer_id)
    }
}
