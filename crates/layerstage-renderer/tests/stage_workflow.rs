use std::time::{Duration, Instant};

use layerstage_core::intent::Intent;
use layerstage_core::layer::LayerObject;
use layerstage_core::session::{Modifiers, SessionState};
use layerstage_core::{
    CanvasConfig, CanvasSize, CanvasState, ContainerSize, Layer, LayerId, Point, PointerEvent,
    Rect, Tool, WheelEvent,
};
use layerstage_renderer::{OverlayKind, RecordingSurface, RenderMode, Shape, Stage, Surface};

/// A host loop: pointer input goes through the stage, intents are applied to
/// the state, and the stage renders the result.
struct Host {
    state: CanvasState,
    stage: Stage<RecordingSurface>,
    notifications: Vec<Intent>,
    now: Instant,
}

impl Host {
    fn new(canvas: CanvasSize, mode: RenderMode, container: Option<ContainerSize>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = CanvasConfig::default();
        let state = CanvasState::new(canvas, &config);
        let stage = Stage::mount(RecordingSurface::new(), mode, &state, &config, container, 1.0)
            .expect("fresh surface mounts");
        Self {
            state,
            stage,
            notifications: Vec::new(),
            now: Instant::now(),
        }
    }

    fn live() -> Self {
        Self::new(CanvasSize::new(256, 256), RenderMode::Live, None)
    }

    fn add_selected_mask(&mut self) -> LayerId {
        let id = self.state.add_layer(Layer::regional_mask("mask"));
        self.state.select_layer(Some(id)).unwrap();
        id
    }

    fn pointer(&mut self, event: PointerEvent) -> Option<Intent> {
        let intent = self.stage.pointer(&event, &self.state)?;
        self.notifications
            .extend(self.state.apply(&intent).expect("session emits valid intents"));
        self.stage.render(&self.state, self.now);
        Some(intent)
    }

    fn surface(&self) -> &RecordingSurface {
        self.stage.surface().unwrap()
    }
}

fn line_points(state: &CanvasState, id: LayerId) -> Vec<Point> {
    match state.layer(id).unwrap().objects.last() {
        Some(LayerObject::Line(line)) => line.points.clone(),
        other => panic!("expected a line, got {other:?}"),
    }
}

#[test]
fn test_brush_stroke_is_spaced() {
    let mut host = Host::live();
    let id = host.add_selected_mask();

    assert!(matches!(
        host.pointer(PointerEvent::down(0.0, 0.0)),
        Some(Intent::StrokeStarted(_))
    ));
    for x in 1..=100 {
        host.pointer(PointerEvent::drag(f64::from(x), 0.0));
    }
    // Terminal point equals the last committed one.
    assert_eq!(host.pointer(PointerEvent::up(100.0, 0.0)), None);

    let xs: Vec<f64> = line_points(&host.state, id).iter().skip(1).map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    assert!(line_points(&host.state, id).iter().all(|p| p.y == 0.0));

    let visual = &host.surface().layers()[0];
    assert!(matches!(
        visual.shapes.as_slice(),
        [Shape::Polyline { points, .. }] if points.len() == 7
    ));
    assert!(!host.stage.session().unwrap().is_drawing());
}

#[test]
fn test_rect_tool_commits_on_up() {
    let mut host = Host::live();
    let id = host.add_selected_mask();
    host.state.set_tool(Tool::Rect);

    assert_eq!(host.pointer(PointerEvent::down(10.0, 10.0)), None);
    assert_eq!(host.pointer(PointerEvent::drag(30.0, 40.0)), None);
    host.stage.render(&host.state, host.now);
    assert!(!host.surface().overlay(OverlayKind::ToolPreview).is_empty());

    let intent = host.pointer(PointerEvent::up(50.0, 80.0)).unwrap();
    let json = serde_json::to_value(&intent).unwrap();
    assert_eq!(json["type"], "rectCommitted");
    assert_eq!(
        json["payload"]["rect"],
        serde_json::json!({"x": 10.0, "y": 10.0, "width": 40.0, "height": 70.0})
    );
    assert_eq!(
        host.notifications,
        vec![Intent::bbox_changed(id, Some(Rect::new(10.0, 10.0, 40.0, 70.0)))]
    );
    assert!(host.surface().overlay(OverlayKind::ToolPreview).is_empty());
}

#[test]
fn test_half_size_container_scales_input() {
    let mut host = Host::new(
        CanvasSize::new(512, 512),
        RenderMode::Live,
        Some(ContainerSize::new(256.0, 256.0)),
    );
    assert_eq!(host.stage.viewport().scale, 0.5);
    assert_eq!(host.surface().physical_size(), (256, 256));

    let id = host.add_selected_mask();
    host.pointer(PointerEvent::down(50.0, 50.0)).unwrap();
    assert_eq!(
        line_points(&host.state, id),
        vec![Point::new(100.0, 100.0), Point::new(100.0, 100.0)]
    );
    // Outside the displayed surface.
    assert_eq!(host.stage.pointer(&PointerEvent::drag(300.0, 10.0), &host.state), None);
}

#[test]
fn test_empty_canvas_placeholder_live_only() {
    let mut live = Host::live();
    live.stage.render(&live.state, live.now);
    assert!(matches!(
        live.surface().overlay(OverlayKind::Placeholder),
        [Shape::Text { .. }]
    ));

    let mut preview = Host::new(CanvasSize::new(256, 256), RenderMode::Preview, None);
    assert_eq!(preview.stage.render(&preview.state, preview.now), None);
    let later = preview.now + Duration::from_millis(300);
    let stats = preview.stage.tick(later).unwrap();
    assert!(stats.overlays.is_empty());
    assert!(preview.surface().frame().overlays.is_empty());
}

#[test]
fn test_preview_follows_state_after_delay() {
    let mut preview = Host::new(CanvasSize::new(256, 256), RenderMode::Preview, None);
    let id = preview.state.add_layer(Layer::regional_mask("mask"));
    preview
        .state
        .apply(&Intent::rect_committed(id, Rect::new(0.0, 0.0, 8.0, 8.0)))
        .unwrap();

    preview.stage.render(&preview.state, preview.now);
    assert!(preview.surface().layers().is_empty());
    assert_eq!(preview.stage.tick(preview.now + Duration::from_millis(299)), None);
    preview.stage.tick(preview.now + Duration::from_millis(300)).unwrap();
    assert_eq!(preview.surface().layer_order(), vec![id]);
}

#[test]
fn test_leave_while_drawing_emits_final_point() {
    let mut host = Host::live();
    let id = host.add_selected_mask();
    host.pointer(PointerEvent::down(0.0, 0.0));
    assert_eq!(host.pointer(PointerEvent::drag(10.0, 0.0)), None);

    let intent = host.pointer(PointerEvent::leave(37.0, 0.0, true));
    assert_eq!(intent, Some(Intent::point_appended(id, Point::new(37.0, 0.0))));
    assert_eq!(host.stage.session().unwrap().state(), SessionState::Idle);
    assert_eq!(line_points(&host.state, id).last(), Some(&Point::new(37.0, 0.0)));
}

#[test]
fn test_reorder_restacks_without_geometry_change() {
    let mut host = Host::live();
    let a = host.state.add_layer(Layer::regional_mask("a"));
    let b = host.state.add_layer(Layer::regional_mask("b"));
    for (id, x) in [(a, 0.0), (b, 50.0)] {
        host.state
            .apply(&Intent::rect_committed(id, Rect::new(x, 0.0, 10.0, 10.0)))
            .unwrap();
    }
    host.stage.render(&host.state, host.now);
    let updates = host.surface().total_layer_updates();

    let report = host.state.move_layer(b, 0).unwrap();
    assert!(report.order_changed);
    assert!(report.notifications.is_empty());

    let stats = host.stage.render(&host.state, host.now).unwrap();
    assert!(stats.restacked);
    assert!(stats.redrawn.is_empty());
    assert_eq!(host.surface().layer_order(), vec![b, a]);
    assert_eq!(host.surface().total_layer_updates(), updates);
}

#[test]
fn test_move_tool_drags_selected_layer() {
    let mut host = Host::live();
    let id = host.add_selected_mask();
    host.state
        .apply(&Intent::rect_committed(id, Rect::new(10.0, 10.0, 20.0, 20.0)))
        .unwrap();
    host.state.set_tool(Tool::Move);

    assert_eq!(host.pointer(PointerEvent::down(15.0, 15.0)), None);
    assert_eq!(host.pointer(PointerEvent::drag(25.0, 20.0)), None);
    host.stage.render(&host.state, host.now);
    assert_eq!(host.surface().layers()[0].offset, Point::new(10.0, 5.0));
    assert!(!host.surface().overlay(OverlayKind::BboxHandles).is_empty());

    let intent = host.pointer(PointerEvent::up(25.0, 20.0));
    assert_eq!(intent, Some(Intent::layer_translated(id, Point::new(10.0, 5.0))));
    assert_eq!(
        host.notifications.last(),
        Some(&Intent::bbox_changed(id, Some(Rect::new(20.0, 15.0, 20.0, 20.0))))
    );
}

#[test]
fn test_command_wheel_resizes_brush() {
    let mut host = Host::live();
    host.add_selected_mask();
    let wheel = WheelEvent {
        delta_y: 100.0,
        modifiers: Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
    };
    let outcome = host.stage.wheel(&wheel, &host.state);
    assert!(outcome.prevent_default);
    match outcome.intent {
        Some(Intent::BrushSizeChanged(change)) => assert!(change.size > 100),
        other => panic!("expected a brush size change, got {other:?}"),
    }
}

#[test]
fn test_unmount_releases_surface() {
    let host = Host::live();
    let surface = host.stage.unmount().unwrap();
    assert!(surface.is_disposed());
    assert!(!surface.is_listening());
}
