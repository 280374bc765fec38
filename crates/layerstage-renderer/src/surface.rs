//! Render surfaces and their scoped acquisition.
//!
//! A [`Surface`] is a retained scene: one node per layer plus one node per
//! [`OverlayKind`]. Hosts implement it over their drawing backend;
//! [`RecordingSurface`] keeps the scene in memory for headless use and tests.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use uuid::Uuid;

use layerstage_core::LayerId;

use crate::render_data::{CursorStyle, LayerVisual, OverlayKind, RenderFrame, Shape};

#[derive(Error, Debug, PartialEq)]
pub enum SurfaceError {
    #[error("Surface {0} has been disposed")]
    Disposed(Uuid),

    #[error("Surface {0} is already attached to a stage")]
    InUse(Uuid),
}

pub trait Surface {
    fn id(&self) -> Uuid;
    /// Set backing store size and the scale from canvas units to physical pixels.
    fn configure(&mut self, physical_width: u32, physical_height: u32, scale: f64);
    fn attach_listeners(&mut self);
    fn detach_listeners(&mut self);
    fn is_listening(&self) -> bool;
    /// Insert or replace the node for `visual.layer_id`.
    fn upsert_layer(&mut self, visual: &LayerVisual);
    fn remove_layer(&mut self, id: LayerId);
    /// Stack layer nodes back-to-front in exactly this order.
    fn restack(&mut self, order: &[LayerId]);
    fn set_overlay(&mut self, kind: OverlayKind, shapes: &[Shape]);
    fn set_cursor(&mut self, cursor: CursorStyle);
    /// Release backing resources. The surface is unusable afterwards.
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;
}

/// Exclusive, scoped ownership of a surface.
///
/// Listeners are attached on acquire (when requested) and detached, and the
/// surface disposed, on [`release`](Self::release) or drop, whichever comes
/// first.
#[derive(Debug)]
pub struct SurfaceHandle<S: Surface> {
    surface: Option<S>,
}

impl<S: Surface> SurfaceHandle<S> {
    pub fn acquire(mut surface: S, listening: bool) -> Result<Self, SurfaceError> {
        if surface.is_disposed() {
            return Err(SurfaceError::Disposed(surface.id()));
        }
        if surface.is_listening() {
            return Err(SurfaceError::InUse(surface.id()));
        }
        log::trace!("Acquiring surface {}", surface.id());
        if listening {
            log::trace!("Adding surface listeners");
            surface.attach_listeners();
        }
        Ok(Self {
            surface: Some(surface),
        })
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Detach, dispose and hand the surface back for inspection.
    pub fn release(mut self) -> Option<S> {
        let mut surface = self.surface.take()?;
        Self::teardown(&mut surface);
        Some(surface)
    }

    fn teardown(surface: &mut S) {
        if surface.is_listening() {
            log::trace!("Cleaning up surface listeners");
            surface.detach_listeners();
        }
        log::trace!("Disposing surface {}", surface.id());
        surface.dispose();
    }
}

impl<S: Surface> Drop for SurfaceHandle<S> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            Self::teardown(surface);
        }
    }
}

/// In-memory retained surface.
///
/// Besides the scene itself it counts per-node updates, so callers can check
/// that only changed nodes were touched.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    id: Uuid,
    physical_size: (u32, u32),
    scale: f64,
    listening: bool,
    disposed: bool,
    cursor: CursorStyle,
    layers: Vec<LayerVisual>,
    overlays: BTreeMap<OverlayKind, Vec<Shape>>,
    layer_updates: HashMap<LayerId, usize>,
    overlay_updates: HashMap<OverlayKind, usize>,
    restacks: usize,
    configures: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            scale: 1.0,
            ..Self::default()
        }
    }

    pub fn physical_size(&self) -> (u32, u32) {
        self.physical_size
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    /// Layer nodes, back-to-front.
    pub fn layers(&self) -> &[LayerVisual] {
        &self.layers
    }

    pub fn layer_order(&self) -> Vec<LayerId> {
        self.layers.iter().map(|v| v.layer_id).collect()
    }

    pub fn overlay(&self, kind: OverlayKind) -> &[Shape] {
        self.overlays.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layer_updates(&self, id: LayerId) -> usize {
        self.layer_updates.get(&id).copied().unwrap_or(0)
    }

    pub fn total_layer_updates(&self) -> usize {
        self.layer_updates.values().sum()
    }

    pub fn overlay_updates(&self, kind: OverlayKind) -> usize {
        self.overlay_updates.get(&kind).copied().unwrap_or(0)
    }

    pub fn restacks(&self) -> usize {
        self.restacks
    }

    pub fn configures(&self) -> usize {
        self.configures
    }

    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            physical_width: self.physical_size.0,
            physical_height: self.physical_size.1,
            scale: self.scale,
            cursor: self.cursor,
            layers: self.layers.clone(),
            overlays: self
                .overlays
                .iter()
                .filter(|(_, shapes)| !shapes.is_empty())
                .map(|(kind, shapes)| (*kind, shapes.clone()))
                .collect(),
        }
    }
}

impl Surface for RecordingSurface {
    fn id(&self) -> Uuid {
        self.id
    }

    fn configure(&mut self, physical_width: u32, physical_height: u32, scale: f64) {
        self.physical_size = (physical_width, physical_height);
        self.scale = scale;
        self.configures += 1;
    }

    fn attach_listeners(&mut self) {
        self.listening = true;
    }

    fn detach_listeners(&mut self) {
        self.listening = false;
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn upsert_layer(&mut self, visual: &LayerVisual) {
        match self.layers.iter_mut().find(|v| v.layer_id == visual.layer_id) {
            Some(existing) => *existing = visual.clone(),
            None => self.layers.push(visual.clone()),
        }
        *self.layer_updates.entry(visual.layer_id).or_default() += 1;
    }

    fn remove_layer(&mut self, id: LayerId) {
        self.layers.retain(|v| v.layer_id != id);
    }

    fn restack(&mut self, order: &[LayerId]) {
        self.layers.sort_by_key(|v| {
            order
                .iter()
                .position(|id| *id == v.layer_id)
                .unwrap_or(usize::MAX)
        });
        self.restacks += 1;
    }

    fn set_overlay(&mut self, kind: OverlayKind, shapes: &[Shape]) {
        self.overlays.insert(kind, shapes.to_vec());
        *self.overlay_updates.entry(kind).or_default() += 1;
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }

    fn dispose(&mut self) {
        self.layers.clear();
        self.overlays.clear();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerstage_core::Point;

    fn visual(id: LayerId) -> LayerVisual {
        LayerVisual {
            layer_id: id,
            visible: true,
            offset: Point::new(0.0, 0.0),
            opacity: 1.0,
            shapes: Vec::new(),
        }
    }

    #[test]
    fn test_release_detaches_and_disposes() {
        let handle = SurfaceHandle::acquire(RecordingSurface::new(), true).unwrap();
        assert!(handle.surface().unwrap().is_listening());
        let surface = handle.release().unwrap();
        assert!(!surface.is_listening());
        assert!(surface.is_disposed());
    }

    /// Reports teardown through a shared flag so it can be observed after drop.
    struct ProbeSurface {
        inner: RecordingSurface,
        torn_down: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Surface for ProbeSurface {
        fn id(&self) -> Uuid {
            self.inner.id()
        }
        fn configure(&mut self, w: u32, h: u32, scale: f64) {
            self.inner.configure(w, h, scale);
        }
        fn attach_listeners(&mut self) {
            self.inner.attach_listeners();
        }
        fn detach_listeners(&mut self) {
            self.inner.detach_listeners();
        }
        fn is_listening(&self) -> bool {
            self.inner.is_listening()
        }
        fn upsert_layer(&mut self, visual: &LayerVisual) {
            self.inner.upsert_layer(visual);
        }
        fn remove_layer(&mut self, id: LayerId) {
            self.inner.remove_layer(id);
        }
        fn restack(&mut self, order: &[LayerId]) {
            self.inner.restack(order);
        }
        fn set_overlay(&mut self, kind: OverlayKind, shapes: &[Shape]) {
            self.inner.set_overlay(kind, shapes);
        }
        fn set_cursor(&mut self, cursor: CursorStyle) {
            self.inner.set_cursor(cursor);
        }
        fn dispose(&mut self) {
            self.torn_down.set(!self.inner.is_listening());
            self.inner.dispose();
        }
        fn is_disposed(&self) -> bool {
            self.inner.is_disposed()
        }
    }

    #[test]
    fn test_drop_releases_on_early_exit() {
        let torn_down = std::rc::Rc::new(std::cell::Cell::new(false));

        let mount_then_fail = |flag: std::rc::Rc<std::cell::Cell<bool>>| -> Result<(), SurfaceError> {
            let probe = ProbeSurface {
                inner: RecordingSurface::new(),
                torn_down: flag,
            };
            let handle = SurfaceHandle::acquire(probe, true)?;
            let id = handle.surface().map(Surface::id).unwrap_or_default();
            Err(SurfaceError::InUse(id))
        };

        assert!(mount_then_fail(torn_down.clone()).is_err());
        // Disposed with listeners already detached.
        assert!(torn_down.get());
    }

    #[test]
    fn test_disposed_surface_cannot_be_acquired() {
        let surface = SurfaceHandle::acquire(RecordingSurface::new(), false)
            .unwrap()
            .release()
            .unwrap();
        let id = surface.id();
        assert_eq!(
            SurfaceHandle::acquire(surface, true).unwrap_err(),
            SurfaceError::Disposed(id)
        );
    }

    #[test]
    fn test_listening_surface_is_in_use() {
        let mut surface = RecordingSurface::new();
        surface.attach_listeners();
        let id = surface.id();
        assert_eq!(
            SurfaceHandle::acquire(surface, true).unwrap_err(),
            SurfaceError::InUse(id)
        );
    }

    #[test]
    fn test_restack_follows_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut surface = RecordingSurface::new();
        for id in [a, b, c] {
            surface.upsert_layer(&visual(id));
        }
        surface.restack(&[c, a, b]);
        assert_eq!(surface.layer_order(), vec![c, a, b]);
        assert_eq!(surface.restacks(), 1);
        assert_eq!(surface.layer_updates(a), 1);
    }
}
