//! A mounted canvas: one surface, one viewport, one renderer strategy.

use std::time::Instant;

use uuid::Uuid;

use layerstage_core::session::WheelOutcome;
use layerstage_core::{
    CanvasConfig, CanvasState, ContainerSize, Intent, PointerEvent, SessionManager,
    SessionPreview, Viewport, WheelEvent,
};

use crate::scene::{renderer_for, RenderMode, RenderStats, SceneInput, SceneRenderer};
use crate::surface::{Surface, SurfaceError, SurfaceHandle};

/// Owns a surface for the lifetime of a mount.
///
/// Live stages carry a [`SessionManager`] and listen for pointer input;
/// preview stages only draw. Unmounting (or dropping) the stage detaches
/// listeners and disposes the surface.
#[derive(Debug)]
pub struct Stage<S: Surface> {
    id: Uuid,
    handle: SurfaceHandle<S>,
    viewport: Viewport,
    container: Option<ContainerSize>,
    renderer: Box<dyn SceneRenderer>,
    session: Option<SessionManager>,
}

impl<S: Surface> Stage<S> {
    pub fn mount(
        surface: S,
        mode: RenderMode,
        state: &CanvasState,
        config: &CanvasConfig,
        container: Option<ContainerSize>,
        device_pixel_ratio: f64,
    ) -> Result<Self, SurfaceError> {
        let renderer = renderer_for(mode, config);
        let listening = renderer.listening();
        let handle = SurfaceHandle::acquire(surface, listening)?;

        let mut viewport = Viewport::new(state.canvas_size);
        viewport.set_device_pixel_ratio(device_pixel_ratio);
        if let Some(container) = container {
            viewport.fit(container);
        }

        let mut stage = Self {
            id: Uuid::new_v4(),
            handle,
            viewport,
            container,
            renderer,
            session: listening.then(|| SessionManager::new(config)),
        };
        log::trace!("Mounted {:?} stage {}", mode, stage.id);
        stage.configure_surface();
        Ok(stage)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> RenderMode {
        self.renderer.mode()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn surface(&self) -> Option<&S> {
        self.handle.surface()
    }

    pub fn session(&self) -> Option<&SessionManager> {
        self.session.as_ref()
    }

    /// Cursor, pending rect corner and drag offset; empty for preview stages.
    pub fn session_preview(&self) -> SessionPreview {
        self.session
            .as_ref()
            .map(SessionManager::preview)
            .unwrap_or_default()
    }

    /// Refit to a new container box. Zero-size boxes are ignored.
    pub fn resize_container(&mut self, container: ContainerSize) -> bool {
        self.container = Some(container);
        let changed = self.viewport.fit(container);
        if changed {
            self.configure_surface();
        }
        changed
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> bool {
        let changed = self.viewport.set_device_pixel_ratio(ratio);
        if changed {
            self.configure_surface();
        }
        changed
    }

    /// Route a pointer event through the session. Preview stages ignore input.
    pub fn pointer(&mut self, event: &PointerEvent, state: &CanvasState) -> Option<Intent> {
        self.follow_canvas_size(state);
        let session = self.session.as_mut()?;
        session.handle_pointer(event, &self.viewport, state)
    }

    pub fn wheel(&mut self, event: &WheelEvent, state: &CanvasState) -> WheelOutcome {
        match self.session.as_mut() {
            Some(session) => session.handle_wheel(event, state),
            None => WheelOutcome {
                intent: None,
                prevent_default: false,
            },
        }
    }

    /// Render the current snapshot. The viewport transform is applied at
    /// once; preview content may be deferred until [`tick`](Self::tick).
    pub fn render(&mut self, state: &CanvasState, now: Instant) -> Option<RenderStats> {
        self.follow_canvas_size(state);
        if let Some(session) = self.session.as_mut() {
            session.observe(state);
        }
        let preview = self.session_preview();
        let input = SceneInput {
            state,
            viewport: &self.viewport,
            session: &preview,
        };
        let surface = self.handle.surface_mut()?;
        self.renderer.render(surface, &input, now)
    }

    /// Flush deferred rendering whose delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<RenderStats> {
        let surface = self.handle.surface_mut()?;
        self.renderer.poll(surface, now)
    }

    pub fn unmount(self) -> Option<S> {
        log::trace!("Unmounting stage {}", self.id);
        self.handle.release()
    }

    fn follow_canvas_size(&mut self, state: &CanvasState) {
        if !self.viewport.set_canvas_size(state.canvas_size) {
            return;
        }
        if let Some(container) = self.container {
            self.viewport.fit(container);
        }
        self.configure_surface();
    }

    fn configure_surface(&mut self) {
        let (width, height) = self.viewport.physical_size();
        let scale = self.viewport.scale * self.viewport.device_pixel_ratio;
        if let Some(surface) = self.handle.surface_mut() {
            surface.configure(width, height, scale);
        }
    }
}
