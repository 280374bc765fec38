//! # Layerstage Renderer
//!
//! Retained scene rendering for the layer canvas.
//! A [`Stage`] owns one [`Surface`] for the lifetime of a mount and draws
//! [`CanvasState`](layerstage_core::CanvasState) snapshots onto it through a
//! [`SceneRenderer`] strategy: live (interactive, with tool feedback) or
//! preview (layers only, debounced).
//!
//! The scene is expressed as JSON-serializable [`RenderFrame`] data that a
//! frontend canvas consumes.

pub mod debounce;
pub mod render_data;
pub mod scene;
pub mod stage;
pub mod surface;

pub use render_data::{CursorStyle, LayerVisual, OverlayKind, RenderFrame, Rgba, Shape};
pub use scene::{RenderMode, RenderStats, SceneRenderer};
pub use stage::Stage;
pub use surface::{RecordingSurface, Surface, SurfaceError, SurfaceHandle};
