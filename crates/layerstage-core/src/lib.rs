//! # Layerstage Core
//!
//! Layer model, canvas/viewport coordinate transform, the pointer-driven
//! drawing session and the bbox/z-order synchronization pass for the
//! interactive layer canvas.
//!
//! Nothing in this crate mutates layers on its own initiative: pointer input
//! becomes [`Intent`]s, and [`CanvasState::apply`] is the reducer that turns
//! them into geometry changes followed by a synchronization pass.

pub mod config;
pub mod geometry;
pub mod intent;
pub mod layer;
pub mod session;
pub mod spatial;
pub mod store;
pub mod sync;
pub mod tool;
pub mod viewport;

pub use config::{CanvasConfig, ConfigError};
pub use geometry::{Point, Rect};
pub use intent::Intent;
pub use layer::{Layer, LayerId, LayerKind};
pub use session::{PointerEvent, SessionManager, SessionPreview, WheelEvent};
pub use store::{CanvasState, StoreError};
pub use sync::{SyncReport, Synchronizer};
pub use tool::Tool;
pub use viewport::{CanvasSize, ContainerSize, DevicePoint, Viewport};
