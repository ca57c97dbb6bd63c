//! # Virtual Lab
//!
//! **A guided lab bench you click through, one step at a time.**
//!
//! The learner puts on gloves, picks up a flint striker, takes a toothpick,
//! swabs a petri dish and sees the result. Each click completes a step; a
//! progress tracker records it and acknowledges the step reached, which
//! reveals the next tool on the bench.
//!
//! ## Quick Start
//!
//! ```no_run
//! use virtual_lab::*;
//!
//! fn main() -> Result<(), LabError> {
//!     run(AppConfig::new()
//!         .title("Lab")
//!         .manifest(default_bench(None))
//!         .journal("progress.log"))
//! }
//! ```
//!
//! ## Headless
//!
//! Everything except the window and GPU lives in [`LabSession`], which can
//! be driven directly:
//!
//! ```
//! use virtual_lab::*;
//!
//! let mut session = LabSession::new(Camera::default(), Viewport::new(800, 600), ImmediateTracker::new());
//! session.begin_loading(default_bench(None));
//! session.wait_for_loads(std::time::Duration::from_secs(5));
//!
//! session.step_complete("step2");
//! let flint = session.scene().find(names::FLINT_STRIKER).unwrap();
//! assert!(session.scene().is_visible(flint));
//! ```
//!
//! ## Layout
//!
//! - **Steps**: [`StepController`] maps clicked names to [`Step`]s through a
//!   validated [`StepTable`] and applies visibility changes.
//! - **Interaction**: [`InteractionSurface`] hit-tests registered parts and
//!   keeps at most one of them highlighted.
//! - **Tracking**: [`ProgressTracker`] receives completed steps and answers
//!   through an [`Acknowledger`].
//! - **Loading**: [`ModelLoader`] builds geometry on background threads.

mod app;
mod camera;
mod color;
mod error;
mod geometry;
mod gpu;
mod input;
mod interaction;
mod loader;
mod manifest;
mod mesh;
mod picking;
mod render;
pub mod scene;
mod session;
mod steps;
mod tracker;

pub use app::{AppConfig, run};
pub use camera::Camera;
pub use color::Color;
pub use error::{GeometryError, LabError, UnknownStep};
pub use geometry::{GeometrySource, RawGeometry};
pub use gpu::GpuContext;
pub use input::{Input, PointerEvent, Viewport};
pub use interaction::{HitTestMode, HoverChange, InteractionSurface, PickHit};
pub use loader::{LoadEvent, LoadFailure, LoadedModel, LoadedPart, ModelLoader, load_model};
pub use manifest::{ModelSpec, PartSpec, default_bench, part_asset_path};
pub use mesh::{GpuMesh, Transform, Vertex3d};
pub use picking::{Collider, Ray, RayHit, raycast_entities};
pub use render::LabRenderer;
pub use scene::SceneGraph;
pub use session::{LabSession, LoadStatus};
pub use steps::{
    ClickTarget, Identity, MatchOn, NameRule, Step, StepController, StepTable, Transition, names,
};
pub use tracker::{
    Acknowledgements, Acknowledger, ImmediateTracker, JournalTracker, ProgressTracker,
    acknowledgement_channel,
};

// Re-export math types
pub use glam::{Mat4, Quat, Vec2, Vec3};

// Re-export ECS types
pub use hecs::Entity;
