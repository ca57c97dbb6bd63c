//! One running lab: scene, pointer interaction, steps and tracker.
//!
//! A [`LabSession`] owns all mutable state; two sessions never share
//! anything. Every entry point runs on the caller's thread. Background model
//! loads and tracker acknowledgments are queued and applied by
//! [`LabSession::update`], usually once per frame.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use glam::Vec2;

use crate::camera::Camera;
use crate::color::Color;
use crate::input::{PointerEvent, Viewport};
use crate::interaction::{HitTestMode, HoverChange, InteractionSurface};
use crate::loader::{LoadEvent, LoadedModel, ModelLoader};
use crate::manifest::ModelSpec;
use crate::picking::Collider;
use crate::scene::{Material, PartInit, SceneGraph};
use crate::steps::{ClickTarget, Step, StepController, StepTable};
use crate::tracker::{Acknowledgements, Acknowledger, ProgressTracker, acknowledgement_channel};

/// Where a model is in its load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    /// Logged and left absent; nothing retries it.
    Failed(String),
}

pub struct LabSession {
    scene: SceneGraph,
    camera: Camera,
    viewport: Viewport,
    surface: InteractionSurface,
    controller: StepController,
    tracker: Box<dyn ProgressTracker>,
    ack: Acknowledger,
    acks: Acknowledgements,
    loader: ModelLoader,
    loads: HashMap<String, LoadStatus>,
}

impl LabSession {
    pub fn new(camera: Camera, viewport: Viewport, tracker: impl ProgressTracker + 'static) -> Self {
        let (ack, acks) = acknowledgement_channel();
        Self {
            scene: SceneGraph::new(),
            camera,
            viewport,
            surface: InteractionSurface::default(),
            controller: StepController::default(),
            tracker: Box::new(tracker),
            ack,
            acks,
            loader: ModelLoader::new(),
            loads: HashMap::new(),
        }
    }

    pub fn with_highlight(mut self, highlight: Color) -> Self {
        self.surface = self.surface.with_highlight(highlight);
        self
    }

    pub fn with_hit_test_mode(mut self, mode: HitTestMode) -> Self {
        self.surface = self.surface.with_mode(mode);
        self
    }

    pub fn with_step_table(mut self, table: StepTable) -> Self {
        self.controller = StepController::new(table);
        self
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Starts a background load for each model.
    pub fn begin_loading(&mut self, specs: impl IntoIterator<Item = ModelSpec>) {
        for spec in specs {
            self.loads.insert(spec.name.clone(), LoadStatus::Pending);
            self.loader.spawn(spec);
        }
    }

    /// Applies every finished load without blocking. Returns how many
    /// loads were handled.
    pub fn poll_loads(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.loader.try_next() {
            self.apply_load(event);
            handled += 1;
        }
        handled
    }

    /// Blocks until every pending load is applied or `timeout` passes.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut handled = 0;
        while self.loader.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(event) = self.loader.wait_next(remaining) else {
                break;
            };
            self.apply_load(event);
            handled += 1;
        }
        handled
    }

    fn apply_load(&mut self, event: LoadEvent) {
        match event {
            Ok(model) => {
                self.insert_model(model);
            }
            Err(failure) => {
                log::error!("failed to load {}", failure);
                self.loads
                    .insert(failure.model.clone(), LoadStatus::Failed(failure.to_string()));
            }
        }
    }

    /// Spawns a loaded model and registers its parts for picking.
    pub fn insert_model(&mut self, model: LoadedModel) -> hecs::Entity {
        let root = self.scene.spawn_model(model.name.clone(), model.visible);

        for part in model.parts {
            let (min, max) = part.geometry.bounds();
            let entity = self.scene.spawn_part(
                root,
                PartInit {
                    name: part.spec.name,
                    transform: part.spec.transform.translated(model.offset),
                    material: Material::new(part.spec.color),
                    collider: Collider::from_bounds(min, max),
                    visible: part.spec.visible,
                    geometry: Some(part.geometry),
                },
            );
            if model.pickable {
                self.surface.register(entity);
            }
        }

        log::info!("model '{}' ready", model.name);
        self.loads.insert(model.name, LoadStatus::Loaded);
        root
    }

    pub fn load_status(&self, model: &str) -> Option<&LoadStatus> {
        self.loads.get(model)
    }

    /// True once no load is pending.
    pub fn loads_settled(&self) -> bool {
        !self.loads.values().any(|s| *s == LoadStatus::Pending)
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    /// Pointer moved to a window position, in pixels.
    pub fn pointer_moved(&mut self, pixel: Vec2) -> HoverChange {
        self.hover_ndc(self.viewport.to_ndc(pixel))
    }

    pub fn pointer_left(&mut self) -> HoverChange {
        self.surface.clear_hover(&mut self.scene)
    }

    /// Primary button pressed at a window position, in pixels.
    pub fn pointer_pressed(&mut self, pixel: Vec2) -> Option<Step> {
        self.click_ndc(self.viewport.to_ndc(pixel))
    }

    pub fn hover_ndc(&mut self, ndc: Vec2) -> HoverChange {
        let ray = self.camera.pick_ray(ndc, self.viewport.aspect());
        let change = self.surface.on_hover(&mut self.scene, &ray);
        if change != HoverChange::Unchanged {
            log::debug!("hover: {:?}", change);
        }
        change
    }

    /// Selects whatever is under `ndc` and advances the steps from it.
    pub fn click_ndc(&mut self, ndc: Vec2) -> Option<Step> {
        let ray = self.camera.pick_ray(ndc, self.viewport.aspect());
        let Some(hit) = self.surface.hit_test(&self.scene, &ray) else {
            log::debug!("click at {} hit nothing", ndc);
            return None;
        };

        let target = ClickTarget {
            object: self.scene.name(hit.object).unwrap_or_default(),
            parent: self.scene.parent_name(hit.object),
        };
        self.controller
            .advance(&mut self.scene, &target, self.tracker.as_mut(), &self.ack)
    }

    /// Routes a pointer event from [`Input`](crate::input::Input).
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<Step> {
        match event {
            PointerEvent::Moved(pixel) => {
                self.pointer_moved(pixel);
                None
            }
            PointerEvent::Pressed(pixel) => self.pointer_pressed(pixel),
            PointerEvent::Left => {
                self.pointer_left();
                None
            }
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = Viewport::new(width, height);
    }

    /// Applies every queued acknowledgment, in arrival order.
    pub fn pump_acknowledgements(&mut self) -> Vec<Step> {
        self.acks
            .drain()
            .into_iter()
            .filter_map(|tag| self.controller.on_step_complete(&mut self.scene, &tag))
            .collect()
    }

    /// Applies an acknowledgment immediately.
    pub fn step_complete(&mut self, tag: &str) -> Option<Step> {
        self.controller.on_step_complete(&mut self.scene, tag)
    }

    /// Per-frame work: applies finished loads, then acknowledgments.
    pub fn update(&mut self) -> Vec<Step> {
        self.poll_loads();
        self.pump_acknowledgements()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> &InteractionSurface {
        &self.surface
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    /// A handle for acknowledging steps from outside the tracker.
    pub fn acknowledger(&self) -> Acknowledger {
        self.ack.clone()
    }
}
