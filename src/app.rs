use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::Camera;
use crate::color::Color;
use crate::error::LabError;
use crate::gpu::GpuContext;
use crate::input::{Input, Viewport};
use crate::interaction::HitTestMode;
use crate::manifest::{ModelSpec, default_bench};
use crate::render::LabRenderer;
use crate::session::LabSession;
use crate::tracker::{ImmediateTracker, JournalTracker};

/// Configuration for the lab window and session.
///
/// Built with chained setters on top of [`AppConfig::default`]:
///
/// ```
/// use virtual_lab::{AppConfig, HitTestMode};
///
/// let config = AppConfig::new()
///     .title("Microbiology 101")
///     .size(1024, 768)
///     .hit_test_mode(HitTestMode::VisibleOnly);
/// assert_eq!(config.width, 1024);
/// ```
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Background behind the bench.
    pub clear_color: Color,
    pub camera: Camera,
    /// Emissive color of the hovered part.
    pub highlight: Color,
    /// Whether hidden parts still catch clicks.
    pub hit_test_mode: HitTestMode,
    /// Models loaded in the background once the window is up.
    pub manifest: Vec<ModelSpec>,
    /// Record progress to this file instead of acknowledging in memory.
    pub journal: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Virtual Lab".to_string(),
            width: 1280,
            height: 720,
            clear_color: Color::rgb(0.08, 0.09, 0.11),
            camera: Camera::default(),
            highlight: Color::HIGHLIGHT,
            hit_test_mode: HitTestMode::default(),
            manifest: default_bench(None),
            journal: None,
        }
    }
}

impl AppConfig {
    /// Create a configuration with the default bench and settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the background color.
    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the fixed camera the bench is viewed and picked through.
    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Set the emissive color applied to the hovered part.
    pub fn highlight(mut self, color: Color) -> Self {
        self.highlight = color;
        self
    }

    /// Choose whether hidden parts are hit-tested.
    ///
    /// The default, [`HitTestMode::AllRegistered`], lets a hidden part catch
    /// clicks, so a learner who knows where the toothpick lies can click it
    /// early. [`HitTestMode::VisibleOnly`] skips hidden parts.
    pub fn hit_test_mode(mut self, mode: HitTestMode) -> Self {
        self.hit_test_mode = mode;
        self
    }

    /// Replace the models loaded at startup.
    pub fn manifest(mut self, models: Vec<ModelSpec>) -> Self {
        self.manifest = models;
        self
    }

    /// Record progress to a file instead of in memory.
    ///
    /// Each completed step is appended as one line and only acknowledged
    /// once written. The file is opened when the window starts; failing to
    /// open it stops [`run`] with [`LabError::Journal`].
    pub fn journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal = Some(path.into());
        self
    }

    /// Builds a session for this configuration, without starting any loads.
    pub fn build_session(&self, viewport: Viewport) -> Result<LabSession, LabError> {
        let session = match &self.journal {
            Some(path) => LabSession::new(self.camera, viewport, JournalTracker::open(path)?),
            None => LabSession::new(self.camera, viewport, ImmediateTracker::new()),
        };
        Ok(session
            .with_highlight(self.highlight)
            .with_hit_test_mode(self.hit_test_mode))
    }
}

/// Opens the lab window and runs until it is closed.
///
/// # Example
/// ```no_run
/// virtual_lab::run(virtual_lab::AppConfig::new().title("Bench").size(1024, 768))?;
/// # Ok::<(), virtual_lab::LabError>(())
/// ```
pub fn run(config: AppConfig) -> Result<(), LabError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LabApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        LabApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

/// Application state machine: waiting for `resumed`, running, or failed to start.
enum LabApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: LabRenderer,
        session: LabSession,
        input: Input,
    },
    Failed(LabError),
}

impl LabApp {
    /// Create the window, GPU context and session, and start loading models.
    fn start(event_loop: &ActiveEventLoop, config: &mut AppConfig) -> Result<Self, LabError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let renderer = LabRenderer::new(&gpu, config.clear_color);

        let mut session = config.build_session(Viewport::new(gpu.width(), gpu.height()))?;
        session.begin_loading(std::mem::take(&mut config.manifest));

        window.request_redraw();
        Ok(LabApp::Running {
            window,
            gpu,
            renderer,
            session,
            input: Input::new(),
        })
    }
}

impl ApplicationHandler for LabApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let LabApp::Pending { config } = self {
            *self = match LabApp::start(event_loop, config) {
                Ok(running) => running,
                Err(e) => {
                    log::error!("failed to start: {}", e);
                    event_loop.exit();
                    LabApp::Failed(e)
                }
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let LabApp::Running {
            window,
            gpu,
            renderer,
            session,
            input,
        } = self
        else {
            return;
        };

        if let Some(pointer) = input.handle_event(&event) {
            session.handle_pointer(pointer);
        }
        if input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                session.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                session.update();
                renderer.sync(gpu, session.scene());

                if let Err(e) = renderer.render(gpu, session.scene(), session.camera()) {
                    log::error!("render failed: {}", e);
                    event_loop.exit();
                    return;
                }

                input.end_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads_the_bench() {
        let config = AppConfig::new().size(640, 480).title("Test");
        assert_eq!(config.manifest, default_bench(None));
        assert_eq!((config.width, config.height), (640, 480));
        assert!(config.journal.is_none());
    }

    #[test]
    fn built_session_uses_configured_options() {
        let config = AppConfig::new()
            .highlight(Color::rgb(0.0, 0.5, 0.0))
            .hit_test_mode(HitTestMode::VisibleOnly);
        let session = config.build_session(Viewport::new(640, 480)).unwrap();

        assert_eq!(session.surface().highlight(), Color::rgb(0.0, 0.5, 0.0));
        assert_eq!(session.surface().mode(), HitTestMode::VisibleOnly);
        assert_eq!(session.viewport(), Viewport::new(640, 480));
    }

    #[test]
    fn unwritable_journal_fails_session_setup() {
        let config = AppConfig::new().journal(
            std::env::temp_dir()
                .join("virtual-lab-missing-dir")
                .join("progress.log"),
        );
        assert!(matches!(
            config.build_session(Viewport::new(640, 480)),
            Err(LabError::Journal { .. })
        ));
    }
}
