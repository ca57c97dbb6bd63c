//! Error types for the lab.
//!
//! Nothing that happens once a session is running is fatal: unmapped clicks,
//! unknown acknowledgments and failed model loads are logged and skipped.
//! [`LabError`] covers the setup path (window, GPU, tracker journal) and
//! table construction, where there is no sensible way to continue.

use std::path::PathBuf;

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File format could not be determined from extension.
    #[error("Unknown geometry format: '{0}'")]
    UnknownFormat(String),
    /// The geometry data was invalid or corrupt.
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The file parsed but contained no triangles.
    #[error("'{0}' contains no triangles")]
    Empty(PathBuf),
}

/// An acknowledgment named a step that does not exist.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown step tag '{0}'")]
pub struct UnknownStep(pub String);

/// Errors returned while setting up or running the lab.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    /// The winit event loop could not be created or failed while running.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// The window could not be created.
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    /// wgpu could not create a surface for the window.
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    /// No GPU adapter is compatible with the window surface.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// The logical device could not be created.
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    /// The surface reports no supported texture formats.
    #[error("surface has no supported formats")]
    NoSurfaceFormat,
    /// The progress journal could not be opened or written.
    #[error("progress journal '{path}': {source}")]
    Journal {
        /// Journal file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A step table rule binds a name that is already bound.
    #[error("object name '{0}' is mapped to more than one step")]
    DuplicateRule(String),
    /// A step table rule has an empty object name.
    #[error("step table rule with an empty object name")]
    EmptyRuleName,
}
