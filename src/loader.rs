//! Background model loading.
//!
//! Each [`ModelSpec`] is loaded on its own thread; finished models come back
//! over a channel in whatever order they complete. Nothing here touches the
//! scene: the session drains results and spawns entities on its own thread.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use glam::Vec3;

use crate::error::GeometryError;
use crate::geometry::RawGeometry;
use crate::manifest::{ModelSpec, PartSpec};

/// A part whose geometry is ready for spawning.
#[derive(Clone, Debug)]
pub struct LoadedPart {
    pub spec: PartSpec,
    pub geometry: Arc<RawGeometry>,
}

/// A model whose parts all loaded.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub name: String,
    pub offset: Vec3,
    pub visible: bool,
    pub pickable: bool,
    pub parts: Vec<LoadedPart>,
}

/// Why a model could not be loaded.
#[derive(Debug, thiserror::Error)]
#[error("model '{model}': part '{part}': {source}")]
pub struct LoadFailure {
    pub model: String,
    pub part: String,
    #[source]
    pub source: GeometryError,
}

pub type LoadEvent = Result<LoadedModel, LoadFailure>;

/// Loads every part of `spec`. Fails as a whole if any part fails.
pub fn load_model(spec: ModelSpec) -> LoadEvent {
    let mut parts = Vec::with_capacity(spec.parts.len());

    for part in spec.parts {
        let mut geometry = part.source.load().map_err(|source| LoadFailure {
            model: spec.name.clone(),
            part: part.name.clone(),
            source,
        })?;
        if part.fit_unit {
            geometry.recenter();
            geometry.normalize();
        }
        log::debug!(
            "loaded part '{}' ({} vertices, {} triangles)",
            part.name,
            geometry.vertices.len(),
            geometry.indices.len() / 3
        );
        parts.push(LoadedPart {
            spec: part,
            geometry: Arc::new(geometry),
        });
    }

    Ok(LoadedModel {
        name: spec.name,
        offset: spec.offset,
        visible: spec.visible,
        pickable: spec.pickable,
        parts,
    })
}

/// Fire-and-forget loader threads feeding one result channel.
pub struct ModelLoader {
    sender: mpsc::Sender<LoadEvent>,
    receiver: mpsc::Receiver<LoadEvent>,
    in_flight: usize,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Starts loading `spec` on a new thread.
    pub fn spawn(&mut self, spec: ModelSpec) {
        let name = spec.name.clone();
        let sender = self.sender.clone();

        let spawned = thread::Builder::new()
            .name(format!("load-{}", name))
            .spawn(move || {
                // The receiver may be gone if the session ended first
                let _ = sender.send(load_model(spec));
            });

        match spawned {
            Ok(_) => {
                self.in_flight += 1;
                log::debug!("loading model '{}'", name);
            }
            Err(e) => {
                // Report through the channel so it is handled like any failure
                let _ = self.sender.send(Err(LoadFailure {
                    model: name,
                    part: String::new(),
                    source: GeometryError::Io(e),
                }));
                self.in_flight += 1;
            }
        }
    }

    /// Loads still running or not yet collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// A finished load, if one is waiting.
    pub fn try_next(&mut self) -> Option<LoadEvent> {
        let event = self.receiver.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(event)
    }

    /// Blocks until a load finishes or `timeout` passes.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<LoadEvent> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometrySource;

    fn model(name: &str, source: GeometrySource) -> ModelSpec {
        ModelSpec::new(name).part(PartSpec::new(format!("{}_Part", name), source))
    }

    #[test]
    fn loads_primitives() {
        let loaded = load_model(model("Cube", GeometrySource::Cube)).unwrap();
        assert_eq!(loaded.name, "Cube");
        assert_eq!(loaded.parts.len(), 1);
        assert_eq!(loaded.parts[0].geometry.indices.len(), 36);
    }

    #[test]
    fn fit_unit_normalizes_geometry() {
        let spec = ModelSpec::new("Big").part(
            PartSpec::new(
                "Big_Ball",
                GeometrySource::Sphere {
                    segments: 8,
                    rings: 4,
                },
            )
            .fit_unit(),
        );
        let loaded = load_model(spec).unwrap();
        let size = loaded.parts[0].geometry.size();
        assert!((size.max_element() - 1.0).abs() < 1e-4);
        assert!(loaded.parts[0].geometry.center().length() < 1e-4);
    }

    #[test]
    fn missing_file_fails_the_whole_model() {
        let spec = model("Cube", GeometrySource::Cube).part(PartSpec::new(
            "Broken",
            GeometrySource::Stl("/definitely/not/here.stl".into()),
        ));
        let failure = load_model(spec).unwrap_err();
        assert_eq!(failure.model, "Cube");
        assert_eq!(failure.part, "Broken");
        assert!(matches!(failure.source, GeometryError::Io(_)));
    }

    #[test]
    fn every_spawned_model_reports_back() {
        let mut loader = ModelLoader::new();
        for name in ["A", "B", "C"] {
            loader.spawn(model(name, GeometrySource::Cube));
        }
        assert_eq!(loader.in_flight(), 3);

        let mut names = Vec::new();
        while let Some(event) = loader.wait_next(Duration::from_secs(5)) {
            names.push(event.unwrap().name);
        }
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(loader.in_flight(), 0);
        assert!(loader.try_next().is_none());
    }
}
