//! Model manifests: which models make up the bench and how their parts look.
//!
//! A manifest is plain data. [`ModelLoader`](crate::loader::ModelLoader)
//! turns each [`ModelSpec`] into geometry on a background thread and the
//! session spawns the result.

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::color::Color;
use crate::geometry::GeometrySource;
use crate::mesh::Transform;
use crate::steps::names;

/// A model: a named group root with its parts.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    /// World offset applied to every part.
    pub offset: Vec3,
    /// Initial visibility of the group root.
    pub visible: bool,
    /// Whether the parts take part in hit-testing.
    pub pickable: bool,
    pub parts: Vec<PartSpec>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: Vec3::ZERO,
            visible: true,
            pickable: true,
            parts: Vec::new(),
        }
    }

    pub fn offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn scenery(mut self) -> Self {
        self.pickable = false;
        self
    }

    pub fn part(mut self, part: PartSpec) -> Self {
        self.parts.push(part);
        self
    }
}

/// One part of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct PartSpec {
    pub name: String,
    pub source: GeometrySource,
    /// Placement relative to the model offset.
    pub transform: Transform,
    pub color: Color,
    pub visible: bool,
    /// Recenter the geometry and scale it to unit size before `transform`.
    pub fit_unit: bool,
}

impl PartSpec {
    pub fn new(name: impl Into<String>, source: GeometrySource) -> Self {
        Self {
            name: name.into(),
            source,
            transform: Transform::default(),
            color: Color::WHITE,
            visible: true,
            fit_unit: false,
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn fit_unit(mut self) -> Self {
        self.fit_unit = true;
        self
    }
}

const GLOVE: Color = Color::rgb(0.55, 0.75, 0.95);
const STEEL_DARK: Color = Color::rgb(0.25, 0.25, 0.28);
const STEEL: Color = Color::rgb(0.6, 0.6, 0.65);
const WOOD: Color = Color::rgb(0.85, 0.7, 0.45);
const GLASS: Color = Color::rgb(0.8, 0.9, 0.9);
const SWAB: Color = Color::rgb(0.95, 0.9, 0.6);
const COLONY: Color = Color::rgb(0.9, 0.85, 0.3);
const BENCH: Color = Color::rgb(0.45, 0.35, 0.25);

/// The lab bench: gloves, flint striker, toothpick, petri dish and result.
///
/// With `asset_dir`, a part uses `<asset_dir>/<part_name>.stl` (snake case)
/// when that file exists. Everything else is built from primitives.
pub fn default_bench(asset_dir: Option<&Path>) -> Vec<ModelSpec> {
    let part = |name: &str, primitive: GeometrySource| match asset_dir
        .map(|dir| part_asset_path(dir, name))
        .filter(|path| path.is_file())
    {
        Some(path) => PartSpec::new(name, GeometrySource::Stl(path)).fit_unit(),
        None => PartSpec::new(name, primitive),
    };
    let cube = || GeometrySource::Cube;
    let sphere = || GeometrySource::Sphere {
        segments: 32,
        rings: 16,
    };
    let at = |x: f32, y: f32, z: f32| Transform::from_position(Vec3::new(x, y, z));

    vec![
        ModelSpec::new(names::GLOVES)
            .offset(Vec3::new(-2.4, 0.0, 0.8))
            .part(
                part(names::GLOVE_LEFT, cube())
                    .transform(at(-0.35, 0.08, 0.0).scale(Vec3::new(0.5, 0.15, 0.7)))
                    .color(GLOVE),
            )
            .part(
                part(names::GLOVE_RIGHT, cube())
                    .transform(at(0.35, 0.08, 0.0).scale(Vec3::new(0.5, 0.15, 0.7)))
                    .color(GLOVE),
            ),
        ModelSpec::new(names::FLINT_STRIKER)
            .offset(Vec3::new(-0.9, 0.0, 0.8))
            .hidden()
            .part(
                part(names::FLINT_STRIKER_BODY, cube())
                    .transform(at(0.0, 0.1, 0.0).scale(Vec3::new(0.25, 0.2, 0.6)))
                    .color(STEEL_DARK),
            )
            .part(
                part(names::FLINT_STRIKER_ROD, cube())
                    .transform(at(0.0, 0.1, 0.5).scale(Vec3::new(0.06, 0.06, 0.5)))
                    .color(STEEL),
            ),
        ModelSpec::new(names::TOOTHPICK)
            .offset(Vec3::new(0.6, 0.0, 0.8))
            .hidden()
            .part(
                part(names::TOOTHPICK_STICK, cube())
                    .transform(at(0.0, 0.03, 0.0).scale(Vec3::new(0.04, 0.04, 0.9)))
                    .color(WOOD),
            ),
        ModelSpec::new(names::PETRI_DISH)
            .offset(Vec3::new(2.0, 0.0, 0.0))
            .part(
                part(names::PETRI_DISH_BASE, sphere())
                    .transform(at(0.0, 0.05, 0.0).scale(Vec3::new(1.2, 0.15, 1.2)))
                    .color(GLASS),
            )
            .part(
                // Lies beside the dish, clear of the base's footprint
                part(names::PETRI_DISH_SWAB, cube())
                    .transform(at(0.0, 0.03, 0.95).scale(Vec3::new(0.7, 0.05, 0.12)))
                    .color(SWAB)
                    .hidden(),
            ),
        ModelSpec::new(names::RESULT)
            .offset(Vec3::new(2.0, 0.0, -1.2))
            .hidden()
            .part(
                part(names::RESULT_COLONIES, sphere())
                    .transform(at(0.0, 0.15, 0.0).scale(Vec3::new(0.8, 0.3, 0.8)))
                    .color(COLONY),
            ),
        ModelSpec::new(names::BENCH)
            .offset(Vec3::new(0.0, -0.05, 0.0))
            .scenery()
            .part(
                part(names::BENCH_TOP, cube())
                    .transform(Transform::new().scale(Vec3::new(7.0, 0.1, 3.0)))
                    .color(BENCH),
            ),
    ]
}

/// `FlintStriker_Rod` → `flint_striker_rod`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out
}

/// Asset path a part would be loaded from.
pub fn part_asset_path(asset_dir: &Path, part_name: &str) -> PathBuf {
    asset_dir.join(format!("{}.stl", snake_case(part_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_names() {
        assert_eq!(snake_case("FlintStriker_Rod"), "flint_striker_rod");
        assert_eq!(snake_case("Glove_Left"), "glove_left");
        assert_eq!(snake_case("PetriDish_Swab"), "petri_dish_swab");
    }

    #[test]
    fn bench_starts_with_gloves_and_dish_visible() {
        let bench = default_bench(None);
        let visible: Vec<&str> = bench
            .iter()
            .filter(|m| m.visible)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(visible, vec![names::GLOVES, names::PETRI_DISH, names::BENCH]);

        let dish = bench.iter().find(|m| m.name == names::PETRI_DISH).unwrap();
        let swab = dish.parts.iter().find(|p| p.name == names::PETRI_DISH_SWAB).unwrap();
        assert!(!swab.visible);
    }

    #[test]
    fn swab_does_not_overlap_the_dish_base() {
        let bench = default_bench(None);
        let dish = bench.iter().find(|m| m.name == names::PETRI_DISH).unwrap();
        let footprint = |name: &str| {
            let part = dish.parts.iter().find(|p| p.name == name).unwrap();
            let half = part.transform.scale * 0.5;
            (part.transform.position - half, part.transform.position + half)
        };
        let (base_min, base_max) = footprint(names::PETRI_DISH_BASE);
        let (swab_min, swab_max) = footprint(names::PETRI_DISH_SWAB);

        let overlaps = (0..3).all(|i| swab_min[i] < base_max[i] && base_min[i] < swab_max[i]);
        assert!(!overlaps);
    }

    #[test]
    fn every_revealed_name_exists_in_the_bench() {
        let bench = default_bench(None);
        for step in crate::steps::Step::ALL {
            for name in step.reveals() {
                let found = bench
                    .iter()
                    .any(|m| m.name == *name || m.parts.iter().any(|p| p.name == *name));
                assert!(found, "{} is not in the bench", name);
            }
        }
    }

    #[test]
    fn missing_asset_files_fall_back_to_primitives() {
        let dir = std::env::temp_dir().join("virtual-lab-empty-assets");
        let bench = default_bench(Some(&dir));
        assert!(
            bench
                .iter()
                .flat_map(|m| &m.parts)
                .all(|p| !matches!(p.source, GeometrySource::Stl(_)) && !p.fit_unit)
        );
    }

    #[test]
    fn present_asset_files_are_used() {
        let dir = std::env::temp_dir().join(format!("virtual-lab-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = part_asset_path(&dir, names::TOOTHPICK_STICK);
        std::fs::write(&path, b"solid t\nendsolid t\n").unwrap();

        let bench = default_bench(Some(&dir));
        let stick = bench
            .iter()
            .flat_map(|m| &m.parts)
            .find(|p| p.name == names::TOOTHPICK_STICK)
            .unwrap();
        assert_eq!(stick.source, GeometrySource::Stl(path));
        assert!(stick.fit_unit);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
