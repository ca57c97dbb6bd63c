//! Pointer hit-testing and hover highlighting.
//!
//! The [`InteractionSurface`] keeps a non-owning, append-only list of
//! pickable parts. It turns a picking ray into a part (and that part's
//! group root) and keeps at most one part highlighted.

use glam::Vec3;

use crate::color::Color;
use crate::picking::{Ray, raycast_entities};
use crate::scene::{EmissiveCache, SceneGraph};

/// Which registered parts take part in hit-testing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HitTestMode {
    /// Every registered part, visible or not. Hidden parts still intercept
    /// the pointer.
    #[default]
    AllRegistered,
    /// Only parts that are currently shown.
    VisibleOnly,
}

/// The nearest part under the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    /// The part whose collider was hit.
    pub object: hecs::Entity,
    /// Its group root (immediate parent, or the part itself).
    pub group: hecs::Entity,
    pub distance: f32,
    pub point: Vec3,
}

/// What a hover update did to the highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverChange {
    /// Same part as before (or still nothing); no colors were written.
    Unchanged,
    /// A part became highlighted where none was before.
    Entered(hecs::Entity),
    /// The highlight moved from one part to another.
    Moved {
        from: hecs::Entity,
        to: hecs::Entity,
    },
    /// The highlighted part was restored and nothing is highlighted now.
    Cleared(hecs::Entity),
}

pub struct InteractionSurface {
    pickables: Vec<hecs::Entity>,
    hovered: Option<hecs::Entity>,
    highlight: Color,
    mode: HitTestMode,
}

impl Default for InteractionSurface {
    fn default() -> Self {
        Self::new(Color::HIGHLIGHT)
    }
}

impl InteractionSurface {
    pub fn new(highlight: Color) -> Self {
        Self {
            pickables: Vec::new(),
            hovered: None,
            highlight,
            mode: HitTestMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: HitTestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_highlight(mut self, highlight: Color) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn mode(&self) -> HitTestMode {
        self.mode
    }

    pub fn highlight(&self) -> Color {
        self.highlight
    }

    /// Adds a part to the pickable set.
    pub fn register(&mut self, entity: hecs::Entity) {
        if !self.pickables.contains(&entity) {
            self.pickables.push(entity);
        }
    }

    pub fn pickables(&self) -> &[hecs::Entity] {
        &self.pickables
    }

    /// The currently highlighted part.
    pub fn hovered(&self) -> Option<hecs::Entity> {
        self.hovered
    }

    /// Returns the nearest registered part hit by `ray`.
    pub fn hit_test(&self, scene: &SceneGraph, ray: &Ray) -> Option<PickHit> {
        let mode = self.mode;
        raycast_entities(scene.world(), &self.pickables, ray, |entity| match mode {
            HitTestMode::AllRegistered => true,
            HitTestMode::VisibleOnly => scene.is_shown(entity),
        })
        .into_iter()
        .next()
        .map(|hit| PickHit {
            object: hit.entity,
            group: scene.group_root(hit.entity),
            distance: hit.distance,
            point: hit.point,
        })
    }

    /// Moves the highlight to whatever `ray` hits.
    ///
    /// Highlighting is per part ([`PickHit::object`]), not per group, so
    /// moving between two parts of one model is a change.
    ///
    /// The previous part is restored before the new one is highlighted, and
    /// hovering the same part twice writes nothing.
    pub fn on_hover(&mut self, scene: &mut SceneGraph, ray: &Ray) -> HoverChange {
        let hit = self.hit_test(scene, ray).map(|h| h.object);
        self.hover_to(scene, hit)
    }

    /// Restores the highlighted part, if any.
    pub fn clear_hover(&mut self, scene: &mut SceneGraph) -> HoverChange {
        self.hover_to(scene, None)
    }

    fn hover_to(&mut self, scene: &mut SceneGraph, hit: Option<hecs::Entity>) -> HoverChange {
        if hit == self.hovered {
            return HoverChange::Unchanged;
        }

        let previous = self.hovered.take();
        if let Some(prev) = previous {
            restore(scene, prev);
        }

        if let Some(next) = hit {
            self.apply_highlight(scene, next);
            self.hovered = Some(next);
        }

        match (previous, hit) {
            (None, Some(to)) => HoverChange::Entered(to),
            (Some(from), Some(to)) => HoverChange::Moved { from, to },
            (Some(from), None) => HoverChange::Cleared(from),
            (None, None) => HoverChange::Unchanged,
        }
    }

    fn apply_highlight(&self, scene: &mut SceneGraph, entity: hecs::Entity) {
        if let Some((material, cache)) = scene.material_mut(entity) {
            if *cache == EmissiveCache::Uncached {
                *cache = EmissiveCache::Cached(material.emissive);
            }
            material.emissive = self.highlight;
        }
    }
}

fn restore(scene: &mut SceneGraph, entity: hecs::Entity) {
    if let Some((material, cache)) = scene.material_mut(entity) {
        material.emissive = cache.original();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Transform;
    use crate::picking::Collider;
    use crate::scene::{Material, NO_EMISSIVE, PartInit};

    const GLOW: Color = Color::rgb(0.0, 0.1, 0.0);

    fn bench() -> (SceneGraph, InteractionSurface, hecs::Entity, hecs::Entity) {
        let mut scene = SceneGraph::new();
        let mut surface = InteractionSurface::default();
        let root = scene.spawn_model("Gloves", true);

        let mut left_material = Material::new(Color::WHITE);
        left_material.emissive = GLOW;
        let left = scene.spawn_part(
            root,
            PartInit {
                name: "Glove_Left".into(),
                transform: Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)),
                material: left_material,
                collider: Collider::default(),
                visible: true,
                geometry: None,
            },
        );
        let right = scene.spawn_part(
            root,
            PartInit {
                name: "Glove_Right".into(),
                transform: Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
                material: Material::new(Color::WHITE),
                collider: Collider::default(),
                visible: false,
                geometry: None,
            },
        );
        surface.register(left);
        surface.register(right);
        (scene, surface, left, right)
    }

    fn ray_at(x: f32) -> Ray {
        Ray::new(Vec3::new(x, 0.0, 5.0), Vec3::NEG_Z)
    }

    #[test]
    fn hit_test_returns_part_and_group() {
        let (scene, surface, left, _) = bench();
        let hit = surface.hit_test(&scene, &ray_at(-1.0)).unwrap();
        assert_eq!(hit.object, left);
        assert_eq!(hit.group, scene.find("Gloves").unwrap());
        assert!((hit.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn hidden_parts_intercept_by_default_only() {
        let (scene, surface, _, right) = bench();
        assert_eq!(surface.hit_test(&scene, &ray_at(1.0)).map(|h| h.object), Some(right));

        let surface = InteractionSurface {
            mode: HitTestMode::VisibleOnly,
            ..surface
        };
        assert!(surface.hit_test(&scene, &ray_at(1.0)).is_none());
    }

    #[test]
    fn hover_caches_highlights_and_restores() {
        let (mut scene, mut surface, left, right) = bench();

        assert_eq!(surface.on_hover(&mut scene, &ray_at(-1.0)), HoverChange::Entered(left));
        assert_eq!(scene.material(left).unwrap().emissive, Color::HIGHLIGHT);
        assert_eq!(scene.emissive_cache(left), Some(EmissiveCache::Cached(GLOW)));

        assert_eq!(
            surface.on_hover(&mut scene, &ray_at(1.0)),
            HoverChange::Moved { from: left, to: right }
        );
        assert_eq!(scene.material(left).unwrap().emissive, GLOW);
        assert_eq!(scene.material(right).unwrap().emissive, Color::HIGHLIGHT);

        assert_eq!(surface.on_hover(&mut scene, &ray_at(9.0)), HoverChange::Cleared(right));
        assert_eq!(scene.material(right).unwrap().emissive, NO_EMISSIVE);
        assert_eq!(surface.hovered(), None);
    }

    #[test]
    fn same_part_writes_nothing() {
        let (mut scene, mut surface, left, _) = bench();
        surface.on_hover(&mut scene, &ray_at(-1.0));

        // Tamper with the color: an unchanged hover must not rewrite it
        scene.material_mut(left).unwrap().0.emissive = Color::WHITE;
        assert_eq!(surface.on_hover(&mut scene, &ray_at(-0.9)), HoverChange::Unchanged);
        assert_eq!(scene.material(left).unwrap().emissive, Color::WHITE);
    }

    #[test]
    fn empty_space_restores_exactly_once() {
        let (mut scene, mut surface, left, _) = bench();
        surface.on_hover(&mut scene, &ray_at(-1.0));

        assert_eq!(surface.on_hover(&mut scene, &ray_at(5.0)), HoverChange::Cleared(left));
        assert_eq!(surface.on_hover(&mut scene, &ray_at(5.0)), HoverChange::Unchanged);
        assert_eq!(surface.clear_hover(&mut scene), HoverChange::Unchanged);
    }

    #[test]
    fn cache_is_recorded_only_once() {
        let (mut scene, mut surface, left, _) = bench();
        for _ in 0..3 {
            surface.on_hover(&mut scene, &ray_at(-1.0));
            surface.clear_hover(&mut scene);
        }
        assert_eq!(scene.emissive_cache(left), Some(EmissiveCache::Cached(GLOW)));
        assert_eq!(scene.material(left).unwrap().emissive, GLOW);
    }

    #[test]
    fn at_most_one_part_is_highlighted() {
        let (mut scene, mut surface, _, _) = bench();
        for x in [-1.0, 1.0, -1.0, 3.0, 1.0, 1.0, -1.2, 0.0] {
            surface.on_hover(&mut scene, &ray_at(x));
            assert!(scene.count_emissive(Color::HIGHLIGHT) <= 1);
        }
    }

    #[test]
    fn register_ignores_duplicates() {
        let (_, mut surface, left, _) = bench();
        surface.register(left);
        assert_eq!(surface.pickables().len(), 2);
    }
}
