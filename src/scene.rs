//! Scene graph for the lab bench, stored in a `hecs` world.
//!
//! Each loaded model becomes a *group root* entity (a [`Name`], a
//! [`Visible`] flag and the [`ModelRoot`] marker) that owns one or more
//! *part* entities. Parts carry everything needed for picking and drawing:
//!
//! | Component         | Purpose                                        |
//! |-------------------|------------------------------------------------|
//! | [`Name`]          | Identity used by the step table                |
//! | [`Parent`]        | Link to the group root                         |
//! | [`Visible`]       | Toggled by step transitions                    |
//! | [`Material`]      | Base color and current emissive color          |
//! | [`EmissiveCache`] | Original emissive color, recorded on first hover |
//! | [`Transform`]     | World placement                                |
//! | [`Collider`]      | Picking shape                                  |
//! | [`PartGeometry`]  | CPU geometry, uploaded lazily by the renderer  |
//!
//! Entities are never despawned.

use std::collections::HashMap;
use std::sync::Arc;

use crate::color::Color;
use crate::geometry::RawGeometry;
use crate::mesh::Transform;
use crate::picking::Collider;

/// Emissive color of a part that is not highlighted.
pub const NO_EMISSIVE: Color = Color::BLACK;

/// Object name, matched by the step table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Name(pub String);

/// Immediate parent (group root) of a part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent(pub hecs::Entity);

/// Visibility flag. Parts are drawn only when they and their root are visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visible(pub bool);

/// Marker for group roots.
#[derive(Clone, Copy, Debug)]
pub struct ModelRoot;

/// Surface colors of a part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Diffuse color.
    pub base: Color,
    /// Color added on top of lighting; the hover highlight writes here.
    pub emissive: Color,
}

impl Material {
    pub fn new(base: Color) -> Self {
        Self {
            base,
            emissive: NO_EMISSIVE,
        }
    }
}

/// The emissive color a part had before it was first highlighted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum EmissiveCache {
    /// The part has never been hovered.
    #[default]
    Uncached,
    /// Recorded on first hover; restored when the hover ends.
    Cached(Color),
}

impl EmissiveCache {
    /// The color to restore: the cached one, or [`NO_EMISSIVE`].
    pub fn original(&self) -> Color {
        match self {
            EmissiveCache::Cached(color) => *color,
            EmissiveCache::Uncached => NO_EMISSIVE,
        }
    }
}

/// Shared CPU geometry of a part.
#[derive(Clone, Debug)]
pub struct PartGeometry(pub Arc<RawGeometry>);

/// Everything needed to spawn a part under a group root.
#[derive(Clone, Debug)]
pub struct PartInit {
    pub name: String,
    pub transform: Transform,
    pub material: Material,
    pub collider: Collider,
    pub visible: bool,
    pub geometry: Option<Arc<RawGeometry>>,
}

/// The bench's entities plus a name index.
pub struct SceneGraph {
    world: hecs::World,
    by_name: HashMap<String, Vec<hecs::Entity>>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            by_name: HashMap::new(),
        }
    }

    /// Read access to the underlying world, for rendering and queries.
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    /// Spawns a group root.
    pub fn spawn_model(&mut self, name: impl Into<String>, visible: bool) -> hecs::Entity {
        let name = name.into();
        let entity = self
            .world
            .spawn((Name(name.clone()), Visible(visible), ModelRoot));
        self.by_name.entry(name).or_default().push(entity);
        entity
    }

    /// Spawns a part under `root`.
    pub fn spawn_part(&mut self, root: hecs::Entity, part: PartInit) -> hecs::Entity {
        let entity = self.world.spawn((
            Name(part.name.clone()),
            Parent(root),
            Visible(part.visible),
            part.material,
            EmissiveCache::Uncached,
            part.transform,
            part.collider,
        ));
        if let Some(geometry) = part.geometry {
            // Freshly spawned entity; insertion cannot fail
            let _ = self.world.insert_one(entity, PartGeometry(geometry));
        }
        self.by_name.entry(part.name).or_default().push(entity);
        entity
    }

    /// First entity registered under `name`.
    pub fn find(&self, name: &str) -> Option<hecs::Entity> {
        self.by_name.get(name).and_then(|v| v.first().copied())
    }

    pub fn name(&self, entity: hecs::Entity) -> Option<String> {
        self.world
            .get::<&Name>(entity)
            .ok()
            .map(|n| n.0.clone())
    }

    pub fn parent(&self, entity: hecs::Entity) -> Option<hecs::Entity> {
        self.world.get::<&Parent>(entity).ok().map(|p| p.0)
    }

    pub fn parent_name(&self, entity: hecs::Entity) -> Option<String> {
        self.parent(entity).and_then(|p| self.name(p))
    }

    /// The logical group an entity belongs to: its parent, or itself.
    pub fn group_root(&self, entity: hecs::Entity) -> hecs::Entity {
        self.parent(entity).unwrap_or(entity)
    }

    pub fn is_visible(&self, entity: hecs::Entity) -> bool {
        self.world
            .get::<&Visible>(entity)
            .map(|v| v.0)
            .unwrap_or(false)
    }

    /// True if the entity and its group root are both visible.
    pub fn is_shown(&self, entity: hecs::Entity) -> bool {
        self.is_visible(entity)
            && self
                .parent(entity)
                .is_none_or(|parent| self.is_visible(parent))
    }

    /// Sets visibility of every entity named `name` and of their children.
    ///
    /// Returns how many entities actually changed.
    pub fn set_visible_by_name(&mut self, name: &str, visible: bool) -> usize {
        let Some(targets) = self.by_name.get(name).cloned() else {
            return 0;
        };

        let children: Vec<hecs::Entity> = self
            .world
            .query::<&Parent>()
            .iter()
            .filter(|(_, parent)| targets.contains(&parent.0))
            .map(|(entity, _)| entity)
            .collect();

        let mut changed = 0;
        for entity in targets.into_iter().chain(children) {
            if let Ok(mut flag) = self.world.get::<&mut Visible>(entity) {
                if flag.0 != visible {
                    flag.0 = visible;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn material(&self, entity: hecs::Entity) -> Option<Material> {
        self.world.get::<&Material>(entity).ok().map(|m| *m)
    }

    pub fn emissive_cache(&self, entity: hecs::Entity) -> Option<EmissiveCache> {
        self.world.get::<&EmissiveCache>(entity).ok().map(|c| *c)
    }

    /// Mutable access to a part's material and emissive cache together.
    pub fn material_mut(
        &mut self,
        entity: hecs::Entity,
    ) -> Option<(&mut Material, &mut EmissiveCache)> {
        self.world
            .query_one_mut::<(&mut Material, &mut EmissiveCache)>(entity)
            .ok()
    }

    /// Number of entities currently carrying `color` as their emissive color.
    pub fn count_emissive(&self, color: Color) -> usize {
        self.world
            .query::<&Material>()
            .iter()
            .filter(|(_, m)| m.emissive == color)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn part(name: &str, visible: bool) -> PartInit {
        PartInit {
            name: name.to_string(),
            transform: Transform::from_position(Vec3::ZERO),
            material: Material::new(Color::WHITE),
            collider: Collider::default(),
            visible,
            geometry: None,
        }
    }

    #[test]
    fn group_root_is_parent_or_self() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn_model("Toothpick", true);
        let stick = scene.spawn_part(root, part("Toothpick_Stick", true));

        assert_eq!(scene.group_root(stick), root);
        assert_eq!(scene.group_root(root), root);
        assert_eq!(scene.parent_name(stick).as_deref(), Some("Toothpick"));
        assert_eq!(scene.name(stick).as_deref(), Some("Toothpick_Stick"));
    }

    #[test]
    fn hiding_a_root_hides_its_parts() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn_model("Gloves", true);
        let left = scene.spawn_part(root, part("Glove_Left", true));
        let right = scene.spawn_part(root, part("Glove_Right", true));

        assert_eq!(scene.set_visible_by_name("Gloves", false), 3);
        assert!(!scene.is_visible(left));
        assert!(!scene.is_visible(right));

        // Already hidden: nothing changes
        assert_eq!(scene.set_visible_by_name("Gloves", false), 0);
        assert_eq!(scene.set_visible_by_name("Missing", false), 0);
    }

    #[test]
    fn shown_requires_visible_root() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn_model("Result", false);
        let colonies = scene.spawn_part(root, part("Result_Colonies", true));

        assert!(scene.is_visible(colonies));
        assert!(!scene.is_shown(colonies));
    }

    #[test]
    fn emissive_cache_defaults_to_no_emissive() {
        assert_eq!(EmissiveCache::Uncached.original(), NO_EMISSIVE);
        let cached = EmissiveCache::Cached(Color::rgb(0.1, 0.2, 0.3));
        assert_eq!(cached.original(), Color::rgb(0.1, 0.2, 0.3));
    }
}
