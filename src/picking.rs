//! Ray casting against part colliders.
//!
//! - [`Ray`]: A 3D ray with origin and direction
//! - [`Collider`]: Box or sphere attached to a part entity
//! - [`RayHit`]: A ray-collider intersection
//!
//! Colliders are tested in world space using the part's [`Transform`]
//! position and scale. Rotation is ignored, so boxes stay axis-aligned,
//! which is close enough for bench props.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::mesh::Transform;

/// A ray in 3D space, used for picking.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3,
    /// The normalized direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray through a point in normalized device coordinates.
    ///
    /// `ndc` is in `[-1, 1]` with Y up. The ray starts on the near plane.
    pub fn from_ndc(ndc: Vec2, view_projection: Mat4) -> Self {
        let inv_view_proj = view_projection.inverse();

        let near_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        // Perspective divide
        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the nearest intersection with an axis-aligned box, if any.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab
                if origin < min[i] || origin > max[i] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (min[i] - origin) * inv_dir;
                let mut t2 = (max[i] - origin) * inv_dir;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    /// Distance to the nearest intersection with a sphere, if any.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

/// A collision shape for picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// Axis-aligned box in model space.
    Box {
        /// Box center relative to the part origin.
        center: Vec3,
        /// Half the size of the box on each axis.
        half_extents: Vec3,
    },
    /// Sphere centered on the part origin.
    Sphere {
        radius: f32,
    },
}

impl Collider {
    /// Box collider of the given full size, centered on the part origin.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            center: Vec3::ZERO,
            half_extents: size * 0.5,
        }
    }

    /// Box collider enclosing model-space bounds.
    pub fn from_bounds(min: Vec3, max: Vec3) -> Self {
        Self::Box {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Distance along `ray` to this collider placed at `transform`, if hit.
    pub fn intersect(&self, ray: &Ray, transform: &Transform) -> Option<f32> {
        match self {
            Collider::Box {
                center,
                half_extents,
            } => {
                let world_center = transform.position + *center * transform.scale;
                let scaled_half = *half_extents * transform.scale.abs();
                ray.intersect_aabb(world_center - scaled_half, world_center + scaled_half)
            }
            Collider::Sphere { radius } => {
                let avg_scale = (transform.scale.x + transform.scale.y + transform.scale.z) / 3.0;
                ray.intersect_sphere(transform.position, radius * avg_scale)
            }
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::box_collider(Vec3::ONE)
    }
}

/// A ray-collider intersection.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// The entity that was hit.
    pub entity: hecs::Entity,
    /// Distance from ray origin to the hit point.
    pub distance: f32,
    /// World-space position of the hit point.
    pub point: Vec3,
}

/// Casts `ray` against the given entities and returns all hits, nearest first.
///
/// Entities without both a [`Transform`] and a [`Collider`] are skipped,
/// as are entities for which `filter` returns false.
pub fn raycast_entities<'a>(
    world: &hecs::World,
    entities: impl IntoIterator<Item = &'a hecs::Entity>,
    ray: &Ray,
    mut filter: impl FnMut(hecs::Entity) -> bool,
) -> Vec<RayHit> {
    let mut hits = Vec::new();

    for &entity in entities {
        if !filter(entity) {
            continue;
        }
        let Ok(mut query) = world.query_one::<(&Transform, &Collider)>(entity) else {
            continue;
        };
        let Some((transform, collider)) = query.get() else {
            continue;
        };
        if let Some(distance) = collider.intersect(ray, transform) {
            hits.push(RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            });
        }
    }

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_hit_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = ray.intersect_aabb(Vec3::splat(-0.5), Vec3::splat(0.5)).unwrap();
        assert!((t - 4.5).abs() < 1e-5);
    }

    #[test]
    fn aabb_miss_when_parallel_outside() {
        let ray = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(ray.intersect_aabb(Vec3::splat(-0.5), Vec3::splat(0.5)).is_none());
    }

    #[test]
    fn sphere_behind_ray_is_missed() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(ray.intersect_sphere(Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn offset_box_collider_follows_center() {
        let collider = Collider::from_bounds(Vec3::new(1.0, -0.5, -0.5), Vec3::new(2.0, 0.5, 0.5));
        let transform = Transform::new();
        let through_center = Ray::new(Vec3::new(1.5, 0.0, 5.0), Vec3::NEG_Z);
        let through_origin = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(collider.intersect(&through_center, &transform).is_some());
        assert!(collider.intersect(&through_origin, &transform).is_none());
    }

    #[test]
    fn raycast_sorts_nearest_first_and_applies_filter() {
        let mut world = hecs::World::new();
        let far = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -3.0)),
            Collider::default(),
        ));
        let near = world.spawn((Transform::new(), Collider::default()));
        let bare = world.spawn((Transform::new(),));
        let entities = [far, near, bare];

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hits = raycast_entities(&world, &entities, &ray, |_| true);
        let order: Vec<_> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![near, far]);

        let hits = raycast_entities(&world, &entities, &ray, |e| e != near);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, far);
    }
}
