use glam::{Mat4, Vec2, Vec3};

use crate::picking::Ray;

/// A fixed perspective camera looking at the bench.
///
/// Provides view and projection matrices for rendering and builds picking
/// rays from normalized device coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32, // radians
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 6.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.target = Vec3::new(x, y, z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Builds a world-space picking ray through a point in device coordinates.
    pub fn pick_ray(&self, ndc: Vec2, aspect: f32) -> Ray {
        Ray::from_ndc(ndc, self.view_projection(aspect))
    }

    /// Projects a world-space point to device coordinates.
    ///
    /// Returns `None` for points behind the camera.
    pub fn project(&self, world: Vec3, aspect: f32) -> Option<Vec2> {
        let clip = self.view_projection(aspect) * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        Some(Vec2::new(clip.x / clip.w, clip.y / clip.w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_ray_points_at_target() {
        let camera = Camera::new().at(0.0, 0.0, 5.0).looking_at(0.0, 0.0, 0.0);
        let ray = camera.pick_ray(Vec2::ZERO, 1.5);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!(ray.origin.z < 5.0 && ray.origin.z > 4.8);
    }

    #[test]
    fn project_and_pick_agree() {
        let camera = Camera::default();
        let point = Vec3::new(1.2, 0.3, -0.5);
        let ndc = camera.project(point, 16.0 / 9.0).unwrap();
        let ray = camera.pick_ray(ndc, 16.0 / 9.0);

        let to_point = (point - ray.origin).normalize();
        assert!(to_point.dot(ray.direction) > 0.9999);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let camera = Camera::new().at(0.0, 0.0, 5.0).looking_at(0.0, 0.0, 0.0);
        assert!(camera.project(Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }
}
