//! Camera for 3D viewport rendering and picking

use crate::core::types::{Vec2, Vec3, Mat4, Quat};
use crate::math::Ray;

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.01,
            far: 10000.0,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        let rotation = Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward));

        Self {
            position,
            rotation,
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 10000.0,
        }
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        let rotation_matrix = Mat4::from_quat(self.rotation.conjugate());
        let translation_matrix = Mat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get inverse view-projection matrix (for ray generation)
    pub fn view_projection_inverse(&self) -> Mat4 {
        self.view_projection().inverse()
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get right direction (positive X in camera space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get up direction (positive Y in camera space)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Update aspect ratio (call on viewport resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width / height;
    }

    /// Build a world-space ray through a screen pixel.
    ///
    /// `screen` is in pixels with the origin at the top-left corner;
    /// `viewport` is the (width, height) of the viewport in pixels.
    pub fn ray_from_screen(&self, screen: Vec2, viewport: (f32, f32)) -> Ray {
        let ndc_x = 2.0 * screen.x / viewport.0 - 1.0;
        let ndc_y = 1.0 - 2.0 * screen.y / viewport.1;

        // Unproject a point on the far plane and aim the ray at it
        let inv = self.view_projection_inverse();
        let far_point = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        Ray::new(self.position, (far_point - self.position).normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions() {
        let camera = Camera::default();

        // Default camera looks down -Z
        let forward = camera.forward();
        assert!((forward.z - (-1.0)).abs() < 0.001);

        let right = camera.right();
        assert!((right.x - 1.0).abs() < 0.001);

        let up = camera.up();
        assert!((up.y - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_view_matrix_translation() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 0.0);

        let view = camera.view_matrix();
        // View matrix should translate world origin to (-10, 0, 0) in camera space
        let origin_in_camera = view.transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_projection_inverse() {
        let camera = Camera::default();
        let vp = camera.view_projection();
        let vp_inv = camera.view_projection_inverse();

        // VP * VP^-1 should be identity
        let identity = vp * vp_inv;
        assert!((identity.w_axis.w - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_ray_through_screen_center() {
        let camera = Camera::look_at(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO, Vec3::Y);
        let ray = camera.ray_from_screen(Vec2::new(400.0, 300.0), (800.0, 600.0));

        assert_eq!(ray.origin, camera.position);
        // Center-of-screen ray matches the camera's forward direction
        let forward = camera.forward();
        assert!((ray.direction - forward).length() < 0.001);
    }

    #[test]
    fn test_ray_corners_diverge() {
        let camera = Camera::default();
        let top_left = camera.ray_from_screen(Vec2::new(0.0, 0.0), (800.0, 600.0));
        let bottom_right = camera.ray_from_screen(Vec2::new(800.0, 600.0), (800.0, 600.0));

        assert!(top_left.direction.x < 0.0);
        assert!(top_left.direction.y > 0.0);
        assert!(bottom_right.direction.x > 0.0);
        assert!(bottom_right.direction.y < 0.0);
    }
}
