//! Camera system

use glam::{Mat4, Vec3};

/// Perspective projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Right-handed projection with wgpu's `0..1` depth range
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, projection: Projection) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection,
        }
    }

    /// Move the camera without changing where it looks
    pub fn set_position(&mut self, position: Vec3) {
        let delta = position - self.position;
        self.position = position;
        self.target += delta;
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio for perspective projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.projection.aspect = width / height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_looking_camera_is_a_translation() {
        let position = Vec3::new(0.5, 10.0, 0.0);
        let camera = Camera::new(position, position - Vec3::Z, Projection::default());
        let expected = Mat4::from_translation(-position);
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_set_position_keeps_direction() {
        let mut camera = Camera::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, -1.0), Projection::default());
        camera.set_position(Vec3::new(-1.0, 10.0, 0.0));
        assert_eq!(camera.target, Vec3::new(-1.0, 10.0, -1.0));
    }

    #[test]
    fn test_projection_depth_range() {
        let projection = Projection::perspective(45.0, 1.0, 0.01, 400.0);
        let m = projection.matrix();

        let near = m.project_point3(Vec3::new(0.0, 0.0, -0.01));
        let far = m.project_point3(Vec3::new(0.0, 0.0, -400.0));
        assert!(near.z.abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_point_ahead_lands_in_clip_space() {
        let camera = Camera::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, -1.0), Projection::perspective(45.0, 16.0 / 9.0, 0.01, 400.0));
        let ndc = camera.view_projection_matrix().project_point3(Vec3::new(0.0, 0.0, -100.0));
        assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0);
        assert!(ndc.y < 0.0, "ground below the camera projects to the lower half");
        assert!((0.0..1.0).contains(&ndc.z));
    }

    #[test]
    fn test_set_aspect_ignores_zero_size() {
        let mut camera = Camera::default();
        camera.set_aspect(0.0, 600.0);
        assert_eq!(camera.projection.aspect, 16.0 / 9.0);
        camera.set_aspect(800.0, 400.0);
        assert_eq!(camera.projection.aspect, 2.0);
    }
}
