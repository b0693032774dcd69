use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

/// Fixed camera looking at the arena
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            eye: config.eye,
            target: config.target,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            z_near: config.z_near,
            z_far: config.z_far,
        };
        camera.set_aspect(width, height);
        camera
    }

    #[cfg(test)]
    pub(crate) fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }

    /// World position to screen pixels (origin top left), `None` when the
    /// point is behind the camera or outside the depth range.
    pub fn project(&self, world: Vec3, width: f32, height: f32) -> Option<Vec2> {
        let clip = self.view_proj() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height,
        ))
    }

    /// Approximate on-screen size in pixels of a world-space length at `world`
    pub fn pixels_per_unit(&self, world: Vec3, height: f32) -> f32 {
        let distance = (world - self.eye).length().max(self.z_near);
        height / (2.0 * distance * (self.fov_y / 2.0).tan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(&CameraConfig::default(), 800, 600)
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let cam = camera();
        let p = cam.project(cam.target, 800.0, 600.0).unwrap();
        assert!((p.x - 400.0).abs() < 0.01, "x = {}", p.x);
        assert!((p.y - 300.0).abs() < 0.01, "y = {}", p.y);
    }

    #[test]
    fn test_point_behind_camera_is_not_projected() {
        let cam = camera();
        let behind = cam.eye - cam.forward() * 10.0;
        assert!(cam.project(behind, 800.0, 600.0).is_none());
    }

    #[test]
    fn test_higher_points_are_higher_on_screen() {
        let cam = camera();
        let low = cam.project(Vec3::new(0.0, 0.0, 0.0), 800.0, 600.0).unwrap();
        let high = cam.project(Vec3::new(0.0, 10.0, 0.0), 800.0, 600.0).unwrap();
        assert!(high.y < low.y);
    }

    #[test]
    fn test_aspect_survives_zero_height() {
        let mut cam = camera();
        cam.set_aspect(1024, 0);
        assert!(cam.aspect.is_finite());
    }

    #[test]
    fn test_closer_points_appear_larger() {
        let cam = camera();
        let near = cam.pixels_per_unit(cam.eye + cam.forward() * 10.0, 600.0);
        let far = cam.pixels_per_unit(cam.eye + cam.forward() * 100.0, 600.0);
        assert!(near > far);
    }
}
