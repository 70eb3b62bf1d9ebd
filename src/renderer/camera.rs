use glam::{Mat4, Vec3};

/// Perspective camera looking from `eye` at `target` with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    // Vertical field of view in degrees
    pub yfov: f32,
    // Follows the surface when unset
    pub aspect: Option<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(100.0, 0.0, 0.0),
            target: Vec3::ZERO,
            yfov: 45.0,
            aspect: None,
            znear: 1.0,
            zfar: 1000.0,
        }
    }
}

impl Camera {
    pub fn projection_matrix(&self, default_aspect: f32) -> Mat4 {
        let aspect = self.aspect.unwrap_or(default_aspect);
        Mat4::perspective_rh(self.yfov.to_radians(), aspect, self.znear, self.zfar)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn matrix(&self, default_aspect: f32) -> Mat4 {
        self.projection_matrix(default_aspect) * self.view_matrix()
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_projects_to_view_center() {
        let camera = Camera::default();
        let clip = camera.matrix(16.0 / 9.0) * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn fixed_aspect_overrides_surface_aspect() {
        let camera = Camera {
            aspect: Some(1.0),
            ..Default::default()
        };
        assert_eq!(camera.projection_matrix(2.0), camera.projection_matrix(1.0));
    }

    #[test]
    fn points_beyond_far_plane_are_clipped() {
        let camera = Camera::default();
        let far_point = camera.eye + (camera.target - camera.eye).normalize() * 1001.0;
        let clip = camera.matrix(1.0) * far_point.extend(1.0);
        assert!(clip.z / clip.w > 1.0);
    }
}
