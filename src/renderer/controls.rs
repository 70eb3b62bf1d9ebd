use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use super::camera::Camera;

const EPS: f32 = 1e-6;
// Pixels of a touchpad scroll that count as one wheel notch
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

/// Spherical coordinates around +Y: `theta` is the azimuth measured from +Z
/// and `phi` the polar angle measured from +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Spherical {
    radius: f32,
    theta: f32,
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius < EPS {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Camera helper that orbits, dollies and pans around a target point.
///
/// Input is accumulated from window events and applied in [`OrbitControls::update`],
/// which runs once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    // Full turns per minute
    pub auto_rotate_speed: f32,

    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_pixels: Vec2,
    pan_offset: Vec3,
    drag: Option<DragMode>,
    cursor: Option<Vec2>,
    viewport_height: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            enable_damping: false,
            damping_factor: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_pixels: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
            drag: None,
            cursor: None,
            viewport_height: 1.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3, max_distance: f32) -> Self {
        Self {
            target,
            max_distance,
            ..Default::default()
        }
    }

    pub fn resize(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Rotates the camera left by `theta` and up by `phi` radians.
    pub fn rotate(&mut self, theta: f32, phi: f32) {
        self.theta_delta -= theta;
        self.phi_delta -= phi;
    }

    /// Moves the camera towards the target when `scale` is above one.
    pub fn dolly_in(&mut self, scale: f32) {
        if scale > 0.0 {
            self.scale /= scale;
        }
    }

    pub fn dolly_out(&mut self, scale: f32) {
        if scale > 0.0 {
            self.scale *= scale;
        }
    }

    /// Pans by a cursor movement in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_pixels += Vec2::new(dx, dy);
    }

    fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.zoom_speed)
    }

    /// Feeds one window event. Returns whether the event was used.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let mode = match button {
                    MouseButton::Left => DragMode::Rotate,
                    MouseButton::Right | MouseButton::Middle => DragMode::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(mode),
                    ElementState::Released if self.drag == Some(mode) => self.drag = None,
                    ElementState::Released => (),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                let previous = self.cursor.replace(position);
                let (Some(mode), Some(previous)) = (self.drag, previous) else {
                    return false;
                };
                let delta = position - previous;
                match mode {
                    DragMode::Rotate => {
                        let factor = TAU * self.rotate_speed / self.viewport_height;
                        self.rotate(delta.x * factor, delta.y * factor);
                    }
                    DragMode::Pan => self.pan(delta.x * self.pan_speed, delta.y * self.pan_speed),
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                let scale = self.zoom_scale().powf(lines.abs());
                if lines > 0.0 {
                    self.dolly_out(scale);
                } else if lines < 0.0 {
                    self.dolly_in(scale);
                }
                true
            }
            _ => false,
        }
    }

    /// Applies accumulated input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera, delta: f32) -> bool {
        let mut spherical = Spherical::from_offset(camera.eye - self.target);

        if self.auto_rotate && self.drag.is_none() {
            let angle = TAU / 60.0 * self.auto_rotate_speed * delta;
            self.theta_delta -= angle;
        }

        let (damping, keep) = if self.enable_damping {
            let factor = self.damping_factor.clamp(0.0, 1.0);
            (factor, 1.0 - factor)
        } else {
            (1.0, 0.0)
        };

        spherical.theta += self.theta_delta * damping;
        spherical.phi += self.phi_delta * damping;
        let min_phi = self.min_polar_angle.max(EPS);
        let max_phi = self.max_polar_angle.min(PI - EPS);
        spherical.phi = spherical.phi.clamp(min_phi, max_phi.max(min_phi));

        spherical.radius *= self.scale;
        spherical.radius = spherical
            .radius
            .clamp(self.min_distance, self.max_distance.max(self.min_distance));

        if self.pan_pixels != Vec2::ZERO {
            // Pan so the point under the cursor follows it at the target depth
            let view = camera.view_matrix();
            let right = view.row(0).truncate();
            let up = view.row(1).truncate();
            let target_distance = camera.distance() * (camera.yfov.to_radians() / 2.0).tan();
            let pixel = 2.0 * target_distance / self.viewport_height;
            self.pan_offset += -right * self.pan_pixels.x * pixel + up * self.pan_pixels.y * pixel;
            self.pan_pixels = Vec2::ZERO;
        }
        self.target += self.pan_offset * damping;

        let eye = self.target + spherical.to_offset();
        let moved = eye.distance_squared(camera.eye) > EPS
            || self.target.distance_squared(camera.target) > EPS;
        camera.eye = eye;
        camera.target = self.target;

        self.theta_delta *= keep;
        self.phi_delta *= keep;
        self.pan_offset *= keep;
        self.scale = 1.0;

        moved
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn camera() -> Camera {
        Camera::default()
    }

    #[test]
    fn update_without_input_keeps_camera() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        let mut camera = camera();
        assert!(!controls.update(&mut camera, 0.016));
        assert!((camera.eye - Vec3::new(100.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn dolly_out_is_clamped_to_max_distance() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        let mut camera = camera();
        controls.dolly_out(10.0);
        assert!(controls.update(&mut camera, 0.016));
        assert!((camera.distance() - 150.0).abs() < 1e-3);
    }

    #[test]
    fn initial_eye_outside_range_is_pulled_in() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        let mut camera = Camera {
            eye: Vec3::new(0.0, 0.0, 400.0),
            ..Default::default()
        };
        controls.update(&mut camera, 0.0);
        assert!((camera.distance() - 150.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_keeps_eye_on_sphere() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        let mut camera = camera();
        controls.rotate(PI / 2.0, 0.3);
        assert!(controls.update(&mut camera, 0.016));
        assert!((camera.distance() - 100.0).abs() < 1e-3);
        assert!(camera.eye.x.abs() < 30.0);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        controls.max_polar_angle = PI / 2.0;
        let mut camera = camera();
        // Try to swing below the horizon
        controls.rotate(0.0, -1.0);
        controls.update(&mut camera, 0.016);
        assert!(camera.eye.y >= -1e-3);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        controls.resize(600);
        let mut camera = camera();
        let offset_before = camera.eye - camera.target;
        controls.pan(30.0, 0.0);
        assert!(controls.update(&mut camera, 0.016));
        assert!(camera.target.length() > 1e-3);
        let offset_after = camera.eye - camera.target;
        assert!((offset_before - offset_after).length() < 1e-3);
    }

    #[test]
    fn drag_left_button_rotates() {
        use winit::dpi::PhysicalPosition;
        use winit::event::DeviceId;

        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        controls.resize(600);
        let device_id = DeviceId::dummy();
        let moved = |x: f64| WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new(x, 300.0),
        };
        controls.handle_event(&moved(100.0));
        assert!(controls.handle_event(&WindowEvent::MouseInput {
            device_id,
            state: ElementState::Pressed,
            button: MouseButton::Left,
        }));
        assert!(controls.is_dragging());
        assert!(controls.handle_event(&moved(160.0)));
        let mut camera = camera();
        assert!(controls.update(&mut camera, 0.016));
        assert!(camera.eye.z.abs() > 1.0);
    }

    #[test]
    fn auto_rotate_turns_camera() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 150.0);
        controls.auto_rotate = true;
        let mut camera = camera();
        assert!(controls.update(&mut camera, 1.0));
        assert!((camera.distance() - 100.0).abs() < 1e-3);
    }
}
