//! Orbit camera and the matrices the shaders consume.

use glam::{Mat4, Vec3};

/// Degrees the auto orbit advances per frame.
pub const AUTO_ORBIT_DEGREES_PER_FRAME: f32 = 0.5;

/// Orbit camera for viewing the particle field.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
}

impl OrbitCamera {
    /// Create a new camera with default positioning.
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.3,
            distance: 9.0,
            target: Vec3::ZERO,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Rotate from a mouse drag in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Move toward or away from the target.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance - scroll * 0.3).clamp(0.5, 20.0);
    }

    /// Place the camera on the automatic orbit for `frame`, looking at the origin.
    pub fn follow_auto_orbit(&mut self, frame: u64) {
        self.set_position(auto_orbit_position(frame), Vec3::ZERO);
    }

    /// Derive yaw/pitch/distance so the camera sits at `position` looking at `target`.
    pub fn set_position(&mut self, position: Vec3, target: Vec3) {
        let offset = position - target;
        let distance = offset.length();
        self.target = target;
        if distance <= f32::EPSILON {
            return;
        }
        self.distance = distance;
        self.pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        self.yaw = offset.x.atan2(offset.z);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of the automatic orbit at `frame`.
///
/// The radius breathes between 7 and 11 as the angle advances, and the
/// height follows `atan(x)` so the camera bobs over and under the field.
pub fn auto_orbit_position(frame: u64) -> Vec3 {
    let deg = frame as f32 * AUTO_ORBIT_DEGREES_PER_FRAME;
    let rad = deg.to_radians();
    let r = rad.sin() * 2.0 + 9.0;

    let x = rad.sin() * r;
    let y = x.atan();
    let z = rad.cos() * r;
    Vec3::new(x, y, z)
}

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Projection {
    /// 60° vertical field of view for the given surface size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_y: 60.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect: width.max(1) as f32 / height.max(1) as f32,
        }
    }

    /// Update the aspect ratio after a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// All matrices derived from a camera and projection for one frame.
#[derive(Clone, Copy, Debug)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_proj: Mat4,
    /// Camera-to-world transform.
    pub inv_view: Mat4,
    pub position: Vec3,
}

impl CameraMatrices {
    pub fn new(camera: &OrbitCamera, projection: &Projection) -> Self {
        let view = camera.view_matrix();
        let proj = projection.matrix();
        Self {
            view,
            proj,
            view_proj: proj * view,
            inv_proj: proj.inverse(),
            inv_view: view.inverse(),
            position: camera.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_auto_orbit_start() {
        let pos = auto_orbit_position(0);
        assert!(approx(pos, Vec3::new(0.0, 0.0, 9.0)));
    }

    #[test]
    fn test_auto_orbit_quarter_turn() {
        // 180 frames at 0.5 deg/frame = 90 degrees, radius 11
        let pos = auto_orbit_position(180);
        assert!((pos.x - 11.0).abs() < 1e-3);
        assert!((pos.y - 11.0_f32.atan()).abs() < 1e-3);
        assert!(pos.z.abs() < 1e-3);
    }

    #[test]
    fn test_auto_orbit_radius_bounds() {
        for frame in (0..720).step_by(7) {
            let pos = auto_orbit_position(frame);
            let planar = (pos.x * pos.x + pos.z * pos.z).sqrt();
            assert!((7.0 - 1e-3..=11.0 + 1e-3).contains(&planar));
        }
    }

    #[test]
    fn test_follow_auto_orbit_matches_position() {
        let mut camera = OrbitCamera::new();
        for frame in [0, 45, 300, 611] {
            camera.follow_auto_orbit(frame);
            assert!(approx(camera.position(), auto_orbit_position(frame)));
            assert_eq!(camera.target, Vec3::ZERO);
        }
    }

    #[test]
    fn test_rotate_and_zoom_clamp() {
        let mut camera = OrbitCamera::new();
        camera.rotate(0.0, 10_000.0);
        assert_eq!(camera.pitch, 1.5);
        camera.zoom(1_000.0);
        assert_eq!(camera.distance, 0.5);
        camera.zoom(-1_000.0);
        assert_eq!(camera.distance, 20.0);
    }

    #[test]
    fn test_inverse_view_is_camera_to_world() {
        let mut camera = OrbitCamera::new();
        camera.follow_auto_orbit(90);
        let m = CameraMatrices::new(&camera, &Projection::new(1280, 720));

        let eye = m.inv_view.transform_point3(Vec3::ZERO);
        assert!(approx(eye, m.position));
        assert!(approx(m.view.transform_point3(eye), Vec3::ZERO));
    }

    #[test]
    fn test_inverse_projection() {
        let projection = Projection::new(800, 600);
        let m = CameraMatrices::new(&OrbitCamera::new(), &projection);
        let product = m.proj * m.inv_proj;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
