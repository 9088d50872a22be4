use glam::{Mat4, Vec3};

use super::{Element, ElementCore, ElementType};
use crate::math::AABB;
use crate::state::StatePacker;

pub const DEFAULT_FOV_DEGREES: f32 = 50.0;
pub const MIN_DISTANCE: f32 = 0.01;
const MAX_ELEVATION: f32 = 89.0_f32 * (std::f32::consts::PI / 180.0);

/// Orbit camera circling a focal point
///
/// The camera is not boundable. It frames the union of every boundable
/// element that gets added to its scene.
pub struct Camera {
    core: ElementCore,
    pub focal_point: Vec3,
    /// Rotation around +Y in radians
    pub azimuth: f32,
    /// Angle above the XZ plane in radians
    pub elevation: f32,
    pub distance: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Radians per second added to the azimuth every update
    pub auto_rotate: f32,
    framed: Option<AABB>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            core: ElementCore::new(),
            focal_point: Vec3::ZERO,
            azimuth: 0.0,
            elevation: 0.3,
            distance: 5.0,
            fov: DEFAULT_FOV_DEGREES.to_radians(),
            auto_rotate: 0.0,
            framed: None,
        }
    }

    pub fn with_fov_degrees(mut self, degrees: f32) -> Self {
        self.fov = degrees.clamp(1.0, 179.0).to_radians();
        self
    }

    pub fn with_auto_rotate_degrees(mut self, degrees_per_second: f32) -> Self {
        self.auto_rotate = degrees_per_second.to_radians();
        self
    }

    /// Unit vector from the camera toward the focal point
    pub fn forward(&self) -> Vec3 {
        -Vec3::new(
            self.azimuth.sin() * self.elevation.cos(),
            self.elevation.sin(),
            self.azimuth.cos() * self.elevation.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    pub fn position(&self) -> Vec3 {
        self.focal_point - self.forward() * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.focal_point, Vec3::Y)
    }

    pub fn world_transform(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// Rotate around the focal point, elevation is clamped short of the poles
    pub fn orbit(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth = wrap_angle(self.azimuth + d_azimuth);
        self.elevation = (self.elevation + d_elevation).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Multiply the orbit distance, `factor < 1` moves closer
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).max(MIN_DISTANCE);
    }

    /// Center on `bound` at a distance where its bounding sphere fills the view
    pub fn focus(&mut self, bound: &AABB) {
        let radius = bound.half_extents().length().max(MIN_DISTANCE);
        self.focal_point = bound.center();
        self.distance = (radius / (self.fov * 0.5).sin()).max(MIN_DISTANCE);
    }

    /// Bound currently framed by the camera, if any boundable element was added
    pub fn framed(&self) -> Option<AABB> {
        self.framed
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Camera {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn element_type(&self) -> ElementType {
        ElementType::Camera
    }

    fn on_added(&mut self, other: &dyn Element) {
        if let Some(bound) = other.calc_bound() {
            let framed = match self.framed {
                Some(current) => current.union(&bound),
                None => bound,
            };
            self.framed = Some(framed);
            self.focus(&framed);
        }
    }

    fn on_update(&mut self, delta_time: f32) {
        if self.auto_rotate != 0.0 {
            self.azimuth = wrap_angle(self.azimuth + self.auto_rotate * delta_time);
        }
    }

    fn pack(&self, packer: &mut StatePacker<'_>) {
        packer.transform(&self.world_transform());
        packer.f32(self.fov);
    }
}

fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(std::f32::consts::TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn basis_is_orthonormal() {
        let mut camera = Camera::new();
        camera.orbit(0.8, 0.4);

        let (f, r, u) = (camera.forward(), camera.right(), camera.up());
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
    }

    #[test]
    fn position_is_distance_from_focal_point() {
        let mut camera = Camera::new();
        camera.focal_point = Vec3::new(1.0, 2.0, 3.0);
        camera.distance = 10.0;
        let offset = camera.position() - camera.focal_point;
        assert!((offset.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn focus_centers_on_bound() {
        let mut camera = Camera::new();
        let bound = AABB::new(Vec3::new(-2.0, 0.0, -2.0), Vec3::new(4.0, 2.0, 2.0));
        camera.focus(&bound);
        assert!(approx_eq(camera.focal_point, Vec3::new(1.0, 1.0, 0.0)));
        assert!(camera.distance > bound.half_extents().length());
    }

    #[test]
    fn elevation_is_clamped() {
        let mut camera = Camera::new();
        camera.orbit(0.0, 10.0);
        assert!(camera.elevation <= MAX_ELEVATION);
        camera.orbit(0.0, -20.0);
        assert!(camera.elevation >= -MAX_ELEVATION);
    }

    #[test]
    fn zoom_never_reaches_zero() {
        let mut camera = Camera::new();
        for _ in 0..100 {
            camera.zoom(0.01);
        }
        assert!(camera.distance >= MIN_DISTANCE);
    }

    #[test]
    fn auto_rotate_advances_azimuth() {
        let mut camera = Camera::new().with_auto_rotate_degrees(90.0);
        let before = camera.azimuth;
        camera.on_update(1.0);
        assert!((camera.azimuth - before - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn static_camera_does_not_move_on_update() {
        let mut camera = Camera::new();
        let before = camera.world_transform();
        camera.on_update(0.5);
        assert_eq!(before, camera.world_transform());
    }
}
