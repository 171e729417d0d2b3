//! Shadow-casting lights.
//!
//! A cone light renders one depth view; a point light renders six, one
//! per cube face. View matrices follow the cube-map face convention so
//! each face's up vector matches what the sampler expects.

use glam::{Mat4, Vec3};

use crate::config::POINT_SHADOW_FACES;
use crate::scene::registry::Node;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Cone,
    Point,
}

/// The six signed axes with their cube-map up vectors.
const CUBE_FACES: [(Vec3, Vec3); POINT_SHADOW_FACES] = [
    (Vec3::X, Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::NEG_X, Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::Y, Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::NEG_Y, Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::Z, Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::NEG_Z, Vec3::new(0.0, -1.0, 0.0)),
];

#[derive(Clone, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    /// Cone aim direction; unused for point lights.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub near: f32,
    pub far: f32,
    /// Name of the shadow buffer record this light renders into.
    pub shadow_buffer: String,
    views: Vec<Mat4>,
    projections: Vec<Mat4>,
}

impl Light {
    pub fn cone(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        near: f32,
        far: f32,
        shadow_buffer: impl Into<String>,
    ) -> Self {
        let mut light = Self {
            kind: LightKind::Cone,
            position,
            direction,
            color,
            intensity,
            near,
            far,
            shadow_buffer: shadow_buffer.into(),
            views: Vec::with_capacity(1),
            projections: Vec::with_capacity(1),
        };
        light.update();
        light
    }

    pub fn point(
        position: Vec3,
        color: Vec3,
        intensity: f32,
        near: f32,
        far: f32,
        shadow_buffer: impl Into<String>,
    ) -> Self {
        let mut light = Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::NEG_Z,
            color,
            intensity,
            near,
            far,
            shadow_buffer: shadow_buffer.into(),
            views: Vec::with_capacity(POINT_SHADOW_FACES),
            projections: Vec::with_capacity(POINT_SHADOW_FACES),
        };
        light.update();
        light
    }

    /// Rebuild view/projection matrices from the current position.
    pub fn update(&mut self) {
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.views.clear();
        self.projections.clear();
        match self.kind {
            LightKind::Cone => {
                self.views.push(Mat4::look_at_rh(
                    self.position,
                    self.position + self.direction,
                    Vec3::Y,
                ));
                self.projections.push(Mat4::perspective_rh(
                    90f32.to_radians(),
                    1.0,
                    self.near,
                    self.far,
                ));
            }
            LightKind::Point => {
                let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, self.near, self.far);
                for (forward, up) in CUBE_FACES {
                    self.views
                        .push(Mat4::look_at_rh(self.position, self.position + forward, up));
                    self.projections.push(proj);
                }
            }
        }
    }

    pub fn views(&self) -> &[Mat4] {
        &self.views
    }

    pub fn projections(&self) -> &[Mat4] {
        &self.projections
    }

    pub fn view_proj(&self, face: usize) -> Mat4 {
        self.projections[face] * self.views[face]
    }

    pub fn face_count(&self) -> usize {
        self.views.len()
    }
}

/// The per-frame fan-out re-derives the matrices, so scenes can move a
/// light by writing `position` alone.
impl Node for Light {
    fn update(&mut self, _dt: f32) {
        self.rebuild();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cone_light_has_one_view() {
        let light = Light::cone(
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::NEG_Y,
            Vec3::ONE,
            1.0,
            0.1,
            50.0,
            "cone0",
        );
        assert_eq!(light.views().len(), 1);
        assert_eq!(light.projections().len(), 1);
    }

    #[test]
    fn point_light_has_six_axis_views() {
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let light = Light::point(pos, Vec3::ONE, 1.0, 0.1, 25.0, "point0");
        assert_eq!(light.views().len(), 6);

        // Each view must carry a point along its axis onto the -Z view
        // axis at the right depth.
        for (face, (forward, _)) in CUBE_FACES.iter().enumerate() {
            let probe = pos + *forward * 7.0;
            let in_view = light.views()[face].transform_point3(probe);
            assert!(in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -7.0), 1e-4), "face {face}");
        }
    }

    #[test]
    fn point_projections_are_identical_square_90_degrees() {
        let light = Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 0.5, 30.0, "point0");
        let expected = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.5, 30.0);
        for proj in light.projections() {
            assert_eq!(*proj, expected);
        }
    }

    #[test]
    fn registry_fan_out_follows_moved_lights() {
        use crate::scene::Registry;

        let mut lights = Registry::new();
        let id = lights.register(Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 0.1, 25.0, "p0"));
        lights.get_mut(id).unwrap().position = Vec3::new(0.0, 10.0, 0.0);
        lights.update_all(0.016);

        let probe = Vec3::new(0.0, 10.0, -3.0);
        let in_view = lights.get(id).unwrap().views()[5].transform_point3(probe);
        assert!(in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-4));
    }

    #[test]
    fn update_follows_position() {
        let mut light = Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 0.1, 25.0, "point0");
        light.position = Vec3::new(0.0, 10.0, 0.0);
        light.update();
        let probe = Vec3::new(0.0, 10.0, -3.0);
        let in_view = light.views()[5].transform_point3(probe);
        assert!(in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-4));
    }
}
