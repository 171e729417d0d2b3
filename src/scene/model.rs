use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::asset::Handle;
use crate::render::{Mesh, Shader, Texture};
use crate::scene::collider::Collider;
use crate::scene::registry::Node;

/// A drawable scene entry: transform plus resource handles.
///
/// `name` groups models sharing mesh/texture/shader so the lit pass
/// can skip redundant texture binds; `id` stays unique per instance.
#[derive(Clone)]
pub struct Model {
    pub name: String,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    matrix: Mat4,
    pub mesh: Handle<Mesh>,
    pub texture: Handle<Texture>,
    pub shader: Handle<Shader>,
    collider: Option<Collider>,
}

impl Model {
    pub fn new(
        name: impl Into<String>,
        mesh: Handle<Mesh>,
        texture: Handle<Texture>,
        shader: Handle<Shader>,
    ) -> Self {
        let mut model = Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            matrix: Mat4::IDENTITY,
            mesh,
            texture,
            shader,
            collider: None,
        };
        model.refresh();
        model
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self.refresh();
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.refresh();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.refresh();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.refresh();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Model matrix and collider transform both follow the TRS state.
    fn refresh(&mut self) {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        self.matrix = Mat4::from_scale_rotation_translation(self.scale, rotation, self.position);
        if let Some(collider) = &mut self.collider {
            collider.set_transform(self.position, self.rotation, self.scale);
        }
    }

    pub fn collides_with(&self, other: &Model, deep: bool) -> bool {
        match (&self.collider, &other.collider) {
            (Some(a), Some(b)) => a.collides(b, deep),
            _ => false,
        }
    }
}

/// Setters keep the matrix and collider fresh, so the per-frame
/// fan-out has nothing left to do for models.
impl Node for Model {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> Model {
        Model::new(
            "crate",
            Handle::new(0),
            Handle::new(0),
            Handle::new(0),
        )
    }

    #[test]
    fn matrix_is_translation_rotation_scale() {
        let mut m = test_model();
        m.set_position(Vec3::new(1.0, 2.0, 3.0));
        m.set_rotation(Vec3::new(0.1, 0.2, 0.3));
        m.set_scale(Vec3::new(2.0, 2.0, 2.0));

        let q = Quat::from_euler(EulerRot::XYZ, 0.1, 0.2, 0.3);
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(q)
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(m.matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn setters_refresh_the_collider() {
        let mut m = test_model().with_collider(Collider::sphere(1.0));
        m.set_position(Vec3::new(10.0, 0.0, 0.0));
        let aabb = m.collider().unwrap().world_aabb();
        assert_eq!(aabb.min, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn models_without_colliders_never_collide() {
        let a = test_model();
        let b = test_model().with_collider(Collider::sphere(100.0));
        assert!(!a.collides_with(&b, true));
        assert!(!b.collides_with(&a, true));
    }
}
