use glam::{Mat4, Vec3};

use crate::scene::registry::Node;

#[derive(Clone, Copy, Debug)]
pub enum Projection {
    Perspective {
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_radians,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }
}

/// Free camera: position plus a forward direction, not a target point.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    view: Mat4,
    proj: Mat4,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3, projection: Projection) -> Self {
        let mut camera = Self {
            position,
            direction,
            up,
            projection,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        camera.update();
        camera
    }

    pub fn perspective(position: Vec3, direction: Vec3, aspect: f32) -> Self {
        Self::new(
            position,
            direction,
            Vec3::Y,
            Projection::Perspective {
                fov_y_radians: 60f32.to_radians(),
                aspect,
                near: 0.1,
                far: 100.0,
            },
        )
    }

    /// No-op for orthographic projections.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
        }
        self.update();
    }

    /// Refresh the cached matrices from position/direction/up.
    pub fn update(&mut self) {
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.view = Mat4::look_at_rh(self.position, self.position + self.direction, self.up);
        self.proj = self.projection.matrix();
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

impl Node for Camera {
    fn update(&mut self, _dt: f32) {
        self.rebuild();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z, 4.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_tracks_position_and_direction() {
        let mut cam = Camera::default();
        cam.position = Vec3::new(0.0, 5.0, 0.0);
        cam.direction = Vec3::NEG_Y;
        cam.up = Vec3::NEG_Z;
        cam.update();
        let expected = Mat4::look_at_rh(cam.position, Vec3::ZERO, Vec3::NEG_Z);
        assert!(cam.view().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn view_proj_is_invertible() {
        let cam = Camera::default();
        let vp = cam.view_proj();
        let id = vp * vp.inverse();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn registered_cameras_update_and_switch_by_id() {
        use crate::scene::Registry;

        let mut cameras = Registry::new();
        let chase = cameras.register(Camera::perspective(
            Vec3::new(0.0, 2.0, 8.0),
            Vec3::NEG_Z,
            1.0,
        ));
        let top = cameras.register(Camera::perspective(Vec3::ZERO, Vec3::NEG_Z, 1.0));

        let cam = cameras.get_mut(top).unwrap();
        cam.position = Vec3::new(0.0, 20.0, 0.0);
        cam.direction = Vec3::NEG_Y;
        cam.up = Vec3::NEG_Z;
        cameras.update_all(0.016);

        let expected = Mat4::look_at_rh(
            Vec3::new(0.0, 20.0, 0.0),
            Vec3::new(0.0, 19.0, 0.0),
            Vec3::NEG_Z,
        );
        assert!(cameras.get(top).unwrap().view().abs_diff_eq(expected, 1e-5));

        // Deregistering one camera leaves the other addressable.
        cameras.deregister(top);
        assert!(cameras.get(chase).is_some());
        assert!(cameras.get(top).is_none());
    }

    #[test]
    fn orthographic_maps_extents_to_clip_corners() {
        let cam = Camera::new(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            Projection::Orthographic {
                left: 0.0,
                right: 1024.0,
                bottom: 0.0,
                top: 768.0,
                near: -1.0,
                far: 1.0,
            },
        );
        let corner = cam.proj().project_point3(Vec3::new(1024.0, 768.0, 0.0));
        assert!(corner.abs_diff_eq(Vec3::new(1.0, 1.0, 0.5), 1e-5));
    }
}
