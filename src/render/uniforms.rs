//! GPU-side uniform layouts. Field order and padding must match the
//! WGSL structs in `shader/`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::{MAX_CONE_LIGHTS, MAX_POINT_LIGHTS};

/// Per-frame globals for the lit pass.
///
/// `feature_mask`: 0 = full, 1 = shadows off, 2 = shadows and lighting
/// off.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: f32,
    pub feature_mask: u32,
    pub cone_count: u32,
    pub point_count: u32,
}

impl Globals {
    pub fn new(view_proj: Mat4, camera_pos: Vec3, ambient: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).to_array(),
            ambient,
            feature_mask: 0,
            cone_count: 0,
            point_count: 0,
        }
    }
}

/// One cone light. `position.w` carries the shadow array layer.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct ConeLightUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub color_intensity: [f32; 4],
}

/// One point light. `params` = (far plane, cube index, 0, 0).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct PointLightUniform {
    pub position: [f32; 4],
    pub color_intensity: [f32; 4],
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub cones: [ConeLightUniform; MAX_CONE_LIGHTS],
    pub points: [PointLightUniform; MAX_POINT_LIGHTS],
}

/// Per-model entry in the objects storage buffer, indexed by
/// `instance_index` in the shaders.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct ObjectData {
    pub model: [[f32; 4]; 4],
}

impl ObjectData {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// Depth-pass uniform: one light view and, for point faces, the light
/// origin and far plane for distance-based depth.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct ShadowViewUniform {
    pub view_proj: [[f32; 4]; 4],
    pub light_pos_far: [f32; 4],
}

impl ShadowViewUniform {
    pub fn cone(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_pos_far: [0.0; 4],
        }
    }

    pub fn point_face(view_proj: Mat4, light_pos: Vec3, far: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_pos_far: light_pos.extend(far).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        assert_eq!(mem::size_of::<Globals>() % 16, 0);
        assert_eq!(mem::size_of::<ConeLightUniform>() % 16, 0);
        assert_eq!(mem::size_of::<PointLightUniform>() % 16, 0);
        assert_eq!(mem::size_of::<LightsUniform>() % 16, 0);
        assert_eq!(mem::size_of::<ShadowViewUniform>() % 16, 0);
    }

    #[test]
    fn lights_uniform_holds_both_caps() {
        assert_eq!(
            mem::size_of::<LightsUniform>(),
            MAX_CONE_LIGHTS * mem::size_of::<ConeLightUniform>()
                + MAX_POINT_LIGHTS * mem::size_of::<PointLightUniform>()
        );
    }
}
