//! CPU mirrors of the shadow sampling math in shader/lit.wgsl and
//! shader/shadow_point.wgsl.
//!
//! Conventions:
//! - Right-handed view space (lights look down -Z of their own frame).
//! - Clip/NDC depth range is [0, 1]. Near -> 0, far -> 1.
//! - Shadow map UVs have origin at top-left (v = 0 at top).

use glam::{Mat4, Vec2, Vec3, Vec4};

use voidstrike::render::uniforms::ShadowViewUniform;
use voidstrike::scene::{Light, LightKind};

const EPSILON: f32 = 1e-4;

/// Mirror of `cone_shadow_factor`'s projection half: world position to
/// shadow map UV and comparison depth. None when behind the light.
fn project_cone(view_proj: Mat4, world_pos: Vec3) -> Option<(Vec2, f32)> {
    let clip: Vec4 = view_proj * world_pos.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    let uv = Vec2::new(ndc.x * 0.5 + 0.5, ndc.y * -0.5 + 0.5);
    Some((uv, ndc.z))
}

/// Mirror of the point shadow fragment stage: distance over far.
fn point_face_depth(uniform: &ShadowViewUniform, world_pos: Vec3) -> f32 {
    let light_pos = Vec3::new(
        uniform.light_pos_far[0],
        uniform.light_pos_far[1],
        uniform.light_pos_far[2],
    );
    let far = uniform.light_pos_far[3];
    (world_pos.distance(light_pos) / far).clamp(0.0, 1.0)
}

#[test]
fn cone_centers_its_aim_point() {
    let light = Light::cone(
        Vec3::new(0.0, 10.0, 0.0),
        Vec3::new(0.0, -1.0, 0.1).normalize(),
        Vec3::ONE,
        1.0,
        0.5,
        50.0,
        "cone",
    );
    let aim = Vec3::new(0.0, 10.0, 0.0) + Vec3::new(0.0, -1.0, 0.1).normalize() * 8.0;
    let (uv, depth) = project_cone(light.view_proj(0), aim).expect("in front of the light");
    assert!(uv.abs_diff_eq(Vec2::new(0.5, 0.5), EPSILON));
    assert!(depth > 0.0 && depth < 1.0);
}

#[test]
fn cone_rejects_points_behind_the_light() {
    let light = Light::cone(
        Vec3::ZERO,
        Vec3::NEG_Z,
        Vec3::ONE,
        1.0,
        0.1,
        30.0,
        "cone",
    );
    assert!(project_cone(light.view_proj(0), Vec3::new(0.0, 0.0, 5.0)).is_none());
}

#[test]
fn cone_depth_grows_with_distance() {
    let light = Light::cone(
        Vec3::ZERO,
        Vec3::NEG_Z,
        Vec3::ONE,
        1.0,
        0.1,
        30.0,
        "cone",
    );
    let (_, near) = project_cone(light.view_proj(0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
    let (_, far) = project_cone(light.view_proj(0), Vec3::new(0.0, 0.0, -20.0)).unwrap();
    assert!(near < far);
}

#[test]
fn point_faces_project_their_axis_to_the_face_center() {
    let pos = Vec3::new(2.0, 1.0, -3.0);
    let light = Light::point(pos, Vec3::ONE, 1.0, 0.1, 25.0, "point");
    let axes = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];
    for (face, axis) in axes.into_iter().enumerate() {
        let probe = pos + axis * 5.0;
        let (uv, _) = project_cone(light.view_proj(face), probe).expect("on the face axis");
        assert!(uv.abs_diff_eq(Vec2::new(0.5, 0.5), EPSILON), "face {face}");
    }
}

#[test]
fn point_face_depth_is_distance_over_far() {
    let pos = Vec3::new(1.0, 4.0, 0.0);
    let light = Light::point(pos, Vec3::ONE, 1.0, 0.1, 20.0, "point");
    let uniform = ShadowViewUniform::point_face(light.view_proj(0), pos, 20.0);

    assert!((point_face_depth(&uniform, pos + Vec3::X * 5.0) - 0.25).abs() < EPSILON);
    assert!((point_face_depth(&uniform, pos + Vec3::X * 20.0) - 1.0).abs() < EPSILON);
    // Past the far plane the stored depth saturates.
    assert_eq!(point_face_depth(&uniform, pos + Vec3::X * 40.0), 1.0);
}

#[test]
fn cone_uniform_carries_no_light_position() {
    let light = Light::cone(
        Vec3::new(3.0, 3.0, 3.0),
        Vec3::NEG_Y,
        Vec3::ONE,
        1.0,
        0.1,
        10.0,
        "cone",
    );
    let uniform = ShadowViewUniform::cone(light.view_proj(0));
    assert_eq!(uniform.light_pos_far, [0.0; 4]);
    assert_eq!(light.kind, LightKind::Cone);
    assert_eq!(light.face_count(), 1);
}
