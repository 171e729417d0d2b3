//! Collision volumes: AABB broad phase, sphere/oriented-box narrow
//! phase.
//!
//! Every collider carries a base AABB computed once in model space and
//! a transformed AABB refreshed whenever the owning model moves. The
//! broad phase compares transformed AABBs; the narrow phase dispatches
//! on the shape pair.
//!
//! The box-box test is a mutual corner-containment check, not a
//! separating-axis test, so edge-edge-only overlaps are missed. The
//! broad phase runs first either way.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Axis-aligned box as componentwise min/max.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        Some(aabb)
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mx.x, mn.y, mx.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mx.y, mx.z),
        ]
    }

    /// Interval overlap on all three axes.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    OrientedBox { local: Aabb },
}

#[derive(Clone, Debug)]
pub struct Collider {
    shape: ColliderShape,
    base: Aabb,
    world: Aabb,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Collider {
    pub fn sphere(radius: f32) -> Self {
        let base = Aabb::new(Vec3::splat(-radius), Vec3::splat(radius));
        Self::with_shape(ColliderShape::Sphere { radius }, base)
    }

    pub fn oriented_box(min: Vec3, max: Vec3) -> Self {
        let local = Aabb::new(min, max);
        Self::with_shape(ColliderShape::OrientedBox { local }, local)
    }

    /// Box collider fitted to a mesh's model-space vertex positions.
    pub fn from_mesh_points(points: &[Vec3]) -> Option<Self> {
        let local = Aabb::from_points(points.iter().copied())?;
        Some(Self::oriented_box(local.min, local.max))
    }

    fn with_shape(shape: ColliderShape, base: Aabb) -> Self {
        Self {
            shape,
            base,
            world: base,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn base_aabb(&self) -> &Aabb {
        &self.base
    }

    pub fn world_aabb(&self) -> &Aabb {
        &self.world
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Refresh the transformed AABB from the base corners. Rotation is
    /// ignored for spheres (a rotated sphere is the same sphere), which
    /// keeps their world AABB tight.
    pub fn set_transform(&mut self, position: Vec3, rotation_euler: Vec3, scale: Vec3) {
        self.position = position;
        self.scale = scale;
        self.rotation = match self.shape {
            ColliderShape::Sphere { .. } => Quat::IDENTITY,
            ColliderShape::OrientedBox { .. } => Quat::from_euler(
                EulerRot::XYZ,
                rotation_euler.x,
                rotation_euler.y,
                rotation_euler.z,
            ),
        };

        let matrix = self.matrix();
        let corners = self.base.corners().map(|c| matrix.transform_point3(c));
        self.world =
            Aabb::from_points(corners).expect("eight corners always produce an AABB");
    }

    fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Broad phase, then (when requested) the shape-pair narrow phase.
    pub fn collides(&self, other: &Collider, deep: bool) -> bool {
        if !self.world.intersects(&other.world) {
            return false;
        }
        if !deep {
            return true;
        }
        match (&self.shape, &other.shape) {
            (ColliderShape::Sphere { radius: r1 }, ColliderShape::Sphere { radius: r2 }) => {
                sphere_sphere(self, *r1, other, *r2)
            }
            (ColliderShape::OrientedBox { local }, ColliderShape::Sphere { radius }) => {
                box_sphere(self, local, other, *radius)
            }
            (ColliderShape::Sphere { radius }, ColliderShape::OrientedBox { local }) => {
                box_sphere(other, local, self, *radius)
            }
            (
                ColliderShape::OrientedBox { local: la },
                ColliderShape::OrientedBox { local: lb },
            ) => box_box(self, la, other, lb),
        }
    }
}

/// Radii scale with the X component of each collider's scale.
fn sphere_sphere(a: &Collider, r1: f32, b: &Collider, r2: f32) -> bool {
    let reach = r1 * a.scale.x + r2 * b.scale.x;
    a.position.distance(b.position) <= reach
}

/// Clamp the sphere center, expressed in the box's local frame, into
/// the box extents; the sphere hits iff the clamped point is within
/// its scaled radius.
fn box_sphere(bx: &Collider, local: &Aabb, sphere: &Collider, radius: f32) -> bool {
    let to_local = bx.matrix().inverse();
    let center = to_local.transform_point3(sphere.position);
    let clamped = center.clamp(local.min, local.max);
    clamped.distance(center) <= radius * sphere.scale.x
}

/// Mutual corner containment: any corner of one box inside the other
/// (tested in that box's local frame) counts as a hit.
fn box_box(a: &Collider, local_a: &Aabb, b: &Collider, local_b: &Aabb) -> bool {
    corners_inside(a, local_a, b) || corners_inside(b, local_b, a)
}

fn corners_inside(target: &Collider, target_local: &Aabb, source: &Collider) -> bool {
    let to_target = target.matrix().inverse();
    let source_matrix = source.matrix();
    source.base.corners().iter().any(|&corner| {
        let world = source_matrix.transform_point3(corner);
        target_local.contains_point(to_target.transform_point3(world))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn sphere_at(pos: Vec3, radius: f32) -> Collider {
        let mut c = Collider::sphere(radius);
        c.set_transform(pos, Vec3::ZERO, Vec3::ONE);
        c
    }

    #[test]
    fn world_aabb_contains_all_transformed_base_corners() {
        let mut c = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        c.set_transform(
            Vec3::new(3.0, -2.0, 1.0),
            Vec3::new(0.3, 1.1, -0.4),
            Vec3::new(2.0, 0.5, 1.5),
        );
        let matrix = Mat4::from_scale_rotation_translation(c.scale(), c.rotation(), c.position());
        for corner in c.base_aabb().corners() {
            assert!(c.world_aabb().contains_point(matrix.transform_point3(corner)));
        }
    }

    #[test]
    fn sphere_world_aabb_ignores_rotation() {
        let mut c = Collider::sphere(1.0);
        c.set_transform(Vec3::ZERO, Vec3::new(0.7, 0.2, 1.9), Vec3::ONE);
        assert_eq!(*c.world_aabb(), Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn sphere_pair_with_equal_radii() {
        let a = sphere_at(Vec3::ZERO, 1.0);
        let near = sphere_at(Vec3::new(1.9, 0.0, 0.0), 1.0);
        let far = sphere_at(Vec3::new(2.1, 0.0, 0.0), 1.0);

        assert!(a.collides(&near, true));
        assert!(!a.collides(&far, true));
    }

    #[test]
    fn spheres_touching_exactly_collide() {
        let a = sphere_at(Vec3::ZERO, 1.0);
        let b = sphere_at(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(a.collides(&b, true));
        assert!(b.collides(&a, true));
    }

    #[test]
    fn collision_is_commutative() {
        let a = sphere_at(Vec3::new(0.5, 0.0, 0.0), 1.2);
        let mut b = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.set_transform(Vec3::new(1.4, 0.3, 0.0), Vec3::new(0.0, 0.4, 0.0), Vec3::ONE);
        assert_eq!(a.collides(&b, true), b.collides(&a, true));
    }

    #[test]
    fn rotated_box_against_sphere_uses_the_local_frame() {
        let mut bx = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        bx.set_transform(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.0, FRAC_PI_2, 0.0),
            Vec3::ONE,
        );

        let inside = sphere_at(Vec3::new(5.0, 0.0, 0.9), 0.2);
        let touching = sphere_at(Vec3::new(5.0, 0.0, 1.3), 0.2);
        let outside = sphere_at(Vec3::new(5.0, 0.0, 1.5), 0.2);

        assert!(bx.collides(&inside, true));
        assert!(bx.collides(&touching, true));
        assert!(!bx.collides(&outside, true));
    }

    #[test]
    fn broad_phase_alone_reports_aabb_overlap() {
        // AABBs overlap but the narrow phase separates them.
        let a = sphere_at(Vec3::ZERO, 1.0);
        let b = sphere_at(Vec3::new(1.9, 1.9, 0.0), 1.0);
        assert!(a.collides(&b, false));
        assert!(!a.collides(&b, true));
    }

    #[test]
    fn box_box_corner_containment() {
        let mut a = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        a.set_transform(Vec3::ZERO, Vec3::ZERO, Vec3::ONE);

        let mut b = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.set_transform(Vec3::new(1.5, 1.5, 1.5), Vec3::ZERO, Vec3::ONE);
        assert!(a.collides(&b, true));

        b.set_transform(Vec3::new(3.5, 0.0, 0.0), Vec3::ZERO, Vec3::ONE);
        assert!(!a.collides(&b, true));
    }

    #[test]
    fn empty_point_set_produces_no_collider() {
        assert!(Collider::from_mesh_points(&[]).is_none());
    }

    #[test]
    fn mesh_collider_uses_vertex_extents() {
        let points = [
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(1.0, 3.0, -1.0),
            Vec3::new(0.0, -1.0, 2.0),
        ];
        let c = Collider::from_mesh_points(&points).unwrap();
        assert_eq!(c.base_aabb().min, Vec3::new(-2.0, -1.0, -1.0));
        assert_eq!(c.base_aabb().max, Vec3::new(1.0, 3.0, 2.0));
    }
}
