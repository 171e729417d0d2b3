//! Collision behavior across the collider and registry layers.

use glam::Vec3;

use voidstrike::scene::{Collider, Registry};

fn sphere(pos: Vec3, radius: f32) -> Collider {
    let mut c = Collider::sphere(radius);
    c.set_transform(pos, Vec3::ZERO, Vec3::ONE);
    c
}

#[test]
fn scaled_spheres_use_the_x_scale_component() {
    let mut big = Collider::sphere(1.0);
    big.set_transform(Vec3::ZERO, Vec3::ZERO, Vec3::new(3.0, 1.0, 1.0));
    // Reach is 3.0 + 1.0.
    assert!(big.collides(&sphere(Vec3::new(3.9, 0.0, 0.0), 1.0), true));
    assert!(!big.collides(&sphere(Vec3::new(4.1, 0.0, 0.0), 1.0), true));
}

#[test]
fn every_pair_is_commutative() {
    let shapes = [
        sphere(Vec3::new(0.4, 0.0, 0.0), 1.0),
        {
            let mut b = Collider::oriented_box(Vec3::splat(-1.0), Vec3::splat(1.0));
            b.set_transform(Vec3::new(1.2, 0.5, 0.0), Vec3::new(0.2, 0.9, 0.0), Vec3::ONE);
            b
        },
        sphere(Vec3::new(10.0, 0.0, 0.0), 0.5),
    ];
    for a in &shapes {
        for b in &shapes {
            assert_eq!(a.collides(b, true), b.collides(a, true));
            assert_eq!(a.collides(b, false), b.collides(a, false));
        }
    }
}

#[test]
fn registry_pairs_keep_registration_order() {
    // Pairwise sweep over a registry, the way a scene resolves shot
    // hits, sees entries in insertion order.
    let mut registry = Registry::new();
    let first = registry.register(sphere(Vec3::ZERO, 1.0));
    let second = registry.register(sphere(Vec3::new(1.5, 0.0, 0.0), 1.0));
    let third = registry.register(sphere(Vec3::new(10.0, 0.0, 0.0), 1.0));

    let mut hits = Vec::new();
    let entries: Vec<(u32, &Collider)> = registry.iter().collect();
    for (i, (id_a, a)) in entries.iter().enumerate() {
        for (id_b, b) in entries.iter().skip(i + 1) {
            if a.collides(b, true) {
                hits.push((*id_a, *id_b));
            }
        }
    }
    assert_eq!(hits, vec![(first, second)]);
    assert!(registry.get(third).is_some());
}

#[test]
fn deregistered_entries_leave_the_sweep() {
    let mut registry = Registry::new();
    let a = registry.register(sphere(Vec3::ZERO, 1.0));
    let b = registry.register(sphere(Vec3::new(1.0, 0.0, 0.0), 1.0));
    registry.deregister(a);

    let remaining: Vec<u32> = registry.iter().map(|(id, _)| id).collect();
    assert_eq!(remaining, vec![b]);
}
