//! Insertion-ordered entity registries with lifecycle fan-out.
//!
//! Draw order is registration order, so iteration must be stable; ids
//! index a side map into the ordered vec.

use std::collections::HashMap;

/// Lifecycle hooks fanned out by [`Registry::init_all`] and friends.
/// All three default to no-ops; entities override what they need.
pub trait Node {
    fn init(&mut self) {}
    fn update(&mut self, _dt: f32) {}
    fn deinit(&mut self) {}
}

pub struct Registry<T> {
    entries: Vec<(u32, T)>,
    by_id: HashMap<u32, usize>,
    next_id: u32,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_id: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.by_id.insert(id, self.entries.len());
        self.entries.push((id, entity));
        id
    }

    pub fn deregister(&mut self, id: u32) -> Option<T> {
        let index = self.by_id.remove(&id)?;
        let (_, entity) = self.entries.remove(index);
        for slot in self.by_id.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(entity)
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.by_id.get(&id).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.by_id.get(&id).map(|&i| &mut self.entries[i].1)
    }

    /// Entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.entries.iter_mut().map(|(id, e)| (*id, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
    }
}

impl<T: Node> Registry<T> {
    pub fn init_all(&mut self) {
        for (_, entity) in self.entries.iter_mut() {
            entity.init();
        }
    }

    pub fn update_all(&mut self, dt: f32) {
        for (_, entity) in self.entries.iter_mut() {
            entity.update(dt);
        }
    }

    pub fn deinit_all(&mut self) {
        for (_, entity) in self.entries.iter_mut() {
            entity.deinit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u32,
        alive: bool,
    }

    impl Node for Counter {
        fn init(&mut self) {
            self.alive = true;
        }
        fn update(&mut self, _dt: f32) {
            self.ticks += 1;
        }
        fn deinit(&mut self) {
            self.alive = false;
        }
    }

    #[test]
    fn iteration_preserves_registration_order_across_removals() {
        let mut reg = Registry::new();
        let a = reg.register("a");
        let _b = reg.register("b");
        let _c = reg.register("c");
        reg.deregister(a);
        let d = reg.register("d");

        let order: Vec<&str> = reg.iter().map(|(_, s)| *s).collect();
        assert_eq!(order, vec!["b", "c", "d"]);
        assert_eq!(reg.get(d), Some(&"d"));
    }

    #[test]
    fn deregister_returns_the_entity_once() {
        let mut reg = Registry::new();
        let id = reg.register(42);
        assert_eq!(reg.deregister(id), Some(42));
        assert_eq!(reg.deregister(id), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn lifecycle_fans_out_to_every_entry() {
        let mut reg = Registry::new();
        for _ in 0..3 {
            reg.register(Counter {
                ticks: 0,
                alive: false,
            });
        }
        reg.init_all();
        reg.update_all(0.016);
        reg.update_all(0.016);
        assert!(reg.iter().all(|(_, c)| c.alive && c.ticks == 2));
        reg.deinit_all();
        assert!(reg.iter().all(|(_, c)| !c.alive));
    }

    #[test]
    fn ids_stay_valid_after_earlier_removals() {
        let mut reg = Registry::new();
        let a = reg.register(1);
        let b = reg.register(2);
        let c = reg.register(3);
        reg.deregister(b);
        assert_eq!(reg.get(a), Some(&1));
        assert_eq!(reg.get(c), Some(&3));
    }
}
