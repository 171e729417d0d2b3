//! Content-addressed, reference-counted resource registry.
//!
//! Every GPU-facing resource (meshes, textures, shaders, framebuffers)
//! lives in one of these stores, keyed by name. The name is the
//! content identity: a second `create` with the same name returns the
//! cached record and ignores the new parameters entirely. Records are
//! immutable after construction; only their refcount mutates. GPU
//! handles are released when the count reaches zero (the record is
//! dropped, and wgpu resources free on drop).

use std::collections::HashMap;

use super::Handle;

struct Entry<T> {
    name: String,
    refcount: u32,
    resource: T,
}

pub struct ResourceStore<T> {
    entries: Vec<Option<Entry<T>>>,
    free: Vec<usize>,
    by_name: HashMap<String, Handle<T>>,
}

impl<T> ResourceStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Return the record registered under `name`, building and
    /// inserting it with refcount 1 when absent. When the name is
    /// already present the builder is never run and the existing
    /// record's refcount is incremented.
    pub fn create<E>(
        &mut self,
        name: &str,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Handle<T>, E> {
        if let Some(&handle) = self.by_name.get(name) {
            let entry = self.entries[handle.index()]
                .as_mut()
                .expect("name map points at a live entry");
            entry.refcount += 1;
            return Ok(handle);
        }

        let resource = build()?;
        let entry = Entry {
            name: name.to_owned(),
            refcount: 1,
            resource,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.entries[index] = Some(entry);
                index
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        };

        let handle = Handle::new(index);
        self.by_name.insert(name.to_owned(), handle);
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<Handle<T>> {
        self.by_name.get(name).copied()
    }

    pub fn resource(&self, handle: Handle<T>) -> Option<&T> {
        self.entries
            .get(handle.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| &entry.resource)
    }

    pub fn name(&self, handle: Handle<T>) -> Option<&str> {
        self.entries
            .get(handle.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| entry.name.as_str())
    }

    pub fn refcount(&self, handle: Handle<T>) -> u32 {
        self.entries
            .get(handle.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| entry.refcount)
            .unwrap_or(0)
    }

    /// Drop one reference. Returns the released resource when the
    /// count reaches zero. Destroying an already-released handle is a
    /// programming error.
    pub fn destroy(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self
            .entries
            .get_mut(handle.index())
            .expect("destroy of unknown handle");
        let entry = slot.as_mut().expect("destroy of released handle");

        entry.refcount -= 1;
        if entry.refcount > 0 {
            return None;
        }

        let entry = slot.take().expect("entry checked above");
        self.by_name.remove(&entry.name);
        self.free.push(handle.index());
        Some(entry.resource)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
