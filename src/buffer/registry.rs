//! Session-owned registry of named buffers.
//!
//! The registry owns every buffer for the lifetime of a session. Modules,
//! producers and views hold a [`BufferId`] (a direct index) and resolve it
//! through the registry instead of keeping their own references.

use super::data_buffer::{DataBuffer, Notify};
use crate::id::BufferId;
use crate::pipeline::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: Vec<Arc<DataBuffer>>,
    by_name: HashMap<String, BufferId>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer. Names must be unique within a session.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
        is_static: bool,
    ) -> PipelineResult<BufferId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(PipelineError::DuplicateBuffer(name));
        }

        let id = BufferId(self.buffers.len() as u32);
        self.buffers
            .push(Arc::new(DataBuffer::new(id, name.clone(), capacity, is_static)));
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<BufferId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: BufferId) -> Option<&DataBuffer> {
        self.buffers.get(id.index()).map(|b| b.as_ref())
    }

    pub fn by_name(&self, name: &str) -> Option<&DataBuffer> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Shared handle for producers that write from their own threads.
    pub fn shared(&self, id: BufferId) -> Option<Arc<DataBuffer>> {
        self.buffers.get(id.index()).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataBuffer> {
        self.buffers.iter().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Clear every buffer at the start of a new recording. Written static
    /// buffers keep their contents.
    pub fn clear_all(&self, notify: Notify) {
        for buffer in &self.buffers {
            buffer.clear_with(notify);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let mut registry = BufferRegistry::new();
        let a = registry.create("acc_x", 100, false).unwrap();
        let b = registry.create("t", 100, false).unwrap();
        assert_eq!(a, BufferId(0));
        assert_eq!(b, BufferId(1));
        assert_eq!(registry.id_of("t"), Some(b));
        assert_eq!(registry.get(a).unwrap().name(), "acc_x");
        assert_eq!(registry.by_name("t").unwrap().id(), b);
        assert!(registry.get(BufferId(7)).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = BufferRegistry::new();
        registry.create("x", 1, false).unwrap();
        assert_eq!(
            registry.create("x", 2, false),
            Err(PipelineError::DuplicateBuffer("x".into()))
        );
    }

    #[test]
    fn test_clear_all_keeps_static_latch() {
        let mut registry = BufferRegistry::new();
        let data = registry.create("data", 4, false).unwrap();
        let edit = registry.create("edit", 1, true).unwrap();
        registry.get(data).unwrap().append_all(&[1.0, 2.0]);
        registry.get(edit).unwrap().append(9.81);

        registry.clear_all(Notify::Silent);

        assert!(registry.get(data).unwrap().is_empty());
        assert_eq!(registry.get(edit).unwrap().snapshot(), vec![9.81]);
    }

    #[test]
    fn test_shared_handle_writes_through() {
        let mut registry = BufferRegistry::new();
        let id = registry.create("mic", 8, false).unwrap();
        let handle = registry.shared(id).unwrap();
        std::thread::spawn(move || handle.append_all(&[0.1, 0.2]))
            .join()
            .unwrap();
        assert_eq!(registry.get(id).unwrap().len(), 2);
    }
}
