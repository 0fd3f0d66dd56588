//! Identity types shared by the buffer registry and the pipeline.
//!
//! `BufferId` is a newtype over `u32` that serves as a direct index into the
//! registry's storage vector, so holders keep a handle rather than a
//! reference.

use std::fmt;

/// Index into `BufferRegistry`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl BufferId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Handle returned by `DataBuffer::register_observer`, unique per buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObserverId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_id() {
        let id = BufferId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "BufferId(42)");
    }
}
