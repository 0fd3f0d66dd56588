use crate::id::BufferId;

/// Compiled execution plan for an analysis graph.
///
/// Modules are referred to by their index in the pipeline's module list.
#[derive(Debug, Clone, Default)]
pub struct CompiledPlan {
    /// Module indices in topological order
    pub order: Vec<usize>,

    /// For each buffer (by index), the modules reading it
    pub readers: Vec<Vec<usize>>,

    /// For each buffer (by index), the module writing it
    pub writers: Vec<Option<usize>>,

    /// Buffers read by some module and written by none. Only these need
    /// observers: everything else changes inside an evaluation wave.
    pub sources: Vec<BufferId>,

    /// Compilation statistics
    pub stats: PlanStats,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Number of modules in the graph
    pub modules: usize,

    /// Number of module-to-module edges
    pub edges: usize,

    /// Number of source buffers
    pub source_buffers: usize,

    /// Number of buffers written by a module
    pub derived_buffers: usize,

    /// Longest chain of dependent modules
    pub depth: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

impl CompiledPlan {
    /// Modules reading `buffer`
    pub fn readers_of(&self, buffer: BufferId) -> &[usize] {
        self.readers
            .get(buffer.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Module writing `buffer`, if any
    pub fn writer_of(&self, buffer: BufferId) -> Option<usize> {
        self.writers.get(buffer.index()).copied().flatten()
    }

    /// Check if the plan has any modules
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_out_of_range() {
        let plan = CompiledPlan::default();
        assert!(plan.is_empty());
        assert!(plan.readers_of(BufferId(3)).is_empty());
        assert_eq!(plan.writer_of(BufferId(3)), None);
    }
}
