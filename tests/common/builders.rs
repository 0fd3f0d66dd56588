//! Test data builders for creating experiments

use sensorflow::{BufferConfig, ExperimentConfig, ModuleConfig, SchedulerConfig, Session};

/// Builder for small experiments
pub struct ExperimentBuilder {
    config: ExperimentConfig,
}

impl ExperimentBuilder {
    pub fn new() -> Self {
        Self {
            config: ExperimentConfig::new(),
        }
    }

    /// Plain buffer
    pub fn buffer(mut self, name: &str, capacity: usize) -> Self {
        self.config.buffers.push(BufferConfig::new(name, capacity));
        self
    }

    /// Static buffer written once at load
    pub fn fixed(mut self, name: &str, values: &[f64]) -> Self {
        self.config
            .buffers
            .push(BufferConfig::new(name, values.len().max(1)).fixed(values.to_vec()));
        self
    }

    pub fn module(mut self, module: ModuleConfig) -> Self {
        self.config.modules.push(module);
        self
    }

    /// Unthrottled scheduler with a short idle timeout
    pub fn fast_scheduler(mut self) -> Self {
        self.config.scheduler = SchedulerConfig {
            frame_rate_hz: 0,
            idle_timeout_ms: 5,
            ..SchedulerConfig::default()
        };
        self
    }

    pub fn build(self) -> ExperimentConfig {
        self.config
    }

    pub fn session(self) -> Session {
        Session::from_config(&self.config).expect("experiment should compile")
    }
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_builder() {
        let config = ExperimentBuilder::new()
            .buffer("a", 10)
            .fixed("k", &[2.0, 3.0])
            .build();

        assert_eq!(config.buffers.len(), 2);
        assert!(config.buffers[1].static_buffer);
        assert_eq!(config.buffers[1].capacity, 2);
    }
}
