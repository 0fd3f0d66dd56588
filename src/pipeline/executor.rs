//! Pipeline executor: one evaluation wave over the analysis graph.
//!
//! Each wave:
//! 1. Drain change signals from source-buffer observers.
//! 2. Mark every module reading a changed buffer dirty.
//! 3. Visit modules in topological order. A dirty module whose buffer inputs
//!    all still hold the change tokens seen on its last run is skipped;
//!    otherwise it runs.
//! 4. Mark readers of every buffer a module actually wrote dirty, so
//!    downstream modules run later in the same wave.
//!
//! Waves are synchronous and single-threaded, so a module never observes a
//! half-written upstream buffer and never runs concurrently with itself.

use crate::analysis::Operand;
use crate::buffer::{BufferRegistry, ChangeToken, Notify};
use crate::config::ModuleConfig;
use crate::id::{BufferId, ObserverId};
use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::module::{
    BoundSource, BuiltinModule, InputBinding, ModuleContext, OutputBinding, ResolvedInput,
};
use crate::pipeline::module_kind::ModuleKind;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A module together with its bindings and per-run bookkeeping.
#[derive(Debug)]
pub struct ModuleSlot {
    pub name: String,
    pub kind: ModuleKind,
    pub module: BuiltinModule,
    pub inputs: Vec<InputBinding>,
    pub outputs: Vec<OutputBinding>,
    /// Token of each buffer input as read on the last run. `None` for fixed
    /// values and before the first run.
    tokens: Vec<Option<ChangeToken>>,
    runs: u64,
}

impl ModuleSlot {
    pub fn new(
        name: String,
        kind: ModuleKind,
        module: BuiltinModule,
        inputs: Vec<InputBinding>,
        outputs: Vec<OutputBinding>,
    ) -> Self {
        let tokens = vec![None; inputs.len()];
        Self {
            name,
            kind,
            module,
            inputs,
            outputs,
            tokens,
            runs: 0,
        }
    }

    /// Buffers this module reads.
    pub fn input_buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.inputs.iter().filter_map(InputBinding::buffer)
    }

    /// Number of times this module has actually run.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// True when the module has buffer inputs and none changed since its
    /// last run.
    fn inputs_unchanged(&self, registry: &BufferRegistry) -> bool {
        let mut any_buffer = false;
        for (binding, token) in self.inputs.iter().zip(&self.tokens) {
            let BoundSource::Buffer(id) = binding.source else {
                continue;
            };
            any_buffer = true;
            match (token, registry.get(id)) {
                (Some(token), Some(buffer)) if buffer.is_valid(*token) => {}
                _ => return false,
            }
        }
        any_buffer
    }

    fn forget_tokens(&mut self) {
        self.tokens.iter_mut().for_each(|t| *t = None);
    }

    /// Resolve inputs, run, and report which buffers were mutated.
    fn run(&mut self, registry: &BufferRegistry) -> Vec<BufferId> {
        let mut resolved = Vec::with_capacity(self.inputs.len());
        for (binding, token) in self.inputs.iter().zip(self.tokens.iter_mut()) {
            let (operand, from_buffer) = match binding.source {
                BoundSource::Value(value) => (Operand::Scalar(value), false),
                BoundSource::Buffer(id) => match registry.get(id) {
                    Some(buffer) => {
                        let (values, read_token) = buffer.snapshot_with_token();
                        *token = Some(read_token);
                        (Operand::from_values(values), true)
                    }
                    None => (Operand::Vector(Vec::new()), true),
                },
            };
            resolved.push(ResolvedInput {
                name: binding.name.clone(),
                operand,
                from_buffer,
            });
        }

        let mut ctx = ModuleContext::new(&self.name, registry, resolved, &self.outputs);
        if self.module.short_circuits_empty() && ctx.is_degenerate() {
            tracing::trace!("Module '{}': no input data, writing empty result", self.name);
            ctx.write_empty();
        } else {
            self.module.process(&mut ctx);
        }
        self.runs += 1;
        ctx.into_written()
    }
}

/// Outcome of one evaluation wave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveStats {
    /// Modules that ran
    pub executed: usize,
    /// Dirty modules skipped because their inputs were unchanged
    pub skipped: usize,
    /// Buffer writes that changed a buffer
    pub writes: usize,
    /// Wall time of the wave in microseconds
    pub elapsed_us: u64,
}

/// The analysis graph and its executor.
pub struct Pipeline {
    registry: Arc<BufferRegistry>,
    modules: Vec<ModuleSlot>,
    plan: CompiledPlan,
    dirty: Vec<bool>,
    /// Change signals from source-buffer observers.
    signals: Receiver<BufferId>,
    /// Held so `signals` stays connected when the plan has no source
    /// buffers; otherwise `wait_for_change` would return at once.
    _signal_tx: Sender<BufferId>,
    /// Per-buffer "signal already queued" flags, so a fast producer queues
    /// at most one signal per buffer between two waves.
    pending: Arc<Vec<AtomicBool>>,
    observers: Vec<(BufferId, ObserverId)>,
    /// Contents written back into buffers when a new recording starts.
    initial: Vec<(BufferId, Vec<f64>)>,
    waves: u64,
}

impl Pipeline {
    fn new(
        registry: Arc<BufferRegistry>,
        modules: Vec<ModuleSlot>,
        plan: CompiledPlan,
        initial: Vec<(BufferId, Vec<f64>)>,
    ) -> Self {
        let (signal_tx, signals) = unbounded();
        let pending: Arc<Vec<AtomicBool>> =
            Arc::new((0..registry.len()).map(|_| AtomicBool::new(false)).collect());

        let mut observers = Vec::with_capacity(plan.sources.len());
        for &source in &plan.sources {
            let Some(buffer) = registry.get(source) else {
                continue;
            };
            let tx = signal_tx.clone();
            let flags = Arc::clone(&pending);
            let id = buffer.register_observer(move |changed: BufferId| {
                let queued = flags
                    .get(changed.index())
                    .is_some_and(|flag| flag.swap(true, Ordering::AcqRel));
                if !queued {
                    let _ = tx.send(changed);
                }
            });
            observers.push((source, id));
        }

        let dirty = vec![true; modules.len()];
        Self {
            registry,
            modules,
            plan,
            dirty,
            signals,
            _signal_tx: signal_tx,
            pending,
            observers,
            initial,
            waves: 0,
        }
    }

    pub fn registry(&self) -> &Arc<BufferRegistry> {
        &self.registry
    }

    pub fn plan(&self) -> &CompiledPlan {
        &self.plan
    }

    pub fn modules(&self) -> &[ModuleSlot] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleSlot> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Number of waves evaluated so far.
    pub fn waves(&self) -> u64 {
        self.waves
    }

    /// True when a module is waiting to run.
    pub fn has_pending(&self) -> bool {
        self.dirty.iter().any(|&d| d) || !self.signals.is_empty()
    }

    fn take_signal(&mut self, buffer: BufferId) {
        if let Some(flag) = self.pending.get(buffer.index()) {
            flag.store(false, Ordering::Release);
        }
        for &reader in self.plan.readers_of(buffer) {
            self.dirty[reader] = true;
        }
    }

    fn drain_signals(&mut self) {
        while let Ok(buffer) = self.signals.try_recv() {
            self.take_signal(buffer);
        }
    }

    /// Block until a source buffer changes or `timeout` elapses.
    ///
    /// Returns true when there is work for the next wave.
    pub fn wait_for_change(&mut self, timeout: Duration) -> bool {
        if self.dirty.iter().any(|&d| d) {
            return true;
        }
        match self.signals.recv_timeout(timeout) {
            Ok(buffer) => {
                self.take_signal(buffer);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run one evaluation wave.
    pub fn evaluate(&mut self) -> WaveStats {
        let start = Instant::now();
        self.drain_signals();

        let mut stats = WaveStats::default();
        for i in 0..self.plan.order.len() {
            let idx = self.plan.order[i];
            if !std::mem::take(&mut self.dirty[idx]) {
                continue;
            }

            let slot = &mut self.modules[idx];
            if slot.inputs_unchanged(&self.registry) {
                stats.skipped += 1;
                continue;
            }

            let written = slot.run(&self.registry);
            stats.executed += 1;
            stats.writes += written.len();
            for buffer in written {
                for &reader in self.plan.readers_of(buffer) {
                    self.dirty[reader] = true;
                }
            }
        }

        self.waves += 1;
        stats.elapsed_us = start.elapsed().as_micros() as u64;
        if stats.executed > 0 {
            tracing::trace!(
                "Wave {}: {} executed, {} skipped in {} us",
                self.waves,
                stats.executed,
                stats.skipped,
                stats.elapsed_us
            );
        }
        stats
    }

    /// Force every module to run on the next wave.
    pub fn invalidate_all(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = true);
        self.modules.iter_mut().for_each(ModuleSlot::forget_tokens);
    }

    /// Start a new recording: clear every buffer, restore initial contents
    /// and schedule a full re-evaluation. Written static buffers are kept.
    pub fn reset_recording(&mut self) {
        self.registry.clear_all(Notify::Observers);
        for (id, values) in &self.initial {
            if let Some(buffer) = self.registry.get(*id) {
                buffer.append_all(values);
            }
        }
        self.invalidate_all();
        tracing::debug!("Recording reset, {} buffers cleared", self.registry.len());
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for &(buffer, observer) in &self.observers {
            if let Some(buffer) = self.registry.get(buffer) {
                buffer.unregister_observer(observer);
            }
        }
    }
}

/// Builds a [`Pipeline`] from module definitions.
pub struct PipelineBuilder {
    registry: Arc<BufferRegistry>,
    modules: Vec<ModuleConfig>,
    initial: Vec<(BufferId, Vec<f64>)>,
}

impl PipelineBuilder {
    pub fn new(registry: Arc<BufferRegistry>) -> Self {
        Self {
            registry,
            modules: Vec::new(),
            initial: Vec::new(),
        }
    }

    pub fn module(mut self, config: ModuleConfig) -> Self {
        self.modules.push(config);
        self
    }

    pub fn modules(mut self, configs: impl IntoIterator<Item = ModuleConfig>) -> Self {
        self.modules.extend(configs);
        self
    }

    /// Contents restored into `buffer` whenever a new recording starts.
    pub fn initial_values(mut self, buffer: BufferId, values: Vec<f64>) -> Self {
        self.initial.push((buffer, values));
        self
    }

    /// Validate every definition and compile the graph.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let mut names = HashSet::new();
        for config in &self.modules {
            if !names.insert(config.name.as_str()) {
                return Err(PipelineError::DuplicateModule(config.name.clone()));
            }
        }

        let slots = self
            .modules
            .iter()
            .map(|config| PipelineCompiler::bind(config, &self.registry))
            .collect::<PipelineResult<Vec<_>>>()?;
        let plan = PipelineCompiler::compile(&slots, &self.registry)?;

        tracing::info!(
            "Pipeline compiled: {} modules, {} source buffers, depth {} ({} us)",
            plan.stats.modules,
            plan.stats.source_buffers,
            plan.stats.depth,
            plan.stats.compile_time_us,
        );

        Ok(Pipeline::new(self.registry, slots, plan, self.initial))
    }
}
