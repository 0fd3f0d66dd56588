use super::compiled_plan::{CompiledPlan, PlanStats};
use super::error::{PipelineError, PipelineResult};
use super::executor::ModuleSlot;
use super::module::{BoundSource, BuiltinModule, InputBinding, OutputBinding};
use super::port::{find_port, Arity, PortBinding, PortDirection};
use crate::buffer::BufferRegistry;
use crate::config::{InputSource, ModuleConfig};
use crate::id::BufferId;
use std::collections::{HashMap, VecDeque};

/// Validates module definitions and compiles them into an execution plan
pub struct PipelineCompiler;

impl PipelineCompiler {
    /// Resolve one module definition against the buffer registry.
    ///
    /// Checks every binding against the module's ports: unknown names,
    /// missing required bindings, fixed values on buffer-only inputs,
    /// unknown buffers and output arity.
    pub fn bind(config: &ModuleConfig, registry: &BufferRegistry) -> PipelineResult<ModuleSlot> {
        let module = BuiltinModule::from_config(config)?;
        let ports = module.ports();
        let name = &config.name;

        let mut inputs = Vec::with_capacity(config.inputs.len());
        for input in &config.inputs {
            let port = find_port(ports, PortDirection::Input, &input.name).ok_or_else(|| {
                PipelineError::UnknownInput {
                    module: name.clone(),
                    input: input.name.clone(),
                }
            })?;

            let source = match &input.source {
                InputSource::Buffer(buffer) => {
                    let id = Self::resolve_buffer(registry, name, &input.name, buffer)?;
                    if port.binding == PortBinding::Value {
                        tracing::warn!(
                            "Module '{}': input '{}' takes a fixed value, ignoring buffer '{}'",
                            name,
                            input.name,
                            buffer
                        );
                        continue;
                    }
                    BoundSource::Buffer(id)
                }
                InputSource::Value(value) => {
                    if port.binding == PortBinding::Buffer {
                        return Err(PipelineError::BufferRequired {
                            module: name.clone(),
                            input: input.name.clone(),
                        });
                    }
                    BoundSource::Value(*value)
                }
            };
            inputs.push(InputBinding {
                name: input.name.clone(),
                source,
            });
        }

        let mut outputs = Vec::with_capacity(config.outputs.len());
        for output in &config.outputs {
            let port = find_port(ports, PortDirection::Output, &output.name).ok_or_else(|| {
                PipelineError::UnknownOutput {
                    module: name.clone(),
                    output: output.name.clone(),
                }
            })?;
            let buffer = Self::resolve_buffer(registry, name, &output.name, &output.buffer)?;
            if port.always_clear && !output.clear {
                tracing::debug!(
                    "Module '{}': output '{}' always replaces its buffer",
                    name,
                    output.name
                );
            }
            outputs.push(OutputBinding {
                name: output.name.clone(),
                buffer,
                clear: output.clear || port.always_clear,
            });
        }

        for port in ports.iter().filter(|p| p.required) {
            if port.is_input() && !inputs.iter().any(|i| i.name == port.name) {
                return Err(PipelineError::MissingInput {
                    module: name.clone(),
                    input: port.name.to_string(),
                });
            }
            if port.is_output() && !outputs.iter().any(|o| o.name == port.name) {
                return Err(PipelineError::MissingOutput {
                    module: name.clone(),
                    output: port.name.to_string(),
                });
            }
        }
        if module.short_circuits_empty() && inputs.is_empty() {
            return Err(PipelineError::NoBindings {
                module: name.clone(),
                what: "input",
            });
        }
        if outputs.is_empty() {
            return Err(PipelineError::NoBindings {
                module: name.clone(),
                what: "output",
            });
        }

        Self::check_arity(name, &module, &inputs, &outputs, registry)?;

        Ok(ModuleSlot::new(name.clone(), config.kind, module, inputs, outputs))
    }

    fn resolve_buffer(
        registry: &BufferRegistry,
        module: &str,
        binding: &str,
        buffer: &str,
    ) -> PipelineResult<BufferId> {
        registry
            .id_of(buffer)
            .ok_or_else(|| PipelineError::UnknownBuffer {
                module: module.to_string(),
                binding: binding.to_string(),
                buffer: buffer.to_string(),
            })
    }

    /// Reject outputs whose buffer cannot hold what the port produces.
    fn check_arity(
        name: &str,
        module: &BuiltinModule,
        inputs: &[InputBinding],
        outputs: &[OutputBinding],
        registry: &BufferRegistry,
    ) -> PipelineResult<()> {
        let capacity_of = |id: BufferId| registry.get(id).map_or(0, |b| b.capacity());
        let input_len = inputs
            .iter()
            .filter_map(InputBinding::buffer)
            .map(capacity_of)
            .max()
            .unwrap_or(0);

        for output in outputs {
            let Some(port) = find_port(module.ports(), PortDirection::Output, &output.name) else {
                continue;
            };
            let capacity = capacity_of(output.buffer);
            let produced = match port.arity {
                Arity::Single => (capacity < 1).then_some(1),
                Arity::Series | Arity::Broadcast => match module.fixed_output_len(inputs) {
                    Some(len) => (len > capacity).then_some(len),
                    None => (input_len > 1 && capacity <= 1).then_some(input_len),
                },
            };

            if let Some(produced) = produced {
                return Err(PipelineError::ArityMismatch {
                    module: name.to_string(),
                    output: output.name.clone(),
                    buffer: registry
                        .get(output.buffer)
                        .map(|b| b.name().to_string())
                        .unwrap_or_default(),
                    produced,
                    capacity,
                });
            }
        }
        Ok(())
    }

    /// Compile bound modules into an execution plan.
    ///
    /// Edges run from the module writing a buffer to every module reading it.
    /// Two modules writing the same buffer, or any cycle, is an error.
    pub fn compile(slots: &[ModuleSlot], registry: &BufferRegistry) -> PipelineResult<CompiledPlan> {
        let start_time = std::time::Instant::now();
        let buffer_count = registry.len();
        let n = slots.len();

        let writers = Self::collect_writers(slots, registry)?;
        let readers = Self::collect_readers(slots, buffer_count);
        let (fwd_adj, bwd_adj) = Self::build_adjacency(slots, &writers);

        let order = match Self::topological_sort(&fwd_adj) {
            Ok(order) => order,
            Err(in_degree) => {
                let cycle = Self::find_cycle(&bwd_adj, &in_degree);
                return Err(PipelineError::CycleDetected {
                    modules: cycle.iter().map(|&i| slots[i].name.clone()).collect(),
                });
            }
        };

        let sources: Vec<BufferId> = (0..buffer_count)
            .filter(|&b| !readers[b].is_empty() && writers[b].is_none())
            .map(|b| BufferId(b as u32))
            .collect();

        let stats = PlanStats {
            modules: n,
            edges: fwd_adj.iter().map(Vec::len).sum(),
            source_buffers: sources.len(),
            derived_buffers: writers.iter().filter(|w| w.is_some()).count(),
            depth: Self::depth(&order, &bwd_adj),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        Ok(CompiledPlan {
            order,
            readers,
            writers,
            sources,
            stats,
        })
    }

    fn collect_writers(
        slots: &[ModuleSlot],
        registry: &BufferRegistry,
    ) -> PipelineResult<Vec<Option<usize>>> {
        let mut writers: Vec<Option<usize>> = vec![None; registry.len()];
        for (idx, slot) in slots.iter().enumerate() {
            for output in &slot.outputs {
                let Some(writer) = writers.get_mut(output.buffer.index()) else {
                    continue;
                };
                match *writer {
                    Some(first) if first != idx => {
                        return Err(PipelineError::DuplicateWriter {
                            buffer: registry
                                .get(output.buffer)
                                .map(|b| b.name().to_string())
                                .unwrap_or_default(),
                            first: slots[first].name.clone(),
                            second: slot.name.clone(),
                        });
                    }
                    _ => *writer = Some(idx),
                }
            }
        }
        Ok(writers)
    }

    fn collect_readers(slots: &[ModuleSlot], buffer_count: usize) -> Vec<Vec<usize>> {
        let mut readers: Vec<Vec<usize>> = vec![Vec::new(); buffer_count];
        for (idx, slot) in slots.iter().enumerate() {
            for buffer in slot.input_buffers() {
                if let Some(list) = readers.get_mut(buffer.index()) {
                    if !list.contains(&idx) {
                        list.push(idx);
                    }
                }
            }
        }
        readers
    }

    /// Build forward and backward adjacency lists
    fn build_adjacency(
        slots: &[ModuleSlot],
        writers: &[Option<usize>],
    ) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let n = slots.len();
        let mut fwd_adj = vec![Vec::new(); n];
        let mut bwd_adj = vec![Vec::new(); n];

        for (to, slot) in slots.iter().enumerate() {
            for buffer in slot.input_buffers() {
                let Some(from) = writers.get(buffer.index()).copied().flatten() else {
                    continue;
                };
                if !fwd_adj[from].contains(&to) {
                    fwd_adj[from].push(to);
                    bwd_adj[to].push(from);
                }
            }
        }

        (fwd_adj, bwd_adj)
    }

    /// Kahn's algorithm. Ties are broken by declaration order.
    ///
    /// On failure returns the residual in-degrees: every module left with a
    /// non-zero count sits on or behind a cycle.
    fn topological_sort(fwd_adj: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
        let n = fwd_adj.len();
        let mut in_degree = vec![0usize; n];
        for targets in fwd_adj {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &fwd_adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() == n {
            Ok(order)
        } else {
            Err(in_degree)
        }
    }

    /// Walk predecessors through the unsorted residue until a module repeats.
    /// Returns the cycle in data-flow order, closed on its first module.
    fn find_cycle(bwd_adj: &[Vec<usize>], in_degree: &[usize]) -> Vec<usize> {
        let Some(start) = (0..in_degree.len()).find(|&i| in_degree[i] > 0) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut seen = HashMap::from([(start, 0usize)]);
        let mut node = start;

        while let Some(&prev) = bwd_adj[node].iter().find(|&&p| in_degree[p] > 0) {
            if let Some(&pos) = seen.get(&prev) {
                let mut cycle = path.split_off(pos);
                cycle.reverse();
                cycle.push(cycle[0]);
                return cycle;
            }
            seen.insert(prev, path.len());
            path.push(prev);
            node = prev;
        }

        path
    }

    /// Length of the longest dependency chain, counted in modules.
    fn depth(order: &[usize], bwd_adj: &[Vec<usize>]) -> usize {
        let mut level = vec![0usize; bwd_adj.len()];
        for &node in order {
            level[node] = 1 + bwd_adj[node].iter().map(|&p| level[p]).max().unwrap_or(0);
        }
        level.into_iter().max().unwrap_or(0)
    }
}
