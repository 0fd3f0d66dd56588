//! Module abstraction for the analysis graph.
//!
//! Every operator is a plain struct with `ports` and `process`. The closed
//! `BuiltinModule` enum dispatches to them with a match, so evaluation never
//! goes through a vtable.
//!
//! # Per-run contract
//!
//! The executor resolves every input binding to an [`Operand`] before calling
//! `process`: a fixed value becomes a scalar, a buffer with exactly one sample
//! becomes a scalar, anything else becomes a vector snapshot. If every
//! buffer-backed input is empty, or there are no inputs at all, the run
//! short-circuits to an empty result instead (see
//! [`BuiltinModule::short_circuits_empty`]). Results are written through
//! [`ModuleContext::write`], which replaces the buffer contents for
//! clear-first outputs and appends otherwise.

use crate::analysis::Operand;
use crate::buffer::{BufferRegistry, Extrema};
use crate::config::{ModuleConfig, ParamValue};
use crate::id::BufferId;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::module_kind::ModuleKind;
use crate::pipeline::modules::{
    ArithmeticModule, ArithmeticOp, AverageModule, ConstGeneratorModule, ExtremumModule,
    IntegrateModule, MapModule,
};
use crate::pipeline::port::PortDescriptor;

/// Source of one bound input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundSource {
    Buffer(BufferId),
    Value(f64),
}

/// A named input resolved against the buffer registry.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub name: String,
    pub source: BoundSource,
}

impl InputBinding {
    pub fn buffer(&self) -> Option<BufferId> {
        match self.source {
            BoundSource::Buffer(id) => Some(id),
            BoundSource::Value(_) => None,
        }
    }
}

/// A named output resolved against the buffer registry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    pub name: String,
    pub buffer: BufferId,
    /// Replace instead of append. Already folded with the port's `always_clear`.
    pub clear: bool,
}

/// One input as seen by `process`.
#[derive(Debug)]
pub struct ResolvedInput {
    pub name: String,
    pub operand: Operand,
    pub from_buffer: bool,
}

/// Context passed to a module for one run.
pub struct ModuleContext<'a> {
    module: &'a str,
    registry: &'a BufferRegistry,
    inputs: Vec<Option<ResolvedInput>>,
    outputs: &'a [OutputBinding],
    written: Vec<BufferId>,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        module: &'a str,
        registry: &'a BufferRegistry,
        inputs: Vec<ResolvedInput>,
        outputs: &'a [OutputBinding],
    ) -> Self {
        Self {
            module,
            registry,
            inputs: inputs.into_iter().map(Some).collect(),
            outputs,
            written: Vec::new(),
        }
    }

    /// Name of the running module, for log messages.
    pub fn module(&self) -> &str {
        self.module
    }

    /// True when every buffer-backed input is empty. Without buffer inputs
    /// the run is degenerate only if it has no inputs at all: fixed values
    /// alone are data.
    pub fn is_degenerate(&self) -> bool {
        let mut buffers = self
            .inputs
            .iter()
            .flatten()
            .filter(|input| input.from_buffer)
            .peekable();
        if buffers.peek().is_none() {
            return self.inputs.iter().flatten().next().is_none();
        }
        buffers.all(|input| input.operand.is_empty())
    }

    /// Borrow the first input bound under `name`.
    pub fn input(&self, name: &str) -> Option<&Operand> {
        self.inputs
            .iter()
            .flatten()
            .find(|input| input.name == name)
            .map(|input| &input.operand)
    }

    /// Move the first input bound under `name` out of the context.
    pub fn take_input(&mut self, name: &str) -> Option<Operand> {
        self.inputs
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|input| input.name == name))
            .and_then(Option::take)
            .map(|input| input.operand)
    }

    /// Move every remaining input out, in declaration order.
    pub fn take_all(&mut self) -> Vec<(String, Operand)> {
        self.inputs
            .iter_mut()
            .filter_map(Option::take)
            .map(|input| (input.name, input.operand))
            .collect()
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|o| o.name == port)
    }

    /// Capacity of the first buffer bound to `port`.
    pub fn output_capacity(&self, port: &str) -> Option<usize> {
        self.outputs
            .iter()
            .find(|o| o.name == port)
            .and_then(|o| self.registry.get(o.buffer))
            .map(|b| b.capacity())
    }

    /// Write `values` to every buffer bound to `port`.
    ///
    /// `extrema`, when given, replaces the tracked extrema of clear-first
    /// outputs so they need not be recomputed from the values.
    pub fn write(&mut self, port: &str, values: &[f64], extrema: Option<Extrema>) {
        for output in self.outputs.iter().filter(|o| o.name == port) {
            let Some(buffer) = self.registry.get(output.buffer) else {
                continue;
            };
            let changed = if output.clear {
                buffer.replace_all_with_extrema(values, extrema)
            } else {
                buffer.append_all(values)
            };
            if changed {
                self.written.push(output.buffer);
            }
        }
    }

    pub fn write_value(&mut self, port: &str, value: f64) {
        self.write(port, &[value], None);
    }

    /// Empty result on every output: clear-first outputs are emptied,
    /// appending outputs are left alone.
    pub fn write_empty(&mut self) {
        for output in self.outputs.iter().filter(|o| o.clear) {
            if let Some(buffer) = self.registry.get(output.buffer) {
                if buffer.replace_all(&[]) {
                    self.written.push(output.buffer);
                }
            }
        }
    }

    /// Buffers actually mutated during this run.
    pub fn into_written(self) -> Vec<BufferId> {
        self.written
    }
}

/// Enum dispatch for built-in modules.
#[derive(Debug, Clone)]
pub enum BuiltinModule {
    Arithmetic(ArithmeticModule),
    Average(AverageModule),
    Extremum(ExtremumModule),
    Integrate(IntegrateModule),
    ConstGenerator(ConstGeneratorModule),
    Map(MapModule),
}

impl BuiltinModule {
    /// Build a module from its definition. Parameters are validated here.
    pub fn from_config(config: &ModuleConfig) -> PipelineResult<Self> {
        let known = config.kind.known_params();
        if let Some(param) = config.params.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(PipelineError::UnknownParameter {
                module: config.name.clone(),
                param: param.clone(),
            });
        }

        let params = Params {
            module: &config.name,
            values: &config.params,
        };

        Ok(match config.kind {
            ModuleKind::Add => BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Add)),
            ModuleKind::Subtract => {
                BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Subtract))
            }
            ModuleKind::Multiply => {
                BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Multiply))
            }
            ModuleKind::Divide => {
                BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Divide))
            }
            ModuleKind::Power => BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Power)),
            ModuleKind::Gcd => BuiltinModule::Arithmetic(ArithmeticModule::new(ArithmeticOp::Gcd)),
            ModuleKind::Average => BuiltinModule::Average(AverageModule::new()),
            ModuleKind::Min | ModuleKind::Max => {
                BuiltinModule::Extremum(ExtremumModule::from_params(config.kind, &params)?)
            }
            ModuleKind::Integrate => BuiltinModule::Integrate(IntegrateModule::new()),
            ModuleKind::ConstGenerator => {
                BuiltinModule::ConstGenerator(ConstGeneratorModule::from_params(&params)?)
            }
            ModuleKind::Map => BuiltinModule::Map(MapModule::from_params(&params)?),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            BuiltinModule::Arithmetic(m) => m.name(),
            BuiltinModule::Average(m) => m.name(),
            BuiltinModule::Extremum(m) => m.name(),
            BuiltinModule::Integrate(m) => m.name(),
            BuiltinModule::ConstGenerator(m) => m.name(),
            BuiltinModule::Map(m) => m.name(),
        }
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        match self {
            BuiltinModule::Arithmetic(m) => m.ports(),
            BuiltinModule::Average(m) => m.ports(),
            BuiltinModule::Extremum(m) => m.ports(),
            BuiltinModule::Integrate(m) => m.ports(),
            BuiltinModule::ConstGenerator(m) => m.ports(),
            BuiltinModule::Map(m) => m.ports(),
        }
    }

    /// Number of samples written per run when it does not depend on input
    /// data, given the module's bindings.
    pub fn fixed_output_len(&self, inputs: &[InputBinding]) -> Option<usize> {
        match self {
            BuiltinModule::ConstGenerator(m) => m.fixed_len(inputs),
            _ => None,
        }
    }

    /// Whether a degenerate run produces the empty result
    /// instead of calling `process`. Generators ignore their inputs.
    pub fn short_circuits_empty(&self) -> bool {
        !matches!(self, BuiltinModule::ConstGenerator(_))
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        match self {
            BuiltinModule::Arithmetic(m) => m.process(ctx),
            BuiltinModule::Average(m) => m.process(ctx),
            BuiltinModule::Extremum(m) => m.process(ctx),
            BuiltinModule::Integrate(m) => m.process(ctx),
            BuiltinModule::ConstGenerator(m) => m.process(ctx),
            BuiltinModule::Map(m) => m.process(ctx),
        }
    }
}

/// Typed access to a module's parameters.
pub struct Params<'a> {
    module: &'a str,
    values: &'a std::collections::BTreeMap<String, ParamValue>,
}

impl<'a> Params<'a> {
    pub fn get(&self, key: &str) -> Option<&'a ParamValue> {
        self.values.get(key)
    }

    pub fn bool(&self, key: &str, default: bool) -> PipelineResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid(key, "expected a boolean")),
        }
    }

    pub fn f64(&self, key: &str, default: f64) -> PipelineResult<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| self.invalid(key, "expected a number")),
        }
    }

    /// Non-negative whole number.
    pub fn count(&self, key: &str, default: usize) -> PipelineResult<usize> {
        let value = self.f64(key, default as f64)?;
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return Err(self.invalid(key, "expected a non-negative integer"));
        }
        Ok(value as usize)
    }

    pub fn str(&self, key: &str) -> PipelineResult<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a string")),
        }
    }

    pub fn invalid(&self, key: &str, message: impl Into<String>) -> PipelineError {
        PipelineError::InvalidParameter {
            module: self.module.to_string(),
            param: key.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (BufferRegistry, BufferId, BufferId) {
        let mut registry = BufferRegistry::new();
        let a = registry.create("a", 10, false).unwrap();
        let b = registry.create("b", 10, false).unwrap();
        (registry, a, b)
    }

    fn resolved(name: &str, operand: Operand, from_buffer: bool) -> ResolvedInput {
        ResolvedInput {
            name: name.into(),
            operand,
            from_buffer,
        }
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let config = ModuleConfig::new("avg", ModuleKind::Average).param("window", 5i64);
        assert_eq!(
            BuiltinModule::from_config(&config).unwrap_err(),
            PipelineError::UnknownParameter {
                module: "avg".into(),
                param: "window".into()
            }
        );
    }

    #[test]
    fn test_degenerate_detection() {
        let (registry, _, _) = registry();
        let ctx = ModuleContext::new(
            "m",
            &registry,
            vec![
                resolved("a", Operand::Vector(vec![]), true),
                resolved("b", Operand::Scalar(3.0), false),
            ],
            &[],
        );
        assert!(ctx.is_degenerate());

        let ctx = ModuleContext::new(
            "m",
            &registry,
            vec![resolved("a", Operand::Scalar(1.0), true)],
            &[],
        );
        assert!(!ctx.is_degenerate());

        let ctx = ModuleContext::new(
            "m",
            &registry,
            vec![resolved("b", Operand::Scalar(3.0), false)],
            &[],
        );
        assert!(!ctx.is_degenerate());

        let ctx = ModuleContext::new("m", &registry, Vec::new(), &[]);
        assert!(ctx.is_degenerate());
    }

    #[test]
    fn test_take_input_moves_first_match() {
        let (registry, _, _) = registry();
        let mut ctx = ModuleContext::new(
            "m",
            &registry,
            vec![
                resolved("x", Operand::Scalar(1.0), false),
                resolved("x", Operand::Scalar(2.0), false),
                resolved("y", Operand::Scalar(3.0), false),
            ],
            &[],
        );
        assert_eq!(ctx.take_input("x"), Some(Operand::Scalar(1.0)));
        assert_eq!(ctx.input("x"), Some(&Operand::Scalar(2.0)));
        let rest: Vec<_> = ctx.take_all().into_iter().map(|(n, _)| n).collect();
        assert_eq!(rest, vec!["x", "y"]);
    }

    #[test]
    fn test_write_clear_and_append() {
        let (registry, a, b) = registry();
        registry.get(a).unwrap().append_all(&[9.0, 9.0]);
        registry.get(b).unwrap().append_all(&[9.0, 9.0]);

        let outputs = vec![
            OutputBinding {
                name: "out".into(),
                buffer: a,
                clear: true,
            },
            OutputBinding {
                name: "out".into(),
                buffer: b,
                clear: false,
            },
        ];
        let mut ctx = ModuleContext::new("m", &registry, Vec::new(), &outputs);
        ctx.write("out", &[1.0, 2.0], None);
        assert_eq!(ctx.into_written(), vec![a, b]);

        assert_eq!(registry.get(a).unwrap().snapshot(), vec![1.0, 2.0]);
        assert_eq!(registry.get(b).unwrap().snapshot(), vec![9.0, 9.0, 1.0, 2.0]);
    }

    #[test]
    fn test_write_empty_only_touches_clearing_outputs() {
        let (registry, a, b) = registry();
        registry.get(a).unwrap().append(1.0);
        registry.get(b).unwrap().append(1.0);

        let outputs = vec![
            OutputBinding {
                name: "out".into(),
                buffer: a,
                clear: true,
            },
            OutputBinding {
                name: "other".into(),
                buffer: b,
                clear: false,
            },
        ];
        let mut ctx = ModuleContext::new("m", &registry, Vec::new(), &outputs);
        ctx.write_empty();
        assert_eq!(ctx.into_written(), vec![a]);
        assert!(registry.get(a).unwrap().is_empty());
        assert_eq!(registry.get(b).unwrap().len(), 1);
    }
}
