//! ConstGeneratorModule: constant fill.
//!
//! `value` and `length` come from parameters or from fixed-value inputs of
//! the same name; an input wins over a parameter. A length of zero fills the
//! output buffer to its capacity.

use crate::analysis::Operand;
use crate::buffer::Extrema;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::module::{BoundSource, InputBinding, ModuleContext, Params};
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("value", PortBinding::Value),
    PortDescriptor::input("length", PortBinding::Value),
    PortDescriptor::output("out", Arity::Series).required().clearing(),
];

#[derive(Debug, Clone)]
pub struct ConstGeneratorModule {
    value: f64,
    length: usize,
}

impl ConstGeneratorModule {
    pub fn new(value: f64, length: usize) -> Self {
        Self { value, length }
    }

    pub fn from_params(params: &Params) -> PipelineResult<Self> {
        Ok(Self::new(params.f64("value", 0.0)?, params.count("length", 0)?))
    }

    pub fn name(&self) -> &str {
        "Constant"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    /// Configured length, `None` when the output capacity decides.
    pub fn fixed_len(&self, inputs: &[InputBinding]) -> Option<usize> {
        let length = inputs
            .iter()
            .find(|i| i.name == "length")
            .and_then(|i| match i.source {
                BoundSource::Value(v) => Some(to_length(v)),
                BoundSource::Buffer(_) => None,
            })
            .unwrap_or(self.length);
        (length > 0).then_some(length)
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let value = ctx.input("value").map(scalar).unwrap_or(self.value);
        let length = ctx
            .input("length")
            .map(|l| to_length(scalar(l)))
            .unwrap_or(self.length);
        let length = if length == 0 {
            ctx.output_capacity("out").unwrap_or(0)
        } else {
            length
        };

        let values = vec![value; length];
        ctx.write("out", &values, Extrema::of(&values));
    }
}

fn scalar(operand: &Operand) -> f64 {
    match operand {
        Operand::Scalar(v) => *v,
        Operand::Vector(v) => v.first().copied().unwrap_or(f64::NAN),
    }
}

/// Whole, non-negative sample count; anything else counts as zero.
fn to_length(v: f64) -> usize {
    if v.is_finite() && v > 0.0 {
        v as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::pipeline::module::BuiltinModule;
    use crate::pipeline::modules::test_support::Harness;
    use crate::pipeline::ModuleKind;

    #[test]
    fn test_fill_to_capacity() {
        let harness = Harness::new(&[("out", 4)]);
        harness.run(
            &mut BuiltinModule::ConstGenerator(ConstGeneratorModule::new(2.5, 0)),
            Vec::new(),
        );
        assert_eq!(harness.values("out"), vec![2.5; 4]);
    }

    #[test]
    fn test_fixed_inputs_override_params() {
        let harness = Harness::new(&[("out", 10)]);
        harness.run(
            &mut BuiltinModule::ConstGenerator(ConstGeneratorModule::new(1.0, 5)),
            vec![
                ("value", Operand::Scalar(-3.0)),
                ("length", Operand::Scalar(2.0)),
            ],
        );
        assert_eq!(harness.values("out"), vec![-3.0, -3.0]);
    }

    #[test]
    fn test_params_parsed() {
        let config = ModuleConfig::new("c", ModuleKind::ConstGenerator)
            .param("value", 4i64)
            .param("length", 3i64);
        let built = BuiltinModule::from_config(&config).unwrap();
        assert_eq!(built.fixed_output_len(&[]), Some(3));

        let config = ModuleConfig::new("c", ModuleKind::ConstGenerator).param("length", -1i64);
        assert!(BuiltinModule::from_config(&config).is_err());

        let config = ModuleConfig::new("c", ModuleKind::ConstGenerator).param("length", 1.5);
        assert!(BuiltinModule::from_config(&config).is_err());
    }

    #[test]
    fn test_fixed_len_prefers_bound_value() {
        let module = ConstGeneratorModule::new(0.0, 3);
        let inputs = vec![InputBinding {
            name: "length".into(),
            source: BoundSource::Value(0.0),
        }];
        assert_eq!(module.fixed_len(&inputs), None);
        assert_eq!(module.fixed_len(&[]), Some(3));
    }
}
