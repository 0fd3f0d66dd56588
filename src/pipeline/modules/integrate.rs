//! IntegrateModule: running sum of the input.

use crate::analysis::{prefix_sum, Operand};
use crate::pipeline::module::ModuleContext;
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortBinding::Buffer).required(),
    PortDescriptor::output("out", Arity::Series).required().clearing(),
];

/// Element `i` of the output is the sum of input elements `0..=i`.
///
/// The whole series is recomputed on every run, so the output is always
/// clear-written together with the extrema of the sums.
#[derive(Debug, Clone, Default)]
pub struct IntegrateModule;

impl IntegrateModule {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "Integrate"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let Some(values) = ctx.take_input("in").map(Operand::into_values) else {
            return;
        };
        let sums = prefix_sum(&values);
        ctx.write("out", &sums.values, sums.extrema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Extrema;
    use crate::pipeline::module::BuiltinModule;
    use crate::pipeline::modules::test_support::Harness;

    #[test]
    fn test_integrate_ones() {
        let harness = Harness::new(&[("out", 10)]);
        harness.run(
            &mut BuiltinModule::Integrate(IntegrateModule::new()),
            vec![("in", Operand::Vector(vec![1.0, 1.0, 1.0, 1.0]))],
        );
        assert_eq!(harness.values("out"), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rerun_replaces_and_resets_extrema() {
        let harness = Harness::new(&[("out", 10)]);
        let mut module = BuiltinModule::Integrate(IntegrateModule::new());
        harness.run(&mut module, vec![("in", Operand::Vector(vec![5.0, 5.0]))]);
        harness.run(&mut module, vec![("in", Operand::Vector(vec![-1.0, 3.0]))]);

        let out = harness.registry.by_name("out").unwrap();
        assert_eq!(out.snapshot(), vec![-1.0, 2.0]);
        assert_eq!(out.extrema(), Some(Extrema { min: -1.0, max: 2.0 }));
    }
}
