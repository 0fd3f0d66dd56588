//! AverageModule: mean and sample standard deviation.

use crate::analysis::mean_std;
use crate::analysis::Operand;
use crate::pipeline::module::ModuleContext;
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortBinding::Buffer).required(),
    PortDescriptor::output("average", Arity::Single),
    PortDescriptor::output("std", Arity::Single),
];

/// Writes one mean and one standard deviation per run.
///
/// Non-finite samples are skipped. Nothing is written when the input holds
/// no finite sample at all.
#[derive(Debug, Clone, Default)]
pub struct AverageModule;

impl AverageModule {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "Average"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let Some(values) = ctx.take_input("in").map(Operand::into_values) else {
            return;
        };
        let Some(result) = mean_std(&values) else {
            tracing::trace!("{}: no finite samples to average", ctx.module());
            return;
        };

        ctx.write_value("average", result.mean);
        ctx.write_value("std", result.std);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::module::BuiltinModule;
    use crate::pipeline::modules::test_support::Harness;

    #[test]
    fn test_average_ignores_nan() {
        let harness = Harness::new(&[("average", 1), ("std", 1)]);
        harness.run(
            &mut BuiltinModule::Average(AverageModule::new()),
            vec![("in", Operand::Vector(vec![1.0, 2.0, f64::NAN, 3.0]))],
        );
        assert_eq!(harness.values("average"), vec![2.0]);
        assert_eq!(harness.values("std"), vec![1.0]);
    }

    #[test]
    fn test_no_finite_values_writes_nothing() {
        let harness = Harness::new(&[("average", 1)]);
        let written = harness.run(
            &mut BuiltinModule::Average(AverageModule::new()),
            vec![("in", Operand::Vector(vec![f64::NAN, f64::INFINITY]))],
        );
        assert!(written.is_empty());
        assert!(harness.values("average").is_empty());
    }

    #[test]
    fn test_appending_average_keeps_history() {
        let harness = Harness::with_clear(&[("average", 10)], false);
        let mut module = BuiltinModule::Average(AverageModule::new());
        harness.run(&mut module, vec![("in", Operand::Vector(vec![1.0, 3.0]))]);
        harness.run(&mut module, vec![("in", Operand::Vector(vec![5.0, 7.0]))]);
        assert_eq!(harness.values("average"), vec![2.0, 6.0]);
    }
}
