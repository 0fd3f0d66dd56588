//! ExtremumModule: minimum or maximum with its position.
//!
//! In the default mode the module writes the single extremum of `y` and the
//! position where it first occurs. With `multiple = true` it writes one
//! extremum per completed run on the near side of `threshold` instead.
//! Positions come from `x` when bound, else they are sample indices.

use crate::analysis::{find_extrema_per_run, find_extremum, Extremum, Operand};
use crate::buffer::Extrema;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::module::{ModuleContext, Params};
use crate::pipeline::module_kind::ModuleKind;
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static MIN_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("y", PortBinding::Buffer).required(),
    PortDescriptor::input("x", PortBinding::Buffer),
    PortDescriptor::input("threshold", PortBinding::Any),
    PortDescriptor::output("min", Arity::Single),
    PortDescriptor::output("position", Arity::Single),
];

static MIN_MULTIPLE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("y", PortBinding::Buffer).required(),
    PortDescriptor::input("x", PortBinding::Buffer),
    PortDescriptor::input("threshold", PortBinding::Any),
    PortDescriptor::output("min", Arity::Series),
    PortDescriptor::output("position", Arity::Series),
];

static MAX_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("y", PortBinding::Buffer).required(),
    PortDescriptor::input("x", PortBinding::Buffer),
    PortDescriptor::input("threshold", PortBinding::Any),
    PortDescriptor::output("max", Arity::Single),
    PortDescriptor::output("position", Arity::Single),
];

static MAX_MULTIPLE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("y", PortBinding::Buffer).required(),
    PortDescriptor::input("x", PortBinding::Buffer),
    PortDescriptor::input("threshold", PortBinding::Any),
    PortDescriptor::output("max", Arity::Series),
    PortDescriptor::output("position", Arity::Series),
];

const DEFAULT_THRESHOLD: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct ExtremumModule {
    kind: Extremum,
    multiple: bool,
}

impl ExtremumModule {
    pub fn new(kind: Extremum, multiple: bool) -> Self {
        Self { kind, multiple }
    }

    pub fn from_params(kind: ModuleKind, params: &Params) -> PipelineResult<Self> {
        let kind = match kind {
            ModuleKind::Max => Extremum::Max,
            _ => Extremum::Min,
        };
        Ok(Self::new(kind, params.bool("multiple", false)?))
    }

    pub fn name(&self) -> &str {
        match self.kind {
            Extremum::Min => "Minimum",
            Extremum::Max => "Maximum",
        }
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        match (self.kind, self.multiple) {
            (Extremum::Min, false) => MIN_PORTS,
            (Extremum::Min, true) => MIN_MULTIPLE_PORTS,
            (Extremum::Max, false) => MAX_PORTS,
            (Extremum::Max, true) => MAX_MULTIPLE_PORTS,
        }
    }

    fn value_port(&self) -> &'static str {
        match self.kind {
            Extremum::Min => "min",
            Extremum::Max => "max",
        }
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let Some(y) = ctx.take_input("y").map(Operand::into_values) else {
            return;
        };
        let x = ctx.take_input("x").map(Operand::into_values);
        let position = |index: usize| match &x {
            Some(x) => x.get(index).copied().unwrap_or(f64::NAN),
            None => index as f64,
        };

        if self.multiple {
            let threshold = ctx
                .input("threshold")
                .and_then(latest)
                .unwrap_or(DEFAULT_THRESHOLD);
            // Runs without a finite position are dropped.
            let (values, positions): (Vec<f64>, Vec<f64>) =
                find_extrema_per_run(&y, self.kind, threshold)
                    .into_iter()
                    .map(|l| (l.value, position(l.index)))
                    .filter(|(_, at)| at.is_finite())
                    .unzip();
            ctx.write(self.value_port(), &values, Extrema::of(&values));
            ctx.write("position", &positions, None);
        } else if let Some(found) = find_extremum(&y, self.kind) {
            ctx.write_value(self.value_port(), found.value);
            ctx.write_value("position", position(found.index));
        }
    }
}

/// Most recent value of an operand.
fn latest(operand: &Operand) -> Option<f64> {
    match operand {
        Operand::Scalar(v) => Some(*v),
        Operand::Vector(v) => v.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::module::BuiltinModule;
    use crate::pipeline::modules::test_support::Harness;

    fn module(kind: Extremum, multiple: bool) -> BuiltinModule {
        BuiltinModule::Extremum(ExtremumModule::new(kind, multiple))
    }

    #[test]
    fn test_single_max_with_index_position() {
        let harness = Harness::new(&[("max", 1), ("position", 1)]);
        harness.run(
            &mut module(Extremum::Max, false),
            vec![("y", Operand::Vector(vec![1.0, 7.0, f64::NAN, 7.0, 2.0]))],
        );
        assert_eq!(harness.values("max"), vec![7.0]);
        assert_eq!(harness.values("position"), vec![1.0]);
    }

    #[test]
    fn test_single_min_uses_x_positions() {
        let harness = Harness::new(&[("min", 1), ("position", 1)]);
        harness.run(
            &mut module(Extremum::Min, false),
            vec![
                ("y", Operand::Vector(vec![3.0, -1.0, 2.0])),
                ("x", Operand::Vector(vec![0.0, 0.5, 1.0])),
            ],
        );
        assert_eq!(harness.values("min"), vec![-1.0]);
        assert_eq!(harness.values("position"), vec![0.5]);
    }

    #[test]
    fn test_multiple_minima_below_threshold() {
        let harness = Harness::new(&[("min", 10), ("position", 10)]);
        harness.run(
            &mut module(Extremum::Min, true),
            vec![
                ("y", Operand::Vector(vec![5.0, 1.0, 3.0, 6.0, 0.0, 2.0, 7.0, -4.0])),
                ("threshold", Operand::Scalar(4.0)),
            ],
        );
        // The run starting at -4.0 never closes.
        assert_eq!(harness.values("min"), vec![1.0, 0.0]);
        assert_eq!(harness.values("position"), vec![1.0, 4.0]);
    }

    #[test]
    fn test_multiple_skips_runs_without_finite_position() {
        let harness = Harness::new(&[("max", 10), ("position", 10)]);
        harness.run(
            &mut module(Extremum::Max, true),
            vec![
                ("y", Operand::Vector(vec![2.0, -1.0, 3.0, -1.0, 4.0, -1.0])),
                ("x", Operand::Vector(vec![0.0, 0.1, f64::NAN, 0.3])),
                ("threshold", Operand::Scalar(0.0)),
            ],
        );
        // The 3.0 run sits at a NaN position and the 4.0 run closes past
        // the end of x.
        assert_eq!(harness.values("max"), vec![2.0]);
        assert_eq!(harness.values("position"), vec![0.0]);
    }

    #[test]
    fn test_multiple_threshold_from_latest_buffer_value() {
        let harness = Harness::new(&[("max", 10)]);
        harness.run(
            &mut module(Extremum::Max, true),
            vec![
                ("y", Operand::Vector(vec![2.0, 3.0, 0.0, 4.0, 0.0])),
                ("threshold", Operand::Vector(vec![100.0, 1.0])),
            ],
        );
        assert_eq!(harness.values("max"), vec![3.0, 4.0]);
    }

    #[test]
    fn test_multiple_param() {
        use crate::config::ModuleConfig;
        let config = ModuleConfig::new("m", ModuleKind::Max).param("multiple", true);
        let built = BuiltinModule::from_config(&config).unwrap();
        assert!(built
            .ports()
            .iter()
            .filter(|p| p.is_output())
            .all(|p| p.arity == Arity::Series));

        let config = ModuleConfig::new("m", ModuleKind::Max).param("multiple", 3i64);
        assert!(BuiltinModule::from_config(&config).is_err());
    }
}
