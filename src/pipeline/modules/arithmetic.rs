//! ArithmeticModule: elementwise broadcasting arithmetic.
//!
//! Folds all inputs left to right with one binary operator. The operator's
//! priority input (dividend, minuend, base) seeds the fold regardless of
//! where it is declared; every other input follows in declaration order.

use crate::analysis::{align, divide, fold, gcd, prioritize};
use crate::pipeline::module::ModuleContext;
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static ADD_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("summand", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

static SUBTRACT_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("minuend", PortBinding::Any),
    PortDescriptor::input("subtrahend", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

static MULTIPLY_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("factor", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

static DIVIDE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("dividend", PortBinding::Any),
    PortDescriptor::input("divisor", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

static POWER_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("base", PortBinding::Any),
    PortDescriptor::input("exponent", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

static GCD_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("value", PortBinding::Any),
    PortDescriptor::output("out", Arity::Broadcast).required(),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Gcd,
}

impl ArithmeticOp {
    fn apply(self) -> fn(f64, f64) -> f64 {
        match self {
            ArithmeticOp::Add => |a, b| a + b,
            ArithmeticOp::Subtract => |a, b| a - b,
            ArithmeticOp::Multiply => |a, b| a * b,
            ArithmeticOp::Divide => divide,
            ArithmeticOp::Power => f64::powf,
            ArithmeticOp::Gcd => gcd,
        }
    }

    /// Input that seeds the fold.
    fn priority(self) -> Option<&'static str> {
        match self {
            ArithmeticOp::Subtract => Some("minuend"),
            ArithmeticOp::Divide => Some("dividend"),
            ArithmeticOp::Power => Some("base"),
            _ => None,
        }
    }
}

/// Variadic elementwise operator.
#[derive(Debug, Clone)]
pub struct ArithmeticModule {
    op: ArithmeticOp,
}

impl ArithmeticModule {
    pub fn new(op: ArithmeticOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> ArithmeticOp {
        self.op
    }

    pub fn name(&self) -> &str {
        match self.op {
            ArithmeticOp::Add => "Add",
            ArithmeticOp::Subtract => "Subtract",
            ArithmeticOp::Multiply => "Multiply",
            ArithmeticOp::Divide => "Divide",
            ArithmeticOp::Power => "Power",
            ArithmeticOp::Gcd => "GCD",
        }
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        match self.op {
            ArithmeticOp::Add => ADD_PORTS,
            ArithmeticOp::Subtract => SUBTRACT_PORTS,
            ArithmeticOp::Multiply => MULTIPLY_PORTS,
            ArithmeticOp::Divide => DIVIDE_PORTS,
            ArithmeticOp::Power => POWER_PORTS,
            ArithmeticOp::Gcd => GCD_PORTS,
        }
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let mut operands = prioritize(ctx.take_all(), self.op.priority());
        if align(&mut operands) == 0 {
            ctx.write_empty();
            return;
        }

        if let Some(result) = fold(operands, self.op.apply()) {
            ctx.write("out", &result.into_values(), None);
        }
    }
}
