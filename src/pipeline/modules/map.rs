//! MapModule: elementwise unary function.

use crate::analysis::{map_tracked, MapFunction, Operand};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::module::{ModuleContext, Params};
use crate::pipeline::port::{Arity, PortBinding, PortDescriptor};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortBinding::Any).required(),
    PortDescriptor::output("out", Arity::Series).required().clearing(),
];

#[derive(Debug, Clone)]
pub struct MapModule {
    function: MapFunction,
}

impl MapModule {
    pub fn new(function: MapFunction) -> Self {
        Self { function }
    }

    pub fn from_params(params: &Params) -> PipelineResult<Self> {
        let name = params
            .str("function")?
            .ok_or_else(|| params.invalid("function", "a function name is required"))?;
        let function = MapFunction::parse(name)
            .ok_or_else(|| params.invalid("function", format!("unknown function '{name}'")))?;
        Ok(Self::new(function))
    }

    pub fn function(&self) -> MapFunction {
        self.function
    }

    pub fn name(&self) -> &str {
        "Map"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    pub fn process(&mut self, ctx: &mut ModuleContext) {
        let Some(values) = ctx.take_input("in").map(Operand::into_values) else {
            return;
        };
        let mapped = map_tracked(&values, self.function);
        ctx.write("out", &mapped.values, mapped.extrema);
    }
}
