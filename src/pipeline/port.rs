//! Port descriptors for analysis modules.
//!
//! Each module declares its inputs and outputs via static `PortDescriptor`
//! arrays. The compiler uses these to validate bindings from an experiment
//! definition before anything runs.

/// What an input port may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortBinding {
    /// Buffer contents only. A fixed value is a configuration error.
    Buffer,
    /// Fixed values only. A buffer binding is ignored with a warning.
    Value,
    /// Either a buffer or a fixed value.
    Any,
}

/// How many samples an output produces per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value.
    Single,
    /// One value per sample of the primary input, or a configured length.
    Series,
    /// The aligned length of all inputs.
    Broadcast,
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for a module's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub required: bool,
    pub binding: PortBinding,
    pub arity: Arity,
    /// Output always replaces the buffer contents, whatever the binding says.
    pub always_clear: bool,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, binding: PortBinding) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            required: false,
            binding,
            arity: Arity::Single,
            always_clear: false,
        }
    }

    pub const fn output(name: &'static str, arity: Arity) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            required: false,
            binding: PortBinding::Buffer,
            arity,
            always_clear: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn clearing(mut self) -> Self {
        self.always_clear = true;
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// Find a port by direction and name.
pub fn find_port<'a>(
    ports: &'a [PortDescriptor],
    direction: PortDirection,
    name: &str,
) -> Option<&'a PortDescriptor> {
    ports
        .iter()
        .find(|p| p.direction == direction && p.name == name)
}
