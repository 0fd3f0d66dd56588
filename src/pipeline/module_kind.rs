//! Module kind enumeration.
//!
//! The operator set is closed: every kind an experiment definition may name
//! is listed here and maps onto one built-in module.

use serde::{Deserialize, Serialize};

/// Operators that can be instantiated from an experiment definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    // Elementwise arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Gcd,

    // Reductions
    Average,
    Min,
    Max,

    // Scans and maps
    Integrate,
    Map,

    // Generators
    ConstGenerator,
}

impl ModuleKind {
    /// Get the display name for this module kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleKind::Add => "Add",
            ModuleKind::Subtract => "Subtract",
            ModuleKind::Multiply => "Multiply",
            ModuleKind::Divide => "Divide",
            ModuleKind::Power => "Power",
            ModuleKind::Gcd => "GCD",
            ModuleKind::Average => "Average",
            ModuleKind::Min => "Minimum",
            ModuleKind::Max => "Maximum",
            ModuleKind::Integrate => "Integrate",
            ModuleKind::Map => "Map",
            ModuleKind::ConstGenerator => "Constant",
        }
    }

    /// Get all available module kinds.
    pub fn all() -> &'static [ModuleKind] {
        &[
            ModuleKind::Add,
            ModuleKind::Subtract,
            ModuleKind::Multiply,
            ModuleKind::Divide,
            ModuleKind::Power,
            ModuleKind::Gcd,
            ModuleKind::Average,
            ModuleKind::Min,
            ModuleKind::Max,
            ModuleKind::Integrate,
            ModuleKind::Map,
            ModuleKind::ConstGenerator,
        ]
    }

    /// Parameters this kind understands. Anything else is rejected.
    pub fn known_params(&self) -> &'static [&'static str] {
        match self {
            ModuleKind::Min | ModuleKind::Max => &["multiple"],
            ModuleKind::Map => &["function"],
            ModuleKind::ConstGenerator => &["value", "length"],
            _ => &[],
        }
    }

    /// Get a short description of what this module does.
    pub fn description(&self) -> &'static str {
        match self {
            ModuleKind::Add => "Sums all inputs elementwise.",
            ModuleKind::Subtract => "Subtracts every subtrahend from the minuend.",
            ModuleKind::Multiply => "Multiplies all inputs elementwise.",
            ModuleKind::Divide => "Divides the dividend by every divisor.",
            ModuleKind::Power => "Raises the base to each exponent in turn.",
            ModuleKind::Gcd => {
                "Greatest common divisor of the integer parts of all inputs."
            }
            ModuleKind::Average => {
                "Mean and sample standard deviation of the finite input values."
            }
            ModuleKind::Min => {
                "Smallest value and its position.\n\
                 With `multiple`, one minimum per run below the threshold."
            }
            ModuleKind::Max => {
                "Largest value and its position.\n\
                 With `multiple`, one maximum per run above the threshold."
            }
            ModuleKind::Integrate => "Running sum of the input.",
            ModuleKind::Map => "Applies a unary function to every sample.",
            ModuleKind::ConstGenerator => {
                "Fills the output with a constant.\n\
                 A length of zero fills the whole buffer."
            }
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names() {
        let kind: ModuleKind = serde_json::from_str("\"const_generator\"").unwrap();
        assert_eq!(kind, ModuleKind::ConstGenerator);
        assert_eq!(serde_json::to_string(&ModuleKind::Gcd).unwrap(), "\"gcd\"");
    }

    #[test]
    fn test_all_is_complete() {
        assert_eq!(ModuleKind::all().len(), 12);
    }
}
