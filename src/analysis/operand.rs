//! Operands of elementwise arithmetic.

/// A value taking part in one evaluation: a single number or a series.
///
/// Constructed per evaluation from a buffer snapshot or a fixed value and
/// never stored. A one-element series is always represented as `Scalar`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Operand {
    /// Build from buffer contents, normalizing a single element to `Scalar`.
    pub fn from_values(values: Vec<f64>) -> Self {
        if values.len() == 1 {
            Operand::Scalar(values[0])
        } else {
            Operand::Vector(values)
        }
    }

    /// Number of samples this operand contributes (a scalar counts as one).
    pub fn len(&self) -> usize {
        match self {
            Operand::Scalar(_) => 1,
            Operand::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Operand::Vector(v) if v.is_empty())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Operand::Scalar(_))
    }

    /// Right-pad a vector to `len` by repeating its last element, or `0.0`
    /// when it is empty. Scalars and long-enough vectors are unchanged.
    pub fn pad_to(&mut self, len: usize) {
        if let Operand::Vector(v) = self {
            if v.len() < len {
                let fill = v.last().copied().unwrap_or(0.0);
                v.resize(len, fill);
            }
        }
    }

    /// The samples to write to an output buffer.
    pub fn into_values(self) -> Vec<f64> {
        match self {
            Operand::Scalar(s) => vec![s],
            Operand::Vector(v) => v,
        }
    }

    /// Element `i` under broadcasting: a scalar answers every index.
    #[inline]
    pub(crate) fn at(&self, i: usize) -> f64 {
        match self {
            Operand::Scalar(s) => *s,
            Operand::Vector(v) => v[i],
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

impl From<Vec<f64>> for Operand {
    fn from(values: Vec<f64>) -> Self {
        Operand::from_values(values)
    }
}
