//! Prefix scans and elementwise maps that rewrite a whole series.
//!
//! Both track the extrema of what they produce in the same pass, so the
//! output buffer can take them without rescanning.

use crate::buffer::Extrema;
use serde::{Deserialize, Serialize};

/// A series together with the extrema of its values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub values: Vec<f64>,
    pub extrema: Option<Extrema>,
}

/// Running sum: element `i` is the sum of inputs `0..=i`.
pub fn prefix_sum(values: &[f64]) -> Tracked {
    let mut sum = 0.0;
    let mut extrema = None;
    let out = values
        .iter()
        .map(|v| {
            sum += v;
            Extrema::include(&mut extrema, sum);
            sum
        })
        .collect();
    Tracked {
        values: out,
        extrema,
    }
}

/// Unary functions applied sample by sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapFunction {
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Round,
    Floor,
    Ceil,
    Negate,
}

impl MapFunction {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => MapFunction::Abs,
            "sqrt" => MapFunction::Sqrt,
            "sin" => MapFunction::Sin,
            "cos" => MapFunction::Cos,
            "tan" => MapFunction::Tan,
            "exp" => MapFunction::Exp,
            "ln" | "log" => MapFunction::Ln,
            "round" => MapFunction::Round,
            "floor" => MapFunction::Floor,
            "ceil" => MapFunction::Ceil,
            "negate" => MapFunction::Negate,
            _ => return None,
        })
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            MapFunction::Abs => x.abs(),
            MapFunction::Sqrt => x.sqrt(),
            MapFunction::Sin => x.sin(),
            MapFunction::Cos => x.cos(),
            MapFunction::Tan => x.tan(),
            MapFunction::Exp => x.exp(),
            MapFunction::Ln => x.ln(),
            MapFunction::Round => x.round(),
            MapFunction::Floor => x.floor(),
            MapFunction::Ceil => x.ceil(),
            MapFunction::Negate => -x,
        }
    }
}

pub fn map_tracked(values: &[f64], function: MapFunction) -> Tracked {
    let mut extrema = None;
    let out = values
        .iter()
        .map(|&v| {
            let y = function.apply(v);
            Extrema::include(&mut extrema, y);
            y
        })
        .collect();
    Tracked {
        values: out,
        extrema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_sum() {
        let t = prefix_sum(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(t.values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.extrema, Some(Extrema { min: 1.0, max: 4.0 }));
    }

    #[test]
    fn test_prefix_sum_tracks_dip() {
        let t = prefix_sum(&[2.0, -5.0, 1.0]);
        assert_eq!(t.values, vec![2.0, -3.0, -2.0]);
        assert_eq!(t.extrema, Some(Extrema { min: -3.0, max: 2.0 }));
    }

    #[test]
    fn test_prefix_sum_empty() {
        let t = prefix_sum(&[]);
        assert!(t.values.is_empty());
        assert_eq!(t.extrema, None);
    }

    #[test]
    fn test_map_functions() {
        assert_eq!(MapFunction::parse("abs"), Some(MapFunction::Abs));
        assert_eq!(MapFunction::parse("log"), Some(MapFunction::Ln));
        assert_eq!(MapFunction::parse("cbrt"), None);

        let t = map_tracked(&[-4.0, 9.0], MapFunction::Abs);
        assert_eq!(t.values, vec![4.0, 9.0]);
        assert_eq!(t.extrema, Some(Extrema { min: 4.0, max: 9.0 }));

        let t = map_tracked(&[-1.0, 4.0], MapFunction::Sqrt);
        assert!(t.values[0].is_nan());
        assert_eq!(t.extrema, Some(Extrema { min: 2.0, max: 2.0 }));
    }
}
