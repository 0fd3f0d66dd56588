//! Reductions over a single series.
//!
//! All reductions skip non-finite samples while accumulating.

use serde::{Deserialize, Serialize};

/// Mean and sample standard deviation of the finite values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanStd {
    pub mean: f64,
    /// `NaN` with fewer than two finite samples.
    pub std: f64,
    pub count: usize,
}

pub fn mean_std(values: &[f64]) -> Option<MeanStd> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return None;
    }

    let mean = sum / count as f64;
    let std = if count < 2 {
        f64::NAN
    } else {
        let squares: f64 = values
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| (v - mean) * (v - mean))
            .sum();
        (squares / (count - 1) as f64).sqrt()
    };

    Some(MeanStd { mean, std, count })
}

/// Which end of the range an extremum search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extremum {
    Min,
    Max,
}

impl Extremum {
    /// True when `candidate` beats `current` in this direction.
    #[inline]
    fn beats(self, candidate: f64, current: f64) -> bool {
        match self {
            Extremum::Min => candidate < current,
            Extremum::Max => candidate > current,
        }
    }

    /// True when `value` lies on the far side of `threshold`, ending a run.
    #[inline]
    fn crosses(self, value: f64, threshold: f64) -> bool {
        match self {
            Extremum::Min => value > threshold,
            Extremum::Max => value < threshold,
        }
    }

    fn worst(self) -> f64 {
        match self {
            Extremum::Min => f64::INFINITY,
            Extremum::Max => f64::NEG_INFINITY,
        }
    }
}

/// One located extremum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    pub value: f64,
    pub index: usize,
}

/// Extremum of the finite values and the index of its first occurrence.
pub fn find_extremum(values: &[f64], kind: Extremum) -> Option<Located> {
    let mut best: Option<Located> = None;
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        match best {
            Some(b) if !kind.beats(value, b.value) => {}
            _ => best = Some(Located { value, index }),
        }
    }
    best
}

/// One extremum per completed run on the near side of `threshold`.
///
/// A run ends at the first finite sample strictly beyond the threshold
/// (`> threshold` for minima, `< threshold` for maxima). A run still open
/// at the end of the input is not reported.
pub fn find_extrema_per_run(values: &[f64], kind: Extremum, threshold: f64) -> Vec<Located> {
    let mut found = Vec::new();
    let mut current: Option<Located> = None;

    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        if kind.crosses(value, threshold) {
            if let Some(done) = current.take() {
                found.push(done);
            }
        } else if kind.beats(value, current.map_or(kind.worst(), |c| c.value)) {
            current = Some(Located { value, index });
        }
    }

    found
}
