//! Elementwise broadcasting arithmetic shared by the arithmetic operators.
//!
//! | a      | b      | result                         |
//! |--------|--------|--------------------------------|
//! | scalar | scalar | scalar `op(a, b)`              |
//! | scalar | vector | vector `op(a, b[i])`           |
//! | vector | scalar | vector `op(a[i], b)`           |
//! | vector | vector | vector `op(a[i], b[i])`        |
//!
//! Vectors of different length are aligned first: the shorter one is padded
//! with its own last element (or `0.0` when empty). A scalar combined with an
//! empty vector yields an empty vector, since a scalar carries no count.

use super::operand::Operand;

/// Combine two operands elementwise.
pub fn combine<F>(a: Operand, b: Operand, op: F) -> Operand
where
    F: Fn(f64, f64) -> f64,
{
    match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Operand::Scalar(op(x, y)),
        (Operand::Scalar(x), Operand::Vector(ys)) => {
            Operand::Vector(ys.into_iter().map(|y| op(x, y)).collect())
        }
        (Operand::Vector(xs), Operand::Scalar(y)) => {
            Operand::Vector(xs.into_iter().map(|x| op(x, y)).collect())
        }
        (Operand::Vector(xs), Operand::Vector(ys)) => {
            let mut a = Operand::Vector(xs);
            let mut b = Operand::Vector(ys);
            let len = a.len().max(b.len());
            a.pad_to(len);
            b.pad_to(len);
            Operand::Vector((0..len).map(|i| op(a.at(i), b.at(i))).collect())
        }
    }
}

/// Pad every vector operand to the longest operand in the set.
///
/// Returns the aligned length; `0` means the set is degenerate.
pub fn align(operands: &mut [Operand]) -> usize {
    let len = operands.iter().map(Operand::len).max().unwrap_or(0);
    for operand in operands.iter_mut() {
        operand.pad_to(len);
    }
    len
}

/// Left fold over operands already arranged with the priority input first.
///
/// Returns `None` for an empty set.
pub fn fold<I, F>(operands: I, op: F) -> Option<Operand>
where
    I: IntoIterator<Item = Operand>,
    F: Fn(f64, f64) -> f64,
{
    let mut iter = operands.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| combine(acc, next, &op)))
}

/// Move operands whose name equals `priority` to the front, keeping the
/// relative order of everything else.
pub fn prioritize<T>(named: Vec<(String, T)>, priority: Option<&str>) -> Vec<T> {
    let Some(priority) = priority else {
        return named.into_iter().map(|(_, v)| v).collect();
    };
    let (mut first, rest): (Vec<_>, Vec<_>) =
        named.into_iter().partition(|(name, _)| name == priority);
    first.extend(rest);
    first.into_iter().map(|(_, v)| v).collect()
}

// ── Elementwise operators ──

/// Plain floating division; division by zero yields ±inf or NaN.
#[inline]
pub fn divide(a: f64, b: f64) -> f64 {
    a / b
}

/// Greatest common divisor of the integer parts of `|a|` and `|b|`.
///
/// NaN when either operand is not finite.
#[inline]
pub fn gcd(a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    gcd_u64(a.abs() as u64, b.abs() as u64) as f64
}

/// Iterative binary GCD.
pub fn gcd_u64(mut u: u64, mut v: u64) -> u64 {
    if u == 0 {
        return v;
    }
    if v == 0 {
        return u;
    }

    // Common factors of two.
    let shift = (u | v).trailing_zeros();
    u >>= u.trailing_zeros();

    loop {
        v >>= v.trailing_zeros();
        if u > v {
            std::mem::swap(&mut u, &mut v);
        }
        v -= u;
        if v == 0 {
            break;
        }
    }

    u << shift
}
