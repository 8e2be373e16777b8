//! First-order Butterworth low-pass filter, applied causally.
//!
//! Digital design by bilinear transform with cutoff `ratio` as a fraction of
//! Nyquist: k = tan(pi * ratio / 2), b0 = b1 = k / (1 + k), a1 = (k - 1) / (1 + k).
//! y[n] = b0 * x[n] + b1 * x[n-1] - a1 * y[n-1], starting from zero state,
//! so early outputs carry the start-up transient.

use std::f64::consts::PI;

/// Filter coefficients `(b0, b1, a1)`.
pub fn butterworth_coefficients(ratio: f64) -> (f64, f64, f64) {
    let k = (PI * ratio / 2.0).tan();
    let b = k / (1.0 + k);
    (b, b, (k - 1.0) / (1.0 + k))
}

pub fn lowpass_filter(values: &[f64], ratio: f64) -> Vec<f64> {
    let (b0, b1, a1) = butterworth_coefficients(ratio);
    let mut out = Vec::with_capacity(values.len());
    let mut prev_x = 0.0;
    let mut prev_y = 0.0;
    for &x in values {
        let y = b0 * x + b1 * prev_x - a1 * prev_y;
        out.push(y);
        prev_x = x;
        prev_y = y;
    }
    out
}
