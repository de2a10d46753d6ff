//! Zero-phase IIR filtering.
//!
//! Matches `scipy.signal.filtfilt(b, a, x)` with its defaults:
//! `padtype='odd'`, `padlen = 3 * max(len(a), len(b))`, and initial
//! conditions from `lfilter_zi` scaled by the first sample of each pass.
//!
//! Running the filter forward then backward squares the magnitude response
//! and cancels the phase, so filtered transients stay aligned with
//! behavioral timestamps.
use ndarray::Array1;

use super::design::IirCoefficients;

/// Apply `coeffs` forward and backward to `x`. Output length equals input
/// length.
///
/// Signals no longer than the default pad length are padded by `len - 1`
/// samples instead of failing.
pub fn filtfilt(x: &[f64], coeffs: &IirCoefficients) -> Vec<f64> {
    let n_x = x.len();
    if n_x < 2 {
        return x.to_vec();
    }

    let padlen = (3 * coeffs.len()).min(n_x - 1);
    let ext = odd_pad(x, padlen);
    let zi = lfilter_zi(coeffs);

    // Forward pass.
    let z0: Vec<f64> = zi.iter().map(|&z| z * ext[0]).collect();
    let mut y = lfilter(coeffs, &ext, &z0);

    // Backward pass.
    y.reverse();
    let z0: Vec<f64> = zi.iter().map(|&z| z * y[0]).collect();
    let mut y = lfilter(coeffs, &y, &z0);
    y.reverse();

    y[padlen..padlen + n_x].to_vec()
}

/// Filter an owned channel column.
pub fn filtfilt_array(x: &Array1<f64>, coeffs: &IirCoefficients) -> Array1<f64> {
    let v = x.to_vec();
    Array1::from(filtfilt(&v, coeffs))
}

/// Direct-form II transposed IIR filter with initial state `zi`
/// (`len(zi) == order`).
pub fn lfilter(coeffs: &IirCoefficients, x: &[f64], zi: &[f64]) -> Vec<f64> {
    let n = coeffs.len();
    let b = padded(&coeffs.b, n);
    let a = padded(&coeffs.a, n);
    let a0 = a[0];

    let mut z = zi.to_vec();
    z.resize(n - 1, 0.0);

    let mut out = Vec::with_capacity(x.len());
    for &xi in x {
        let yi = (b[0] * xi + z.first().copied().unwrap_or(0.0)) / a0;
        for k in 0..n - 1 {
            let next = if k + 1 < n - 1 { z[k + 1] } else { 0.0 };
            z[k] = (b[k + 1] * xi - a[k + 1] * yi) / a0 + next;
        }
        out.push(yi);
    }
    out
}

/// Steady-state initial conditions for a unit step, as
/// `scipy.signal.lfilter_zi`.
///
/// Solves `(I - A^T) zi = B` using the companion-matrix structure:
///   zi[0] = sum(B) / (1 + sum(a[1..]))
///   zi[k] = (1 + a[1] + .. + a[k]) · zi[0] − Σ_{j=1..k} (b[j] − a[j]·b[0])
pub fn lfilter_zi(coeffs: &IirCoefficients) -> Vec<f64> {
    let n = coeffs.len();
    if n < 2 {
        return vec![];
    }
    let a0 = coeffs.a[0];
    let b: Vec<f64> = padded(&coeffs.b, n).iter().map(|v| v / a0).collect();
    let a: Vec<f64> = padded(&coeffs.a, n).iter().map(|v| v / a0).collect();

    let rhs: Vec<f64> = (1..n).map(|k| b[k] - a[k] * b[0]).collect();
    let denom: f64 = 1.0 + a[1..].iter().sum::<f64>();

    let mut zi = vec![0.0; n - 1];
    zi[0] = rhs.iter().sum::<f64>() / denom;

    let mut asum = 1.0;
    let mut csum = 0.0;
    for k in 1..n - 1 {
        asum += a[k];
        csum += rhs[k - 1];
        zi[k] = asum * zi[0] - csum;
    }
    zi
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn padded(v: &[f64], n: usize) -> Vec<f64> {
    let mut out = v.to_vec();
    out.resize(n, 0.0);
    out
}

/// Odd extension by `pad` samples on each side (scipy `odd_ext`).
///
/// Left:  `2*x[0] - x[i]`      for i in pad..=1
/// Right: `2*x[-1] - x[-1-i]`  for i in 1..=pad
pub(crate) fn odd_pad(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = Vec::with_capacity(n + 2 * pad);

    for i in (1..=pad).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[n - 1];
    for i in 1..=pad {
        out.push(2.0 * last - x[n - 1 - i]);
    }
    out
}
