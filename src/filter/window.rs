//! Flat-window smoothing.
//!
//! - [`moving_average`]: mean over a flat window with mirror-padded edges
//!   (SciPy cookbook `smooth(x, window_len, 'flat')`), output length equals
//!   input length.
//! - [`box_sum`]: unnormalised sum over a flat window, zero outside the
//!   signal (`scipy.ndimage.convolve1d(x, ones(w), mode='constant')`).
use crate::error::{Error, Result};

/// Moving average with mirror padding.
///
/// The signal is extended with `w - 1` mirrored samples per side
/// (`x[w-1], .., x[1]` on the left, `x[n-2], .., x[n-w]` on the right),
/// convolved with a flat kernel in `valid` mode and cropped back to `n`.
/// Windows shorter than 3 return the input unchanged.
pub fn moving_average(x: &[f64], w: usize) -> Result<Vec<f64>> {
    let n = x.len();
    if w < 3 {
        return Ok(x.to_vec());
    }
    if n < w {
        return Err(Error::TooShort {
            what: "moving average".into(),
            needed: w,
            got: n,
        });
    }

    let mut s = Vec::with_capacity(n + 2 * (w - 1));
    for i in (1..w).rev() {
        s.push(x[i]);
    }
    s.extend_from_slice(x);
    for i in 2..=w {
        s.push(x[n - i]);
    }

    // Running sum over the padded signal; `valid` output has n + w - 1 points.
    let inv = 1.0 / w as f64;
    let mut full = Vec::with_capacity(n + w - 1);
    let mut acc: f64 = s[..w].iter().sum();
    full.push(acc * inv);
    for k in w..s.len() {
        acc += s[k] - s[k - w];
        full.push(acc * inv);
    }

    let start = if w % 2 == 0 { w / 2 - 1 } else { w / 2 };
    Ok(full[start..start + n].to_vec())
}

/// Unnormalised box sum with zero padding.
///
/// For width `w` the window around sample `i` is
/// `[i - (w-1)/2, i + w - 1 - (w-1)/2]`, i.e. even widths lean one sample
/// to the right, as `convolve1d` does.
pub fn box_sum(x: &[f64], w: usize) -> Vec<f64> {
    let n = x.len();
    if w == 0 || n == 0 {
        return vec![0.0; n];
    }
    let left = (w - 1) / 2;
    let right = w - 1 - left;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in x {
        let last = *prefix.last().unwrap_or(&0.0);
        prefix.push(last + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(left);
            let hi = (i + right + 1).min(n);
            prefix[hi] - prefix[lo]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_preserves_length() {
        let x: Vec<f64> = (0..37).map(|i| i as f64).collect();
        for w in [3, 4, 10, 11] {
            assert_eq!(moving_average(&x, w).unwrap().len(), x.len(), "w={w}");
        }
    }

    #[test]
    fn moving_average_of_constant_is_constant() {
        let x = vec![2.5_f64; 50];
        for v in moving_average(&x, 10).unwrap() {
            approx::assert_abs_diff_eq!(v, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn moving_average_interior_is_window_mean() {
        // Linear ramp: an even window of 10 centred at i-0.5 averages to i-0.5.
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y = moving_average(&x, 10).unwrap();
        approx::assert_abs_diff_eq!(y[50], 49.5, epsilon = 1e-9);
    }

    #[test]
    fn moving_average_short_input_errors() {
        assert!(matches!(
            moving_average(&[1.0, 2.0], 10),
            Err(Error::TooShort { needed: 10, got: 2, .. })
        ));
        assert_eq!(moving_average(&[1.0, 2.0], 1).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn box_sum_even_window_leans_right() {
        let mut x = vec![0.0_f64; 10];
        x[5] = 1.0;
        let y = box_sum(&x, 4);
        // window [i-1, i+2] contains 5 for i in 3..=6
        assert_eq!(y, vec![0., 0., 0., 1., 1., 1., 1., 0., 0., 0.]);
    }

    #[test]
    fn box_sum_zero_pads_edges() {
        let y = box_sum(&[1.0; 5], 3);
        assert_eq!(y, vec![2.0, 3.0, 3.0, 3.0, 2.0]);
    }
}
