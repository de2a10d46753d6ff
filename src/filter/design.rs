//! Butterworth IIR low-pass design matching `scipy.signal.butter(N, Wn,
//! btype='low')`.
//!
//! The analog prototype is mapped with the bilinear transform after
//! pre-warping the cutoff:
//!   K = tan(π · cutoff / sfreq)
//!
//! Order 2:
//!   b = [K², 2K², K²] / (1 + √2·K + K²)
//!   a = [1, 2(K² − 1), 1 − √2·K + K²] / (1 + √2·K + K²)
use std::f64::consts::{PI, SQRT_2};

use crate::error::{Error, Result};

/// Transfer-function coefficients `b` (numerator) and `a` (denominator),
/// normalised so that `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct IirCoefficients {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl IirCoefficients {
    /// Number of taps of the longer polynomial.
    pub fn len(&self) -> usize {
        self.a.len().max(self.b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gain at DC, `sum(b) / sum(a)`.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

/// Design a Butterworth low-pass of order 1 or 2.
///
/// `cutoff` and `sfreq` are in Hz; the cutoff must lie strictly between 0
/// and Nyquist.
pub fn butter_lowpass(order: usize, cutoff: f64, sfreq: f64) -> Result<IirCoefficients> {
    let nyquist = sfreq / 2.0;
    if !(cutoff > 0.0 && cutoff < nyquist) {
        return Err(Error::InvalidParameter(format!(
            "low-pass cutoff {cutoff} Hz must lie in (0, {nyquist}) Hz"
        )));
    }

    let k = (PI * cutoff / sfreq).tan();
    match order {
        1 => {
            let norm = 1.0 + k;
            Ok(IirCoefficients {
                b: vec![k / norm, k / norm],
                a: vec![1.0, (k - 1.0) / norm],
            })
        }
        2 => {
            let k2 = k * k;
            let norm = 1.0 + SQRT_2 * k + k2;
            let b0 = k2 / norm;
            Ok(IirCoefficients {
                b: vec![b0, 2.0 * b0, b0],
                a: vec![1.0, 2.0 * (k2 - 1.0) / norm, (1.0 - SQRT_2 * k + k2) / norm],
            })
        }
        _ => Err(Error::InvalidParameter(format!(
            "Butterworth order {order} not supported (1 or 2)"
        ))),
    }
}
