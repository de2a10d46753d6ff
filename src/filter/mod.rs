//! Filter design and application.
//!
//! - [`design`]: Butterworth low-pass design, matching
//!   `scipy.signal.butter(N, Wn, btype='low')`.
//! - [`apply`]: forward-backward zero-phase filtering, matching
//!   `scipy.signal.filtfilt`.
//! - [`window`]: flat-window moving average and box sums used by the
//!   normaliser and the freezing detector.

pub mod apply;
pub mod design;
pub mod window;

pub use apply::{filtfilt, filtfilt_array, lfilter, lfilter_zi};
pub use design::{butter_lowpass, IirCoefficients};
pub use window::{box_sum, moving_average};
