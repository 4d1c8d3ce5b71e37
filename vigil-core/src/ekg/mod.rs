//! EKG acquisition and frequency extraction
//!
//! Samples arrive in fixed blocks and fill an analysis window. A full
//! window is reduced to one dominant frequency by averaging the power
//! spectra of its FFT-sized segments.

mod buffer;
mod extractor;
mod fft;

pub use buffer::EkgSampleBuffer;
pub use extractor::{dominant_frequency, EkgState};
pub use fft::{Complex, Fft};

/// Samples per acquisition block
pub const EKG_BLOCK_LEN: usize = vigil_protocol::EKG_BLOCK_SIZE;

/// Samples per analysis window
pub const EKG_WINDOW_LEN: usize = 256;

/// Blocks per analysis window
pub const EKG_BLOCKS: usize = EKG_WINDOW_LEN / EKG_BLOCK_LEN;

/// FFT size
pub const EKG_FFT_LEN: usize = 16;
