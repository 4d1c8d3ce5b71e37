//! Dominant-frequency extraction

use super::buffer::EkgSampleBuffer;
use super::fft::{Complex, Fft};
use super::{EKG_BLOCK_LEN, EKG_FFT_LEN, EKG_WINDOW_LEN};
use crate::config::EkgConfig;
use crate::fault::Fault;
use crate::measure::MeasureFlags;

/// Spectral power below this counts as a flat signal
const MIN_POWER: f32 = 1e-3;

/// Dominant non-DC frequency of a window in Hz, or 0 for a flat window
///
/// The window is split into `EKG_FFT_LEN`-sample segments whose power
/// spectra are averaged. Only bins up to Nyquist are searched.
pub fn dominant_frequency(
    fft: &Fft<EKG_FFT_LEN>,
    window: &[u8; EKG_WINDOW_LEN],
    sample_rate_hz: u32,
) -> u32 {
    let mut power = [0f32; EKG_FFT_LEN];
    for segment in window.chunks_exact(EKG_FFT_LEN) {
        let mean = segment.iter().map(|&s| s as f32).sum::<f32>() / EKG_FFT_LEN as f32;
        let mut x = [Complex::ZERO; EKG_FFT_LEN];
        for (bin, &sample) in x.iter_mut().zip(segment) {
            *bin = Complex::new(sample as f32 - mean, 0.0);
        }
        fft.transform(&mut x);
        for (acc, bin) in power.iter_mut().zip(x) {
            *acc += bin.norm_sqr();
        }
    }

    let mut best = 0;
    let mut best_power = MIN_POWER;
    for (bin, &p) in power.iter().enumerate().take(EKG_FFT_LEN / 2 + 1).skip(1) {
        if p > best_power {
            best = bin;
            best_power = p;
        }
    }
    (best as u64 * sample_rate_hz as u64 / EKG_FFT_LEN as u64) as u32
}

/// EKG acquisition and analysis state
#[derive(Debug, Clone)]
pub struct EkgState {
    buffer: EkgSampleBuffer,
    fft: Fft<EKG_FFT_LEN>,
    frequency: Option<u32>,
    config: EkgConfig,
    /// Index of the last committed block
    last_block: Option<u8>,
}

impl EkgState {
    pub fn new(config: EkgConfig) -> Self {
        Self {
            buffer: EkgSampleBuffer::new(),
            fft: Fft::new(),
            frequency: None,
            config,
            last_block: None,
        }
    }

    pub fn config(&self) -> &EkgConfig {
        &self.config
    }

    pub fn buffer(&self) -> &EkgSampleBuffer {
        &self.buffer
    }

    /// Latest extracted frequency in Hz
    pub fn frequency(&self) -> Option<u32> {
        self.frequency
    }

    pub fn last_block(&self) -> Option<u8> {
        self.last_block
    }

    /// Store a freshly sampled block
    pub fn commit_block(
        &mut self,
        block: &[u8; EKG_BLOCK_LEN],
        flags: &MeasureFlags,
    ) -> Result<(), Fault> {
        let index = self.buffer.blocks() as u8;
        self.buffer.commit_block(block, flags)?;
        self.last_block = Some(index);
        Ok(())
    }

    /// Analyse a full window if one is ready
    ///
    /// Returns the new frequency when a window was consumed.
    pub fn process(&mut self, flags: &MeasureFlags) -> Option<u32> {
        let fft = &self.fft;
        let rate = self.config.sample_rate_hz;
        let frequency = self
            .buffer
            .consume(flags, |window| dominant_frequency(fft, window, rate))?;
        debug!("ekg frequency {} Hz", frequency);
        self.frequency = Some(frequency);
        Some(frequency)
    }

    /// Drop any partial window and the last frequency
    pub fn disarm(&mut self, flags: &MeasureFlags) {
        self.buffer.reset(flags);
        self.frequency = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_window(bin: f32) -> [u8; EKG_WINDOW_LEN] {
        let mut window = [0u8; EKG_WINDOW_LEN];
        for (n, s) in window.iter_mut().enumerate() {
            let phase = 2.0 * core::f32::consts::PI * bin * n as f32 / EKG_FFT_LEN as f32;
            *s = (128.0 + 100.0 * phase.sin()) as u8;
        }
        window
    }

    #[test]
    fn test_detects_sine_frequency() {
        let fft = Fft::new();
        for bin in 1..=7 {
            let window = sine_window(bin as f32);
            assert_eq!(dominant_frequency(&fft, &window, 8000), bin * 500);
        }
    }

    #[test]
    fn test_flat_window_is_zero() {
        let fft = Fft::new();
        assert_eq!(dominant_frequency(&fft, &[90; EKG_WINDOW_LEN], 8000), 0);
    }

    #[test]
    fn test_process_full_window() {
        let flags = MeasureFlags::new(MeasureFlags::EKG_MEASURE);
        let mut ekg = EkgState::new(EkgConfig::default());
        let window = sine_window(2.0);
        for (i, chunk) in window.chunks_exact(EKG_BLOCK_LEN).enumerate() {
            assert_eq!(ekg.process(&flags), None);
            let mut block = [0u8; EKG_BLOCK_LEN];
            block.copy_from_slice(chunk);
            ekg.commit_block(&block, &flags).unwrap();
            assert_eq!(ekg.last_block(), Some(i as u8));
        }
        assert_eq!(ekg.process(&flags), Some(1000));
        assert_eq!(ekg.frequency(), Some(1000));
        assert_eq!(ekg.process(&flags), None);
    }

    #[test]
    fn test_disarm_forgets_frequency() {
        let flags = MeasureFlags::new(MeasureFlags::EKG_MEASURE);
        let mut ekg = EkgState::new(EkgConfig::default());
        for chunk in sine_window(1.0).chunks_exact(EKG_BLOCK_LEN) {
            let mut block = [0u8; EKG_BLOCK_LEN];
            block.copy_from_slice(chunk);
            ekg.commit_block(&block, &flags).unwrap();
        }
        assert_eq!(ekg.process(&flags), Some(500));

        ekg.disarm(&flags);
        assert_eq!(ekg.frequency(), None);
        assert!(!ekg.buffer().is_ready());
    }
}
