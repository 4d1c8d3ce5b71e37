//! EKG sample window

use super::{EKG_BLOCKS, EKG_BLOCK_LEN, EKG_WINDOW_LEN};
use crate::fault::Fault;
use crate::measure::MeasureFlags;

/// Window of EKG samples filled block by block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EkgSampleBuffer {
    samples: [u8; EKG_WINDOW_LEN],
    blocks: usize,
    ready: bool,
}

impl Default for EkgSampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EkgSampleBuffer {
    pub const fn new() -> Self {
        Self {
            samples: [0; EKG_WINDOW_LEN],
            blocks: 0,
            ready: false,
        }
    }

    /// Blocks committed to the current window
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Append a block; the window is ready once all blocks are in
    ///
    /// Committing while a full window has not been consumed is a hard fault.
    pub fn commit_block(
        &mut self,
        block: &[u8; EKG_BLOCK_LEN],
        flags: &MeasureFlags,
    ) -> Result<(), Fault> {
        if self.ready {
            return Err(Fault::EkgOverrun);
        }
        let start = self.blocks * EKG_BLOCK_LEN;
        self.samples[start..start + EKG_BLOCK_LEN].copy_from_slice(block);
        self.blocks += 1;
        if self.blocks == EKG_BLOCKS {
            self.ready = true;
            flags.set(MeasureFlags::EKG_READY);
        }
        Ok(())
    }

    /// Hand a full window to `f` and start refilling
    pub fn consume<R>(
        &mut self,
        flags: &MeasureFlags,
        f: impl FnOnce(&[u8; EKG_WINDOW_LEN]) -> R,
    ) -> Option<R> {
        if !self.ready {
            return None;
        }
        let result = f(&self.samples);
        self.ready = false;
        self.blocks = 0;
        flags.clear(MeasureFlags::EKG_READY);
        Some(result)
    }

    /// Drop a partial window
    pub fn reset(&mut self, flags: &MeasureFlags) {
        self.blocks = 0;
        self.ready = false;
        flags.clear(MeasureFlags::EKG_READY);
    }

    /// Samples of one block slot as last written
    pub fn block(&self, index: usize) -> Option<[u8; EKG_BLOCK_LEN]> {
        let start = index.checked_mul(EKG_BLOCK_LEN)?;
        let slice = self.samples.get(start..start + EKG_BLOCK_LEN)?;
        let mut block = [0u8; EKG_BLOCK_LEN];
        block.copy_from_slice(slice);
        Some(block)
    }
}
