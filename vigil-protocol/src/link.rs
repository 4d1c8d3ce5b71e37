//! Streaming receive side of the serial link
//!
//! Bytes arrive one at a time from the UART. [`FrameReceiver`] tracks
//! where in a frame the stream is and copies the bytes into the filling
//! half of [`ComBuffers`]; a complete frame is committed so the other half
//! can be parsed while the next frame fills.

use crate::frame::{
    FrameError, Header, COM_BUF_LEN, COM_NUM_BUF, END_OF_MESSAGE, MESSAGE_TERMINATOR,
    MESSAGE_TOKENIZER, START_OF_MESSAGE,
};
use heapless::Vec;

/// Two communication buffers: one filling from the link, one holding a
/// complete frame until it is released
pub struct ComBuffers {
    buffers: [Vec<u8, COM_BUF_LEN>; COM_NUM_BUF],
    filling: usize,
    ready: Option<usize>,
}

impl ComBuffers {
    pub fn new() -> Self {
        Self {
            buffers: core::array::from_fn(|_| Vec::new()),
            filling: 0,
            ready: None,
        }
    }

    /// Append a byte to the filling buffer
    pub fn push(&mut self, byte: u8) -> Result<(), FrameError> {
        self.buffers[self.filling]
            .push(byte)
            .map_err(|_| FrameError::BufferOverflow)
    }

    /// Bytes in the filling buffer
    pub fn filling(&self) -> &[u8] {
        &self.buffers[self.filling]
    }

    /// Drop the partial frame in the filling buffer
    pub fn discard(&mut self) {
        self.buffers[self.filling].clear();
    }

    /// Hand the filling buffer over for parsing and start filling the other
    ///
    /// Fails with `Overrun` (and drops the new frame) while the previous
    /// frame has not been released.
    pub fn commit(&mut self) -> Result<(), FrameError> {
        if self.ready.is_some() {
            self.discard();
            return Err(FrameError::Overrun);
        }
        self.ready = Some(self.filling);
        self.filling = (self.filling + 1) % COM_NUM_BUF;
        self.buffers[self.filling].clear();
        Ok(())
    }

    /// The committed frame, if any
    pub fn ready(&self) -> Option<&[u8]> {
        self.ready.map(|i| self.buffers[i].as_slice())
    }

    /// Release the committed frame
    pub fn release(&mut self) {
        if let Some(i) = self.ready.take() {
            self.buffers[i].clear();
        }
    }
}

impl Default for ComBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiveState {
    WaitingForStart,
    ReadingTask,
    WaitingForCommand,
    WaitingForSeparator,
    /// Payload of known length
    ReadingPayload { remaining: usize },
    /// Payload of unknown layout, read until the end marker
    ScanningPayload,
    WaitingForEnd,
    WaitingForTerminator,
}

/// Byte-at-a-time frame receiver
pub struct FrameReceiver {
    state: ReceiveState,
    task: u16,
    digits: u8,
    request: u8,
    header: Option<Header>,
}

impl FrameReceiver {
    pub fn new() -> Self {
        Self {
            state: ReceiveState::WaitingForStart,
            task: 0,
            digits: 0,
            request: 0,
            header: None,
        }
    }

    /// Reset the receiver state
    pub fn reset(&mut self) {
        self.state = ReceiveState::WaitingForStart;
        self.task = 0;
        self.digits = 0;
        self.request = 0;
    }

    /// Header of the frame being received, or of the last frame aborted
    pub fn header(&self) -> Option<Header> {
        self.header
    }

    fn abort(&mut self, buffers: &mut ComBuffers, err: FrameError) -> Result<bool, FrameError> {
        buffers.discard();
        self.reset();
        Err(err)
    }

    /// Feed a single byte
    ///
    /// `resolve` maps a received header to its payload length; `None`
    /// means the layout is unknown and the payload is read up to the end
    /// marker so the parser can report why. Returns `Ok(true)` when a
    /// frame was committed to `buffers`.
    pub fn feed<F>(
        &mut self,
        byte: u8,
        buffers: &mut ComBuffers,
        resolve: F,
    ) -> Result<bool, FrameError>
    where
        F: FnOnce(Header) -> Option<usize>,
    {
        match self.state {
            ReceiveState::WaitingForStart => {
                // Ignore line noise between frames
                if byte == START_OF_MESSAGE {
                    return self.start(buffers);
                }
                Ok(false)
            }
            ReceiveState::ReadingTask => match byte {
                // A truncated header followed by a new frame
                START_OF_MESSAGE => self.start(buffers),
                b'0'..=b'9' if self.digits < 3 => {
                    self.task = self.task * 10 + (byte - b'0') as u16;
                    self.digits += 1;
                    self.store(byte, buffers)
                }
                MESSAGE_TOKENIZER if self.digits > 0 && self.task <= u8::MAX as u16 => {
                    self.state = ReceiveState::WaitingForCommand;
                    self.store(byte, buffers)
                }
                _ => self.abort(buffers, FrameError::InvalidHeader),
            },
            ReceiveState::WaitingForCommand => {
                if !byte.is_ascii_graphic() || byte == MESSAGE_TOKENIZER {
                    return self.abort(buffers, FrameError::InvalidHeader);
                }
                self.request = byte;
                self.state = ReceiveState::WaitingForSeparator;
                self.store(byte, buffers)
            }
            ReceiveState::WaitingForSeparator => {
                if byte == START_OF_MESSAGE {
                    return self.start(buffers);
                }
                if byte != MESSAGE_TOKENIZER {
                    return self.abort(buffers, FrameError::InvalidHeader);
                }
                let header = Header {
                    task: self.task as u8,
                    request: self.request,
                };
                self.header = Some(header);
                self.state = match resolve(header) {
                    Some(0) => ReceiveState::WaitingForEnd,
                    Some(remaining) => ReceiveState::ReadingPayload { remaining },
                    None => ReceiveState::ScanningPayload,
                };
                self.store(byte, buffers)
            }
            ReceiveState::ReadingPayload { remaining } => {
                self.state = if remaining == 1 {
                    ReceiveState::WaitingForEnd
                } else {
                    ReceiveState::ReadingPayload {
                        remaining: remaining - 1,
                    }
                };
                self.store(byte, buffers)
            }
            ReceiveState::ScanningPayload => {
                if byte == END_OF_MESSAGE {
                    self.state = ReceiveState::WaitingForTerminator;
                }
                self.store(byte, buffers)
            }
            ReceiveState::WaitingForEnd => {
                if byte != END_OF_MESSAGE {
                    return self.abort(buffers, FrameError::MissingEnd);
                }
                self.state = ReceiveState::WaitingForTerminator;
                self.store(byte, buffers)
            }
            ReceiveState::WaitingForTerminator => {
                if byte != MESSAGE_TERMINATOR {
                    return self.abort(buffers, FrameError::MissingTerminator);
                }
                self.store(byte, buffers)?;
                self.reset();
                buffers.commit()?;
                Ok(true)
            }
        }
    }

    /// Begin a frame at a start marker, dropping any partial one
    fn start(&mut self, buffers: &mut ComBuffers) -> Result<bool, FrameError> {
        buffers.discard();
        self.reset();
        self.header = None;
        self.state = ReceiveState::ReadingTask;
        self.store(START_OF_MESSAGE, buffers)
    }

    fn store(&mut self, byte: u8, buffers: &mut ComBuffers) -> Result<bool, FrameError> {
        match buffers.push(byte) {
            Ok(()) => Ok(false),
            Err(err) => self.abort(buffers, err),
        }
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn fixed(len: usize) -> impl Fn(Header) -> Option<usize> {
        move |_| Some(len)
    }

    fn feed_all(
        rx: &mut FrameReceiver,
        buffers: &mut ComBuffers,
        bytes: &[u8],
        len: usize,
    ) -> Result<bool, FrameError> {
        let mut done = false;
        for &b in bytes {
            done |= rx.feed(b, buffers, fixed(len))?;
        }
        Ok(done)
    }

    #[test]
    fn test_receive_complete_frame() {
        let frame = Frame::new(0, b'M', &[0x10, 0x00]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert!(feed_all(&mut rx, &mut buffers, &encoded, 2).unwrap());

        let ready = buffers.ready().unwrap();
        assert_eq!(Frame::decode(ready, 2).unwrap(), frame);
        assert_eq!(rx.header(), Some(Header { task: 0, request: b'M' }));
    }

    #[test]
    fn test_payload_may_contain_markers() {
        let frame = Frame::new(2, b'M', &[b'E', b'~']).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert!(feed_all(&mut rx, &mut buffers, &encoded, 2).unwrap());
        assert_eq!(buffers.ready().unwrap(), &encoded[..]);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert!(feed_all(&mut rx, &mut buffers, b"\x00\xFFxyzS1|W|\x00E~", 1).unwrap());
        assert_eq!(buffers.ready().unwrap(), b"S1|W|\x00E~");
    }

    #[test]
    fn test_truncated_header_then_frame() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        // Cut off inside the task digits
        assert!(feed_all(&mut rx, &mut buffers, b"S1S2|S|E~", 0).unwrap());
        assert_eq!(buffers.ready().unwrap(), b"S2|S|E~");
        buffers.release();

        // Cut off after the command
        assert!(feed_all(&mut rx, &mut buffers, b"S0|MS1|W|\x00E~", 1).unwrap());
        assert_eq!(buffers.ready().unwrap(), b"S1|W|\x00E~");
        assert_eq!(rx.header(), Some(Header { task: 1, request: b'W' }));
    }

    #[test]
    fn test_start_marker_is_a_command() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert!(feed_all(&mut rx, &mut buffers, b"S0|S|\x10\x00E~", 2).unwrap());
        assert_eq!(rx.header(), Some(Header { task: 0, request: b'S' }));
    }

    #[test]
    fn test_missing_end_marker() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        let result = feed_all(&mut rx, &mut buffers, b"S1|W|\x00X~", 1);
        assert_eq!(result, Err(FrameError::MissingEnd));
        assert!(buffers.filling().is_empty());
        assert_eq!(rx.header(), Some(Header { task: 1, request: b'W' }));
    }

    #[test]
    fn test_missing_terminator() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        let result = feed_all(&mut rx, &mut buffers, b"S1|W|\x00E!", 1);
        assert_eq!(result, Err(FrameError::MissingTerminator));
        assert!(buffers.ready().is_none());
    }

    #[test]
    fn test_unknown_layout_scans_to_end() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        let mut done = false;
        for &b in b"S9|Q|abcE~" {
            done |= rx.feed(b, &mut buffers, |_| None).unwrap();
        }
        assert!(done);
        assert_eq!(buffers.ready().unwrap(), b"S9|Q|abcE~");
    }

    #[test]
    fn test_bad_task_digits() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert_eq!(
            feed_all(&mut rx, &mut buffers, b"S300|", 0),
            Err(FrameError::InvalidHeader)
        );
        assert_eq!(
            feed_all(&mut rx, &mut buffers, b"S|", 0),
            Err(FrameError::InvalidHeader)
        );
    }

    #[test]
    fn test_overrun_when_not_released() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        assert!(feed_all(&mut rx, &mut buffers, b"S2|S|E~", 0).unwrap());
        assert_eq!(
            feed_all(&mut rx, &mut buffers, b"S2|P|E~", 0),
            Err(FrameError::Overrun)
        );
        // The first frame survives the overrun
        assert_eq!(buffers.ready().unwrap(), b"S2|S|E~");

        buffers.release();
        assert!(feed_all(&mut rx, &mut buffers, b"S2|P|E~", 0).unwrap());
        assert_eq!(buffers.ready().unwrap(), b"S2|P|E~");
    }

    #[test]
    fn test_scanning_overflow() {
        let mut rx = FrameReceiver::new();
        let mut buffers = ComBuffers::new();
        let mut result = Ok(false);
        rx.feed(b'S', &mut buffers, |_| None).unwrap();
        for &b in b"0|Q|" {
            rx.feed(b, &mut buffers, |_| None).unwrap();
        }
        for _ in 0..COM_BUF_LEN {
            result = rx.feed(b'x', &mut buffers, |_| None);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(FrameError::BufferOverflow));
        assert!(buffers.filling().is_empty());
    }
}
