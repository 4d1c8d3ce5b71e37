//! Frame encoding and decoding for the remote protocol.
//!
//! Frame format:
//! - START (1 byte): `S`
//! - TASK (1-3 bytes): task id as ASCII decimal
//! - TOKENIZER (1 byte): `|`
//! - COMMAND (1 byte): ASCII command character
//! - TOKENIZER (1 byte): `|`
//! - PAYLOAD (0-87 bytes): raw record, length known from the record layout
//! - END (1 byte): `E`
//! - TERMINATOR (1 byte): `~`

use heapless::Vec;

/// Start-of-message marker
pub const START_OF_MESSAGE: u8 = b'S';

/// End-of-message marker
pub const END_OF_MESSAGE: u8 = b'E';

/// Field separator
pub const MESSAGE_TOKENIZER: u8 = b'|';

/// Byte following the end marker
pub const MESSAGE_TERMINATOR: u8 = b'~';

/// Size of one communication buffer
pub const COM_BUF_LEN: usize = 96;

/// Number of communication buffers (one filling, one draining)
pub const COM_NUM_BUF: usize = 2;

/// Maximum digits in the task field
const MAX_TASK_DIGITS: usize = 3;

/// Largest framing overhead: START + 3 digits + `|` + command + `|` + END + TERMINATOR
pub const MAX_OVERHEAD: usize = 1 + MAX_TASK_DIGITS + 1 + 1 + 1 + 2;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = COM_BUF_LEN - MAX_OVERHEAD;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// First byte is not the start marker
    MissingStart,
    /// End marker missing before the terminator
    MissingEnd,
    /// Last byte is not the terminator
    MissingTerminator,
    /// Declared payload length does not match the bytes between delimiters
    LengthMismatch,
    /// Task or command field is malformed
    InvalidHeader,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Frame longer than a communication buffer
    BufferOverflow,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// A frame completed while the other buffer was still being drained
    Overrun,
}

/// Task and command fields at the front of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Numeric task id
    pub task: u8,
    /// Command character
    pub request: u8,
}

impl Header {
    /// Parse the header of `bytes`
    ///
    /// Returns the header and the offset of the first payload byte.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), FrameError> {
        match bytes.first() {
            None => return Err(FrameError::Incomplete),
            Some(&START_OF_MESSAGE) => {}
            Some(_) => return Err(FrameError::MissingStart),
        }

        let mut pos = 1;
        let mut task: u16 = 0;
        let mut digits = 0;
        loop {
            let byte = *bytes.get(pos).ok_or(FrameError::Incomplete)?;
            pos += 1;
            match byte {
                b'0'..=b'9' if digits < MAX_TASK_DIGITS => {
                    task = task * 10 + (byte - b'0') as u16;
                    digits += 1;
                }
                MESSAGE_TOKENIZER if digits > 0 => break,
                _ => return Err(FrameError::InvalidHeader),
            }
        }
        let task = u8::try_from(task).map_err(|_| FrameError::InvalidHeader)?;

        let request = *bytes.get(pos).ok_or(FrameError::Incomplete)?;
        if !Self::is_command_byte(request) {
            return Err(FrameError::InvalidHeader);
        }
        pos += 1;

        match bytes.get(pos) {
            None => Err(FrameError::Incomplete),
            Some(&MESSAGE_TOKENIZER) => Ok((Self { task, request }, pos + 1)),
            Some(_) => Err(FrameError::InvalidHeader),
        }
    }

    fn is_command_byte(byte: u8) -> bool {
        byte.is_ascii_graphic() && byte != MESSAGE_TOKENIZER
    }

    /// Write the header into `buffer`, returning bytes written
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let mut digits = [0u8; MAX_TASK_DIGITS];
        let mut n = 0;
        let mut task = self.task;
        loop {
            digits[n] = b'0' + task % 10;
            n += 1;
            task /= 10;
            if task == 0 {
                break;
            }
        }

        let len = 1 + n + 3;
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }
        buffer[0] = START_OF_MESSAGE;
        for i in 0..n {
            buffer[1 + i] = digits[n - 1 - i];
        }
        buffer[1 + n] = MESSAGE_TOKENIZER;
        buffer[2 + n] = self.request;
        buffer[3 + n] = MESSAGE_TOKENIZER;
        Ok(len)
    }
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Numeric task id
    pub task: u8,
    /// Command character
    pub request: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given header and payload
    pub fn new(task: u8, request: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if !Header::is_command_byte(request) {
            return Err(FrameError::InvalidHeader);
        }
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            task,
            request,
            payload,
        })
    }

    /// Create a frame with no payload
    pub fn empty(task: u8, request: u8) -> Result<Self, FrameError> {
        Self::new(task, request, &[])
    }

    /// Header fields of this frame
    pub fn header(&self) -> Header {
        Header {
            task: self.task,
            request: self.request,
        }
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let header_len = self.header().encode(buffer)?;
        let total = header_len + self.payload.len() + 2;
        if buffer.len() < total {
            return Err(FrameError::BufferTooSmall);
        }

        let end = header_len + self.payload.len();
        buffer[header_len..end].copy_from_slice(&self.payload);
        buffer[end] = END_OF_MESSAGE;
        buffer[end + 1] = MESSAGE_TERMINATOR;
        Ok(total)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, COM_BUF_LEN>, FrameError> {
        let mut buffer = [0u8; COM_BUF_LEN];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode a buffer holding exactly one frame
    ///
    /// `payload_len` is the declared payload length. The payload may
    /// contain marker bytes, so delimiters are located from the ends of
    /// the buffer and the gap between them must equal `payload_len`.
    pub fn decode(bytes: &[u8], payload_len: usize) -> Result<Self, FrameError> {
        match bytes.first() {
            None => return Err(FrameError::Incomplete),
            Some(&START_OF_MESSAGE) => {}
            Some(_) => return Err(FrameError::MissingStart),
        }
        match bytes.last() {
            Some(&MESSAGE_TERMINATOR) => {}
            _ => return Err(FrameError::MissingTerminator),
        }
        if bytes.len() < 2 || bytes[bytes.len() - 2] != END_OF_MESSAGE {
            return Err(FrameError::MissingEnd);
        }

        let (header, start) = Header::parse(bytes)?;
        let end = bytes.len() - 2;
        if end < start || end - start != payload_len {
            return Err(FrameError::LengthMismatch);
        }

        Self::new(header.task, header.request, &bytes[start..end])
    }
}
