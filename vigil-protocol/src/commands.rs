//! Command identifiers, error codes and the initialize record

use crate::frame::FrameError;
use heapless::String;

/// Width of each name field in the initialize record
pub const NAME_LEN: usize = 40;

/// Command carried in the request field of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandId {
    /// Store doctor and patient names
    Initialize,
    /// Enable measurement or EKG acquisition
    Start,
    /// Disable measurement or EKG acquisition
    Stop,
    /// Toggle the remote display
    Display,
    /// Read measurements or an EKG block
    Measure,
    /// Query or acknowledge alarms
    Warning,
    /// Error report (response direction only)
    Error,
}

// Wire format values
const CMD_INITIALIZE: u8 = b'I';
const CMD_START: u8 = b'S';
const CMD_STOP: u8 = b'P';
const CMD_DISPLAY: u8 = b'D';
const CMD_MEASURE: u8 = b'M';
const CMD_WARNING: u8 = b'W';
const CMD_ERROR: u8 = b'E';

impl CommandId {
    /// Parse a command from its wire character
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_INITIALIZE => Some(CommandId::Initialize),
            CMD_START => Some(CommandId::Start),
            CMD_STOP => Some(CommandId::Stop),
            CMD_DISPLAY => Some(CommandId::Display),
            CMD_MEASURE => Some(CommandId::Measure),
            CMD_WARNING => Some(CommandId::Warning),
            CMD_ERROR => Some(CommandId::Error),
            _ => None,
        }
    }

    /// Convert to wire character
    pub fn to_byte(self) -> u8 {
        match self {
            CommandId::Initialize => CMD_INITIALIZE,
            CommandId::Start => CMD_START,
            CommandId::Stop => CMD_STOP,
            CommandId::Display => CMD_DISPLAY,
            CommandId::Measure => CMD_MEASURE,
            CommandId::Warning => CMD_WARNING,
            CommandId::Error => CMD_ERROR,
        }
    }

    /// Returns true for commands answered with an empty acknowledgement
    pub fn is_device_command(&self) -> bool {
        matches!(
            self,
            CommandId::Initialize | CommandId::Start | CommandId::Stop | CommandId::Display
        )
    }
}

/// Error codes carried in the payload of an Error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    /// Start, end or terminator marker missing
    Framing = 1,
    /// End marker not where the record layout puts it
    Length = 2,
    /// Task id not recognised
    UnknownTask = 3,
    /// Command character not recognised
    UnknownCommand = 4,
    /// Command not supported by the addressed task
    Unsupported = 5,
    /// Payload bytes do not form a valid record
    InvalidPayload = 6,
    /// Frame arrived while the previous one was still being handled
    Overrun = 7,
}

impl ErrorCode {
    /// Parse a code from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ErrorCode::Framing),
            2 => Some(ErrorCode::Length),
            3 => Some(ErrorCode::UnknownTask),
            4 => Some(ErrorCode::UnknownCommand),
            5 => Some(ErrorCode::Unsupported),
            6 => Some(ErrorCode::InvalidPayload),
            7 => Some(ErrorCode::Overrun),
            _ => None,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl From<FrameError> for ErrorCode {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::LengthMismatch
            | FrameError::PayloadTooLarge
            | FrameError::BufferOverflow => ErrorCode::Length,
            FrameError::Overrun => ErrorCode::Overrun,
            FrameError::MissingStart
            | FrameError::MissingEnd
            | FrameError::MissingTerminator
            | FrameError::InvalidHeader
            | FrameError::Incomplete
            | FrameError::BufferTooSmall => ErrorCode::Framing,
        }
    }
}

/// Doctor and patient names sent with the Initialize command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitializeCommand {
    pub doctor: String<NAME_LEN>,
    pub patient: String<NAME_LEN>,
}

impl InitializeCommand {
    /// Encoded record size: two NUL-padded name fields
    pub const SIZE: usize = 2 * NAME_LEN;

    /// Build a record, rejecting names longer than a field
    pub fn new(doctor: &str, patient: &str) -> Option<Self> {
        Some(Self {
            doctor: String::try_from(doctor).ok()?,
            patient: String::try_from(patient).ok()?,
        })
    }

    /// Decode from the wire record
    ///
    /// Each field is read up to its first NUL. Returns `None` for a short
    /// record or non-UTF-8 names.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let (doctor, patient) = bytes.split_at(NAME_LEN);
        Some(Self {
            doctor: Self::field(doctor)?,
            patient: Self::field(patient)?,
        })
    }

    fn field(bytes: &[u8]) -> Option<String<NAME_LEN>> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = core::str::from_utf8(&bytes[..end]).ok()?;
        String::try_from(text).ok()
    }

    /// Encode into the wire record
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..self.doctor.len()].copy_from_slice(self.doctor.as_bytes());
        out[NAME_LEN..NAME_LEN + self.patient.len()].copy_from_slice(self.patient.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_byte_roundtrip() {
        for cmd in [
            CommandId::Initialize,
            CommandId::Start,
            CommandId::Stop,
            CommandId::Display,
            CommandId::Measure,
            CommandId::Warning,
            CommandId::Error,
        ] {
            assert_eq!(CommandId::from_byte(cmd.to_byte()), Some(cmd));
        }
        assert_eq!(CommandId::from_byte(b'Z'), None);
    }

    #[test]
    fn test_device_commands() {
        assert!(CommandId::Initialize.is_device_command());
        assert!(CommandId::Display.is_device_command());
        assert!(!CommandId::Measure.is_device_command());
        assert!(!CommandId::Error.is_device_command());
    }

    #[test]
    fn test_error_code_from_frame_error() {
        assert_eq!(ErrorCode::from(FrameError::MissingStart), ErrorCode::Framing);
        assert_eq!(ErrorCode::from(FrameError::LengthMismatch), ErrorCode::Length);
        assert_eq!(ErrorCode::from(FrameError::Overrun), ErrorCode::Overrun);
        assert_eq!(ErrorCode::from_byte(5), Some(ErrorCode::Unsupported));
        assert_eq!(ErrorCode::from_byte(0), None);
    }

    #[test]
    fn test_initialize_record() {
        let cmd = InitializeCommand::new("Dr. Ada", "J. Doe").unwrap();
        let bytes = cmd.to_bytes();
        assert_eq!(&bytes[..7], b"Dr. Ada");
        assert_eq!(bytes[7], 0);
        assert_eq!(&bytes[NAME_LEN..NAME_LEN + 6], b"J. Doe");

        assert_eq!(InitializeCommand::from_bytes(&bytes), Some(cmd));
    }

    #[test]
    fn test_initialize_full_width_names() {
        let bytes = [b'x'; InitializeCommand::SIZE];
        let cmd = InitializeCommand::from_bytes(&bytes).unwrap();
        assert_eq!(cmd.doctor.len(), NAME_LEN);
        assert_eq!(cmd.patient.len(), NAME_LEN);
    }

    #[test]
    fn test_initialize_rejects_bad_record() {
        assert_eq!(InitializeCommand::from_bytes(&[0u8; 10]), None);

        let mut bytes = [0u8; InitializeCommand::SIZE];
        bytes[0] = 0xFF;
        assert_eq!(InitializeCommand::from_bytes(&bytes), None);

        let long = "a name that is far too long for the forty byte field";
        assert_eq!(InitializeCommand::new(long, ""), None);
    }
}
