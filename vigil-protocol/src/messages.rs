//! Message records for the monitor protocol
//!
//! Requests flow from the remote station to the monitor, responses the
//! other way. Every (task, command, direction) triple has a fixed record
//! layout, and [`payload_len`] is the single table of those layouts.

use crate::commands::{CommandId, ErrorCode, InitializeCommand};
use crate::frame::{Frame, FrameError, Header};

/// Samples carried by one EKG block response
pub const EKG_BLOCK_SIZE: usize = 32;

/// Tasks addressable over the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskId {
    Measure = 0,
    Warning = 1,
    Ekg = 2,
}

impl TaskId {
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(TaskId::Measure),
            1 => Some(TaskId::Warning),
            2 => Some(TaskId::Ekg),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Which side of an exchange a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Request,
    Response,
}

/// Errors from message parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Frame-level error
    Frame(FrameError),
    /// Task id not in [`TaskId`]
    UnknownTask,
    /// Command character not in [`CommandId`]
    UnknownCommand,
    /// Command has no record layout for this task
    Unsupported,
    /// Response addressed to a different task than expected
    TaskMismatch,
    /// Payload bytes do not form a valid record
    InvalidPayload,
}

impl From<FrameError> for MessageError {
    fn from(err: FrameError) -> Self {
        MessageError::Frame(err)
    }
}

impl MessageError {
    /// Code reported to the sender in an Error response
    pub fn code(&self) -> ErrorCode {
        match self {
            MessageError::Frame(err) => ErrorCode::from(*err),
            MessageError::UnknownTask | MessageError::TaskMismatch => ErrorCode::UnknownTask,
            MessageError::UnknownCommand => ErrorCode::UnknownCommand,
            MessageError::Unsupported => ErrorCode::Unsupported,
            MessageError::InvalidPayload => ErrorCode::InvalidPayload,
        }
    }
}

/// Payload length of the record for a (task, command, direction) triple
///
/// Returns `None` when the task does not support the command.
pub fn payload_len(task: TaskId, command: CommandId, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Request => match (task, command) {
            (TaskId::Measure, CommandId::Measure) => Some(MeasureRequest::SIZE),
            (TaskId::Ekg, CommandId::Measure) => Some(EkgRequest::SIZE),
            (TaskId::Warning, CommandId::Warning) => Some(WarningRequest::SIZE),
            (_, CommandId::Initialize) => Some(InitializeCommand::SIZE),
            (TaskId::Measure, CommandId::Start | CommandId::Stop) => Some(2),
            (TaskId::Ekg, CommandId::Start | CommandId::Stop) => Some(0),
            (_, CommandId::Display) => Some(1),
            _ => None,
        },
        Direction::Response => match (task, command) {
            (TaskId::Measure, CommandId::Measure) => Some(MeasureResponse::SIZE),
            (TaskId::Ekg, CommandId::Measure) => Some(EkgBlock::SIZE),
            (TaskId::Warning, CommandId::Warning) => Some(AlarmSummary::SIZE),
            (_, CommandId::Error) => Some(1),
            (_, cmd) if cmd.is_device_command() => {
                payload_len(task, cmd, Direction::Request).map(|_| 0)
            }
            _ => None,
        },
    }
}

/// Serialize a frame into `out`
///
/// `len` is the declared payload length; it must not exceed `payload`.
/// Returns the number of bytes written.
pub fn send_message(
    task: u8,
    request: u8,
    payload: &[u8],
    len: usize,
    out: &mut [u8],
) -> Result<usize, FrameError> {
    let payload = payload.get(..len).ok_or(FrameError::LengthMismatch)?;
    Frame::new(task, request, payload)?.encode(out)
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Measure task read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasureRequest {
    /// Measurement select mask
    pub select: u16,
}

impl MeasureRequest {
    pub const SIZE: usize = 2;
}

/// EKG block read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EkgRequest {
    pub block: u8,
}

impl EkgRequest {
    pub const SIZE: usize = 1;
}

/// Warning task request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WarningRequest {
    /// Acknowledge active alarms (otherwise just query)
    pub acknowledge: bool,
}

impl WarningRequest {
    pub const SIZE: usize = 1;
}

/// Target of a Start or Stop command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartStopTarget {
    /// Signals in the select mask
    Measure(u16),
    /// EKG acquisition
    Ekg,
}

impl StartStopTarget {
    fn task(&self) -> TaskId {
        match self {
            StartStopTarget::Measure(_) => TaskId::Measure,
            StartStopTarget::Ekg => TaskId::Ekg,
        }
    }
}

/// Latest corrected values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasureResponse {
    pub temperature: u32,
    pub systolic: u32,
    pub diastolic: u32,
    pub pulse: u32,
    pub respiration: u32,
    pub ekg_frequency: u32,
}

impl MeasureResponse {
    pub const SIZE: usize = 6 * 4;

    fn fields(&self) -> [u32; 6] {
        [
            self.temperature,
            self.systolic,
            self.diastolic,
            self.pulse,
            self.respiration,
            self.ekg_frequency,
        ]
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        for (chunk, value) in out.chunks_exact_mut(4).zip(self.fields()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            temperature: read_u32(bytes, 0),
            systolic: read_u32(bytes, 4),
            diastolic: read_u32(bytes, 8),
            pulse: read_u32(bytes, 12),
            respiration: read_u32(bytes, 16),
            ekg_frequency: read_u32(bytes, 20),
        })
    }
}

/// One block of EKG samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EkgBlock {
    pub index: u8,
    pub samples: [u8; EKG_BLOCK_SIZE],
}

impl EkgBlock {
    pub const SIZE: usize = 1 + EKG_BLOCK_SIZE;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.index;
        out[1..].copy_from_slice(&self.samples);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let mut samples = [0u8; EKG_BLOCK_SIZE];
        samples.copy_from_slice(&bytes[1..]);
        Some(Self {
            index: bytes[0],
            samples,
        })
    }
}

/// Alarm state as reported over the link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSummary {
    /// One bit per condition, set while not Normal
    pub active: u8,
    /// Cumulative strike counters, one per condition
    pub strikes: [u32; 5],
    /// Battery level
    pub battery: u16,
}

impl AlarmSummary {
    pub const SIZE: usize = 1 + 5 * 4 + 2;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.active;
        for (chunk, value) in out[1..21].chunks_exact_mut(4).zip(self.strikes) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out[21..].copy_from_slice(&self.battery.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let mut strikes = [0u32; 5];
        for (i, strike) in strikes.iter_mut().enumerate() {
            *strike = read_u32(bytes, 1 + i * 4);
        }
        Some(Self {
            active: bytes[0],
            strikes,
            battery: read_u16(bytes, 21),
        })
    }
}

/// Requests parsed from station-originated frames
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Read corrected measurements
    Measure(MeasureRequest),
    /// Read one EKG block
    EkgBlock(EkgRequest),
    /// Query or acknowledge alarms
    Warning(WarningRequest),
    /// Store patient record
    Initialize {
        task: TaskId,
        data: InitializeCommand,
    },
    /// Enable acquisition
    Start(StartStopTarget),
    /// Disable acquisition
    Stop(StartStopTarget),
    /// Toggle the remote display
    Display { task: TaskId, on: bool },
}

impl Request {
    /// Task this request is addressed to
    pub fn task(&self) -> TaskId {
        match self {
            Request::Measure(_) => TaskId::Measure,
            Request::EkgBlock(_) => TaskId::Ekg,
            Request::Warning(_) => TaskId::Warning,
            Request::Initialize { task, .. } | Request::Display { task, .. } => *task,
            Request::Start(target) | Request::Stop(target) => target.task(),
        }
    }

    /// Command this request carries
    pub fn command(&self) -> CommandId {
        match self {
            Request::Measure(_) | Request::EkgBlock(_) => CommandId::Measure,
            Request::Warning(_) => CommandId::Warning,
            Request::Initialize { .. } => CommandId::Initialize,
            Request::Start(_) => CommandId::Start,
            Request::Stop(_) => CommandId::Stop,
            Request::Display { .. } => CommandId::Display,
        }
    }

    /// Encode this request into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let task = self.task().to_u8();
        let command = self.command().to_byte();
        match self {
            Request::Measure(req) => Frame::new(task, command, &req.select.to_le_bytes()),
            Request::EkgBlock(req) => Frame::new(task, command, &[req.block]),
            Request::Warning(req) => Frame::new(task, command, &[req.acknowledge as u8]),
            Request::Initialize { data, .. } => Frame::new(task, command, &data.to_bytes()),
            Request::Start(StartStopTarget::Measure(mask))
            | Request::Stop(StartStopTarget::Measure(mask)) => {
                Frame::new(task, command, &mask.to_le_bytes())
            }
            Request::Start(StartStopTarget::Ekg) | Request::Stop(StartStopTarget::Ekg) => {
                Frame::empty(task, command)
            }
            Request::Display { on, .. } => Frame::new(task, command, &[*on as u8]),
        }
    }

    fn from_parts(task: TaskId, command: CommandId, payload: &[u8]) -> Result<Self, MessageError> {
        let request = match (task, command) {
            (TaskId::Measure, CommandId::Measure) => Request::Measure(MeasureRequest {
                select: read_u16(payload, 0),
            }),
            (TaskId::Ekg, CommandId::Measure) => Request::EkgBlock(EkgRequest { block: payload[0] }),
            (TaskId::Warning, CommandId::Warning) => match payload[0] {
                0 => Request::Warning(WarningRequest { acknowledge: false }),
                1 => Request::Warning(WarningRequest { acknowledge: true }),
                _ => return Err(MessageError::InvalidPayload),
            },
            (_, CommandId::Initialize) => Request::Initialize {
                task,
                data: InitializeCommand::from_bytes(payload).ok_or(MessageError::InvalidPayload)?,
            },
            (TaskId::Measure, CommandId::Start) => {
                Request::Start(StartStopTarget::Measure(read_u16(payload, 0)))
            }
            (TaskId::Measure, CommandId::Stop) => {
                Request::Stop(StartStopTarget::Measure(read_u16(payload, 0)))
            }
            (TaskId::Ekg, CommandId::Start) => Request::Start(StartStopTarget::Ekg),
            (TaskId::Ekg, CommandId::Stop) => Request::Stop(StartStopTarget::Ekg),
            (_, CommandId::Display) => match payload[0] {
                0 => Request::Display { task, on: false },
                1 => Request::Display { task, on: true },
                _ => return Err(MessageError::InvalidPayload),
            },
            _ => return Err(MessageError::Unsupported),
        };
        Ok(request)
    }
}

/// Responses sent by the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    Measure(MeasureResponse),
    EkgBlock(EkgBlock),
    Warning(AlarmSummary),
    /// Empty acknowledgement of a device command
    Ack { task: TaskId, command: CommandId },
    /// Error report
    Error { task: TaskId, code: ErrorCode },
}

impl Response {
    /// Task this response is addressed from
    pub fn task(&self) -> TaskId {
        match self {
            Response::Measure(_) => TaskId::Measure,
            Response::EkgBlock(_) => TaskId::Ekg,
            Response::Warning(_) => TaskId::Warning,
            Response::Ack { task, .. } | Response::Error { task, .. } => *task,
        }
    }

    /// Encode this response into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let task = self.task().to_u8();
        match self {
            Response::Measure(m) => Frame::new(task, CommandId::Measure.to_byte(), &m.to_bytes()),
            Response::EkgBlock(b) => Frame::new(task, CommandId::Measure.to_byte(), &b.to_bytes()),
            Response::Warning(s) => Frame::new(task, CommandId::Warning.to_byte(), &s.to_bytes()),
            Response::Ack { command, .. } => Frame::empty(task, command.to_byte()),
            Response::Error { code, .. } => {
                Frame::new(task, CommandId::Error.to_byte(), &[code.to_byte()])
            }
        }
    }

    fn from_parts(task: TaskId, command: CommandId, payload: &[u8]) -> Result<Self, MessageError> {
        let invalid = MessageError::InvalidPayload;
        match (task, command) {
            (_, CommandId::Error) => {
                let code = ErrorCode::from_byte(payload[0]).ok_or(invalid)?;
                Ok(Response::Error { task, code })
            }
            (TaskId::Measure, CommandId::Measure) => {
                MeasureResponse::from_bytes(payload).map(Response::Measure).ok_or(invalid)
            }
            (TaskId::Ekg, CommandId::Measure) => {
                EkgBlock::from_bytes(payload).map(Response::EkgBlock).ok_or(invalid)
            }
            (TaskId::Warning, CommandId::Warning) => {
                AlarmSummary::from_bytes(payload).map(Response::Warning).ok_or(invalid)
            }
            (_, cmd) if cmd.is_device_command() => Ok(Response::Ack { task, command: cmd }),
            _ => Err(MessageError::Unsupported),
        }
    }
}

/// Resolve the header of `bytes` to a task, command and record length
fn resolve(bytes: &[u8], direction: Direction) -> Result<(TaskId, CommandId, usize), MessageError> {
    let (header, _) = Header::parse(bytes)?;
    resolve_header(header, direction)
}

/// Resolve a parsed header to a task, command and record length
pub fn resolve_header(
    header: Header,
    direction: Direction,
) -> Result<(TaskId, CommandId, usize), MessageError> {
    let task = TaskId::from_u8(header.task).ok_or(MessageError::UnknownTask)?;
    let command = CommandId::from_byte(header.request).ok_or(MessageError::UnknownCommand)?;
    let len = payload_len(task, command, direction).ok_or(MessageError::Unsupported)?;
    Ok((task, command, len))
}

/// Parse a station request from a buffer holding one frame
pub fn parse_request(bytes: &[u8]) -> Result<Request, MessageError> {
    let (task, command, len) = resolve(bytes, Direction::Request)?;
    let frame = Frame::decode(bytes, len)?;
    Request::from_parts(task, command, &frame.payload)
}

/// Parse a monitor response addressed from `expected`
///
/// Dispatches to the decoder of the expected task; a frame from any other
/// task is rejected.
pub fn parse_response(bytes: &[u8], expected: TaskId) -> Result<Response, MessageError> {
    let (task, command, len) = resolve(bytes, Direction::Response)?;
    if task != expected {
        return Err(MessageError::TaskMismatch);
    }
    let frame = Frame::decode(bytes, len)?;
    Response::from_parts(task, command, &frame.payload)
}
