//! Vigil remote communication protocol
//!
//! This crate defines the serial protocol used to query and command the
//! monitor and to stream EKG blocks from it. Frames are ASCII-delimited:
//!
//! ```text
//! ┌───────┬─────────┬───┬─────────┬───┬──────────────┬─────┬────────────┐
//! │ START │ TASK    │ | │ COMMAND │ | │ PAYLOAD      │ END │ TERMINATOR │
//! │ 'S'   │ decimal │   │ 1 char  │   │ fixed record │ 'E' │ '~'        │
//! └───────┴─────────┴───┴─────────┴───┴──────────────┴─────┴────────────┘
//! ```
//!
//! Payloads are raw little-endian records. They are not self-delimiting, so
//! every decoder is told the payload length implied by the (task, command,
//! direction) record layout and checks that the end marker sits exactly
//! there.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod commands;
pub mod frame;
pub mod link;
pub mod messages;

pub use commands::{CommandId, ErrorCode, InitializeCommand, NAME_LEN};
pub use frame::{
    Frame, FrameError, Header, COM_BUF_LEN, COM_NUM_BUF, END_OF_MESSAGE, MAX_PAYLOAD_SIZE,
    MESSAGE_TERMINATOR, MESSAGE_TOKENIZER, START_OF_MESSAGE,
};
pub use link::{ComBuffers, FrameReceiver};
pub use messages::{
    parse_request, parse_response, payload_len, send_message, AlarmSummary, Direction,
    EkgBlock, EkgRequest, MeasureRequest, MeasureResponse, MessageError, Request, Response,
    StartStopTarget, TaskId, WarningRequest, EKG_BLOCK_SIZE,
};
