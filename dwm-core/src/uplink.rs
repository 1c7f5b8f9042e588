//! Outbound-write seam and its status codes.
//!
//! The uplink writer copies the payload and reports an integer status. The
//! core never retries; statuses are mapped to `WriteStatus` and logged.

use std::fmt;

/// Component that transmits a payload off-device.
pub trait UplinkWriter {
    /// Send `data`. `important` asks for priority delivery; its exact
    /// meaning belongs to the writer. Returns a raw status code.
    fn usr_data_write(&mut self, data: &[u8], important: bool) -> i32;
}

impl<W: UplinkWriter + ?Sized> UplinkWriter for &mut W {
    fn usr_data_write(&mut self, data: &[u8], important: bool) -> i32 {
        (**self).usr_data_write(data, important)
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const WRITE_OK: i32 = 0;
pub const WRITE_UNKNOWN_COMMAND: i32 = 1;
pub const WRITE_INTERNAL: i32 = 2;
pub const WRITE_INVALID_PARAMETER: i32 = 3;
pub const WRITE_BUSY: i32 = 4;
pub const WRITE_NOT_PERMITTED: i32 = 5;

/// Outcome of an uplink write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Ok,
    /// Unknown command or broken TLV frame.
    UnknownCommand,
    Internal,
    InvalidParameter,
    Busy,
    NotPermitted,
}

impl WriteStatus {
    /// Map a raw code. Codes outside the known set count as success.
    pub fn from_code(code: i32) -> Self {
        match code {
            WRITE_UNKNOWN_COMMAND => WriteStatus::UnknownCommand,
            WRITE_INTERNAL => WriteStatus::Internal,
            WRITE_INVALID_PARAMETER => WriteStatus::InvalidParameter,
            WRITE_BUSY => WriteStatus::Busy,
            WRITE_NOT_PERMITTED => WriteStatus::NotPermitted,
            _ => WriteStatus::Ok,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            WriteStatus::Ok => WRITE_OK,
            WriteStatus::UnknownCommand => WRITE_UNKNOWN_COMMAND,
            WriteStatus::Internal => WRITE_INTERNAL,
            WriteStatus::InvalidParameter => WRITE_INVALID_PARAMETER,
            WriteStatus::Busy => WRITE_BUSY,
            WriteStatus::NotPermitted => WRITE_NOT_PERMITTED,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == WriteStatus::Ok
    }

    pub fn description(&self) -> &'static str {
        match self {
            WriteStatus::Ok => "ok",
            WriteStatus::UnknownCommand => "unknown command or broken TLV frame",
            WriteStatus::Internal => "internal error",
            WriteStatus::InvalidParameter => "invalid parameter",
            WriteStatus::Busy => "busy",
            WriteStatus::NotPermitted => "operation not permitted",
        }
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// ---------------------------------------------------------------------------
// In-memory writer
// ---------------------------------------------------------------------------

/// One recorded uplink write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub data: Vec<u8>,
    pub important: bool,
}

/// Writer that records payloads and answers with a fixed status code.
#[derive(Debug, Default)]
pub struct MemoryUplink {
    pub writes: Vec<RecordedWrite>,
    status: i32,
}

impl MemoryUplink {
    pub fn new() -> Self {
        MemoryUplink::default()
    }

    /// Answer every write with `code`.
    pub fn with_status(code: i32) -> Self {
        MemoryUplink {
            writes: Vec::new(),
            status: code,
        }
    }

    /// Payloads written so far, decoded as text.
    pub fn texts(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(&w.data).into_owned())
            .collect()
    }
}

impl UplinkWriter for MemoryUplink {
    fn usr_data_write(&mut self, data: &[u8], important: bool) -> i32 {
        self.writes.push(RecordedWrite {
            data: data.to_vec(),
            important,
        });
        self.status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
