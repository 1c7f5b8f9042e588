//! Shared types, error enum, and ranging sample types for dwm-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by dwm-core.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("allocation failed: {what} ({requested} entries)")]
    Alloc {
        what: &'static str,
        requested: usize,
    },
    #[error("event wait failed: {0}")]
    EventWait(String),
    #[error("script line {line}: {reason}")]
    Script { line: usize, reason: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TagError>;

// ---------------------------------------------------------------------------
// Ranging measurements
// ---------------------------------------------------------------------------

/// Anchor identifiers are displayed as 16-bit values.
pub const ANCHOR_ID_MASK: u64 = 0xFFFF;

/// Millimeters per meter.
pub const MM_PER_METER: f32 = 1000.0;

/// One raw anchor measurement as delivered by a location-ready event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorDistance {
    /// Full anchor address (wider than the displayed identifier).
    pub addr: u64,
    /// Distance to the anchor in millimeters.
    pub dist_mm: u32,
}

impl AnchorDistance {
    pub fn new(addr: u64, dist_mm: u32) -> Self {
        AnchorDistance { addr, dist_mm }
    }
}

/// A measurement reduced to what goes on the wire: a 16-bit identifier and
/// a distance in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingSample {
    pub anchor_id: u16,
    pub distance_m: f32,
}

impl RangingSample {
    pub fn new(anchor_id: u16, distance_m: f32) -> Self {
        RangingSample {
            anchor_id,
            distance_m,
        }
    }
}

impl From<AnchorDistance> for RangingSample {
    fn from(m: AnchorDistance) -> Self {
        RangingSample {
            anchor_id: (m.addr & ANCHOR_ID_MASK) as u16,
            distance_m: m.dist_mm as f32 / MM_PER_METER,
        }
    }
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if !hex.len().is_multiple_of(2) {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as space-separated two-digit uppercase hex (`"DE AD 01"`).
pub fn hex_dump(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 3);
    for (i, &b) in data.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
