//! Tag events as delivered by the host event source.
//!
//! The set of kinds is closed; anything the application doesn't handle
//! arrives as `TagEvent::Unsupported` and is ignored by the dispatcher.

use bitflags::bitflags;
use serde::Serialize;

use crate::types::AnchorDistance;

/// Size of the event header (`id` + `len`) counted in `total_len`.
pub const EVENT_HEADER_LEN: usize = 2;

bitflags! {
    /// Event kinds a listener can register interest in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const LOC_READY = 1 << 0;
        const USR_DATA_READY = 1 << 1;
        const USR_DATA_SENT = 1 << 2;
        const BH_INITIALIZED_CHANGED = 1 << 3;
        const UWBMAC_JOINED_CHANGED = 1 << 4;
    }
}

impl EventMask {
    /// The kinds the tag application listens for.
    pub const APP_DEFAULT: EventMask = EventMask::from_bits_retain(
        EventMask::LOC_READY.bits()
            | EventMask::USR_DATA_READY.bits()
            | EventMask::BH_INITIALIZED_CHANGED.bits()
            | EventMask::UWBMAC_JOINED_CHANGED.bits(),
    );
}

/// One event record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TagEvent {
    /// New ranging results: one entry per anchor, in arrival order.
    LocationReady { anchors: Vec<AnchorDistance> },
    /// Data received over the backhaul. `total_len` includes the header.
    UserDataReady { total_len: usize, data: Vec<u8> },
    /// A previous uplink write went out.
    UserDataSent,
    /// Backhaul initialization state changed.
    BackhaulChanged { initialized: bool },
    /// UWB MAC join state changed.
    UwbmacJoinedChanged { joined: bool },
    /// Any kind the application doesn't handle.
    Unsupported { id: u32 },
}

impl TagEvent {
    /// Listener flag for this event. Empty for unsupported kinds.
    pub fn kind(&self) -> EventMask {
        match self {
            TagEvent::LocationReady { .. } => EventMask::LOC_READY,
            TagEvent::UserDataReady { .. } => EventMask::USR_DATA_READY,
            TagEvent::UserDataSent => EventMask::USR_DATA_SENT,
            TagEvent::BackhaulChanged { .. } => EventMask::BH_INITIALIZED_CHANGED,
            TagEvent::UwbmacJoinedChanged { .. } => EventMask::UWBMAC_JOINED_CHANGED,
            TagEvent::Unsupported { .. } => EventMask::empty(),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TagEvent::LocationReady { .. } => "loc_ready",
            TagEvent::UserDataReady { .. } => "usr_data_ready",
            TagEvent::UserDataSent => "usr_data_sent",
            TagEvent::BackhaulChanged { .. } => "bh_initialized_changed",
            TagEvent::UwbmacJoinedChanged { .. } => "uwbmac_joined_changed",
            TagEvent::Unsupported { .. } => "unsupported",
        }
    }
}

/// Payload carried by a user-data event, or `None` when the header leaves
/// nothing (`total_len <= EVENT_HEADER_LEN`).
///
/// Never reads past the bytes actually present in `data`.
pub fn user_payload(total_len: usize, data: &[u8]) -> Option<&[u8]> {
    let len = total_len.checked_sub(EVENT_HEADER_LEN)?;
    if len == 0 {
        return None;
    }
    Some(&data[..len.min(data.len())])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
