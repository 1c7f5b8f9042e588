//! Route tag events to their handlers.
//!
//! Location events go through the encoder and out over the uplink; the
//! other kinds are only logged. No event kind raises an error: a failed
//! location event is dropped and reported in the returned `EventOutcome`.

use log::{debug, info, trace, warn};

use crate::config::Config;
use crate::encode::Encoder;
use crate::event::{user_payload, TagEvent, EVENT_HEADER_LEN};
use crate::types::{hex_dump, AnchorDistance, TagError};
use crate::uplink::{UplinkWriter, WriteStatus};

/// What handling one event amounted to.
#[derive(Debug)]
pub enum EventOutcome {
    /// A payload was handed to the uplink.
    Sent { bytes: usize, status: WriteStatus },
    /// Location event without anchors; nothing written.
    Empty,
    /// Location event abandoned before anything was written.
    Dropped(TagError),
    /// User data received and logged.
    UserData(Vec<u8>),
    /// Status event logged.
    Noted,
    /// Nothing to do.
    Ignored,
}

/// Event handler owning the encoder and the uplink writer.
pub struct Dispatcher<W: UplinkWriter> {
    encoder: Encoder,
    uplink: W,
    important: bool,
    send_empty: bool,
}

impl<W: UplinkWriter> Dispatcher<W> {
    pub fn new(uplink: W, config: &Config) -> Self {
        Dispatcher {
            encoder: Encoder::new(&config.encoder),
            uplink,
            important: config.uplink.important,
            send_empty: config.uplink.send_empty,
        }
    }

    pub fn uplink(&self) -> &W {
        &self.uplink
    }

    pub fn into_uplink(self) -> W {
        self.uplink
    }

    /// Handle one event to completion.
    pub fn handle(&mut self, event: &TagEvent) -> EventOutcome {
        match event {
            TagEvent::LocationReady { anchors } => self.on_location(anchors),
            TagEvent::UserDataReady { total_len, data } => {
                match user_payload(*total_len, data) {
                    Some(payload) => {
                        let declared = total_len.saturating_sub(EVENT_HEADER_LEN);
                        info!("{}", user_data_message(declared, payload));
                        EventOutcome::UserData(payload.to_vec())
                    }
                    None => EventOutcome::Ignored,
                }
            }
            TagEvent::UserDataSent => {
                info!("iot sent");
                EventOutcome::Noted
            }
            TagEvent::BackhaulChanged { initialized } => {
                info!("uwbmac: backhaul = {}", u8::from(*initialized));
                EventOutcome::Noted
            }
            TagEvent::UwbmacJoinedChanged { joined } => {
                info!("uwbmac: joined = {}", u8::from(*joined));
                EventOutcome::Noted
            }
            TagEvent::Unsupported { id } => {
                trace!("ignoring event kind {id}");
                EventOutcome::Ignored
            }
        }
    }

    fn on_location(&mut self, anchors: &[AnchorDistance]) -> EventOutcome {
        let payload = match self.encoder.encode(anchors) {
            Ok(p) => p,
            Err(e) => {
                warn!("location event dropped: {e}");
                return EventOutcome::Dropped(e);
            }
        };

        if payload.is_empty() && !self.send_empty {
            debug!("location event without anchors, nothing to send");
            return EventOutcome::Empty;
        }

        let code = self.uplink.usr_data_write(&payload, self.important);
        let status = WriteStatus::from_code(code);
        if !status.is_ok() {
            warn!("{}", write_status_message(status));
        }
        EventOutcome::Sent {
            bytes: payload.len(),
            status,
        }
    }
}

/// Log line for received user data. `declared` is the length the event
/// header claims, which may exceed the bytes actually carried.
pub fn user_data_message(declared: usize, payload: &[u8]) -> String {
    format!("iot received, len={declared}: {}", hex_dump(payload))
}

/// Diagnostic for a write the uplink rejected.
pub fn write_status_message(status: WriteStatus) -> String {
    format!("usr_data_write: {status}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::uplink::{MemoryUplink, WRITE_BUSY, WRITE_OK};

    fn make_dispatcher(code: i32) -> Dispatcher<MemoryUplink> {
        Dispatcher::new(MemoryUplink::with_status(code), &Config::default())
    }

    fn location(anchors: &[(u64, u32)]) -> TagEvent {
        TagEvent::LocationReady {
            anchors: anchors
                .iter()
                .map(|&(addr, mm)| AnchorDistance::new(addr, mm))
                .collect(),
        }
    }

    #[test]
    fn test_location_event_written_once() {
        let mut d = make_dispatcher(WRITE_OK);
        let evt = location(&[(0xAB, 1500), (0x1_0005, 999), (0x1, 123_456)]);

        let outcome = d.handle(&evt);

        let expected = "00AB   1.50\n0005   1.00\n0001 123.46\n";
        assert!(matches!(
            outcome,
            EventOutcome::Sent { bytes, status: WriteStatus::Ok } if bytes == expected.len()
        ));
        let uplink = d.uplink();
        assert_eq!(uplink.writes.len(), 1);
        assert!(uplink.writes[0].important);
        assert_eq!(uplink.texts(), [expected]);
    }

    #[test]
    fn test_busy_is_reported_not_retried() {
        let mut d = make_dispatcher(WRITE_BUSY);
        let outcome = d.handle(&location(&[(1, 1000)]));

        assert!(matches!(
            outcome,
            EventOutcome::Sent {
                status: WriteStatus::Busy,
                ..
            }
        ));
        assert_eq!(d.uplink().writes.len(), 1);
    }

    #[test]
    fn test_write_status_messages() {
        assert_eq!(
            write_status_message(WriteStatus::from_code(WRITE_BUSY)),
            "usr_data_write: busy"
        );
        assert_eq!(
            write_status_message(WriteStatus::NotPermitted),
            "usr_data_write: operation not permitted"
        );
    }

    #[test]
    fn test_user_data_message_reports_declared_length() {
        assert_eq!(user_data_message(4, &[0xDE, 0xAD]), "iot received, len=4: DE AD");
    }

    #[test]
    fn test_large_location_event_sent_in_full() {
        let mut d = make_dispatcher(WRITE_OK);
        let anchors: Vec<(u64, u32)> = (0..1000u64).map(|i| (i, 1000 + i as u32)).collect();

        let outcome = d.handle(&location(&anchors));

        assert!(matches!(
            outcome,
            EventOutcome::Sent { bytes, status: WriteStatus::Ok } if bytes == 1000 * 12
        ));
        let texts = d.uplink().texts();
        assert_eq!(texts.len(), 1);
        let lines: Vec<&str> = texts[0].lines().collect();
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines[0], "0000   1.00");
        assert_eq!(lines[999], "03E7   2.00");
    }

    #[test]
    fn test_priority_flag_from_config() {
        let mut config = Config::default();
        config.uplink.important = false;
        let mut d = Dispatcher::new(MemoryUplink::new(), &config);
        d.handle(&location(&[(1, 1000)]));
        assert!(!d.uplink().writes[0].important);
    }

    #[test]
    fn test_empty_location_skips_write() {
        let mut d = make_dispatcher(WRITE_OK);
        assert!(matches!(d.handle(&location(&[])), EventOutcome::Empty));
        assert!(d.uplink().writes.is_empty());
    }

    #[test]
    fn test_empty_location_with_send_empty() {
        let mut config = Config::default();
        config.uplink.send_empty = true;
        let mut d = Dispatcher::new(MemoryUplink::new(), &config);

        let outcome = d.handle(&location(&[]));
        assert!(matches!(outcome, EventOutcome::Sent { bytes: 0, .. }));
        assert_eq!(d.uplink().writes.len(), 1);
        assert!(d.uplink().writes[0].data.is_empty());
    }

    #[test]
    fn test_over_budget_event_dropped() {
        let mut config = Config::default();
        config.encoder.max_samples = Some(2);
        let mut d = Dispatcher::new(MemoryUplink::new(), &config);

        let outcome = d.handle(&location(&[(1, 1000), (2, 2000), (3, 3000)]));
        assert!(matches!(
            outcome,
            EventOutcome::Dropped(TagError::Alloc { .. })
        ));
        assert!(d.uplink().writes.is_empty());

        // Next event is processed normally
        let outcome = d.handle(&location(&[(1, 1000)]));
        assert!(matches!(outcome, EventOutcome::Sent { .. }));
    }

    #[test]
    fn test_user_data_header_only() {
        let mut d = make_dispatcher(WRITE_OK);
        let evt = TagEvent::UserDataReady {
            total_len: EVENT_HEADER_LEN,
            data: vec![],
        };
        assert!(matches!(d.handle(&evt), EventOutcome::Ignored));
        assert!(d.uplink().writes.is_empty());
    }

    #[test]
    fn test_user_data_payload() {
        let mut d = make_dispatcher(WRITE_OK);
        let evt = TagEvent::UserDataReady {
            total_len: EVENT_HEADER_LEN + 3,
            data: vec![0xDE, 0xAD, 0x01, 0xFF],
        };
        match d.handle(&evt) {
            EventOutcome::UserData(bytes) => assert_eq!(bytes, vec![0xDE, 0xAD, 0x01]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_status_events_noted() {
        let mut d = make_dispatcher(WRITE_OK);
        assert!(matches!(d.handle(&TagEvent::UserDataSent), EventOutcome::Noted));
        assert!(matches!(
            d.handle(&TagEvent::BackhaulChanged { initialized: true }),
            EventOutcome::Noted
        ));
        assert!(matches!(
            d.handle(&TagEvent::UwbmacJoinedChanged { joined: false }),
            EventOutcome::Noted
        ));
        assert!(d.uplink().writes.is_empty());
    }

    #[test]
    fn test_unsupported_event_ignored() {
        let mut d = make_dispatcher(WRITE_OK);
        assert!(matches!(
            d.handle(&TagEvent::Unsupported { id: 0x40 }),
            EventOutcome::Ignored
        ));
    }
}
