//! Event scripts: a text stand-in for the tag's event queue.
//!
//! One event per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! loc 0xAB:1500 0x10005:999 1:123456   # location ready, addr:mm pairs
//! usr 6 DEADBEEF                       # user data, total length incl. header
//! sent                                 # user data sent
//! bh 1                                 # backhaul initialized changed
//! joined 0                             # UWB MAC joined changed
//! evt 64                               # any other event id
//! ```

use std::fs;
use std::io;
use std::path::Path;

use log::trace;

use dwm_core::event::{EventMask, TagEvent};
use dwm_core::service::EventSource;
use dwm_core::types::{hex_decode, AnchorDistance, Result, TagError};

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Parse one script line. `None` for blank lines and comments.
pub fn parse_event_line(line: &str) -> Option<std::result::Result<TagEvent, String>> {
    let line = match line.split_once('#') {
        Some((code, _)) => code,
        None => line,
    }
    .trim();
    if line.is_empty() {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let keyword = tokens.next()?;
    let args: Vec<&str> = tokens.collect();

    Some(parse_event(keyword, &args))
}

fn parse_event(keyword: &str, args: &[&str]) -> std::result::Result<TagEvent, String> {
    match keyword {
        "loc" => {
            let anchors = args
                .iter()
                .map(|a| parse_anchor(a))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(TagEvent::LocationReady { anchors })
        }
        "usr" => {
            let (len, bytes) = args
                .split_first()
                .ok_or_else(|| "usr needs a total length".to_string())?;
            let total_len = len
                .parse::<usize>()
                .map_err(|_| format!("bad total length '{len}'"))?;
            let hex: String = bytes.concat();
            let data = hex_decode(&hex).ok_or_else(|| format!("bad hex payload '{hex}'"))?;
            Ok(TagEvent::UserDataReady { total_len, data })
        }
        "sent" => {
            expect_args(keyword, args, 0)?;
            Ok(TagEvent::UserDataSent)
        }
        "bh" => {
            expect_args(keyword, args, 1)?;
            Ok(TagEvent::BackhaulChanged {
                initialized: parse_flag(args[0])?,
            })
        }
        "joined" => {
            expect_args(keyword, args, 1)?;
            Ok(TagEvent::UwbmacJoinedChanged {
                joined: parse_flag(args[0])?,
            })
        }
        "evt" => {
            expect_args(keyword, args, 1)?;
            let id = parse_int(args[0]).ok_or_else(|| format!("bad event id '{}'", args[0]))?;
            let id = u32::try_from(id).map_err(|_| format!("event id {id} out of range"))?;
            Ok(TagEvent::Unsupported { id })
        }
        other => Err(format!("unknown event '{other}'")),
    }
}

/// Parse an `addr:mm` pair. The address is decimal or `0x` hex.
pub fn parse_anchor(token: &str) -> std::result::Result<AnchorDistance, String> {
    let (addr, mm) = token
        .split_once(':')
        .ok_or_else(|| format!("expected addr:mm, got '{token}'"))?;
    let addr = parse_int(addr).ok_or_else(|| format!("bad anchor address '{addr}'"))?;
    let dist_mm = mm
        .parse::<u32>()
        .map_err(|_| format!("bad distance '{mm}'"))?;
    Ok(AnchorDistance::new(addr, dist_mm))
}

fn parse_int(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_flag(s: &str) -> std::result::Result<bool, String> {
    match s {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("bad flag '{s}'")),
    }
}

fn expect_args(keyword: &str, args: &[&str], n: usize) -> std::result::Result<(), String> {
    if args.len() == n {
        Ok(())
    } else {
        Err(format!("{keyword} takes {n} argument(s), got {}", args.len()))
    }
}

// ---------------------------------------------------------------------------
// Script event source
// ---------------------------------------------------------------------------

/// Event source replaying a script, filtered by the registered mask.
pub struct ScriptSource {
    lines: Vec<String>,
    next: usize,
    mask: EventMask,
}

impl ScriptSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(ScriptSource::from_text(&fs::read_to_string(path)?))
    }

    pub fn from_text(text: &str) -> Self {
        ScriptSource {
            lines: text.lines().map(str::to_string).collect(),
            next: 0,
            mask: EventMask::all(),
        }
    }

    /// Parse every event in the script, ignoring the mask.
    pub fn events(&self) -> Vec<(usize, std::result::Result<TagEvent, String>)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| parse_event_line(line).map(|r| (i + 1, r)))
            .collect()
    }
}

impl EventSource for ScriptSource {
    fn register(&mut self, mask: EventMask) {
        self.mask = mask;
    }

    fn wait_event(&mut self) -> Result<Option<TagEvent>> {
        while self.next < self.lines.len() {
            let line_no = self.next + 1;
            let parsed = parse_event_line(&self.lines[self.next]);
            self.next += 1;

            match parsed {
                None => continue,
                Some(Err(reason)) => {
                    return Err(TagError::Script {
                        line: line_no,
                        reason,
                    })
                }
                Some(Ok(evt)) => {
                    if self.mask.contains(evt.kind()) {
                        return Ok(Some(evt));
                    }
                    trace!("line {line_no}: {} not registered, skipped", evt.name());
                }
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(line: &str) -> TagEvent {
        parse_event_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_location() {
        let evt = parse("loc 0xAB:1500 0x10005:999 1:123456");
        assert_eq!(
            evt,
            TagEvent::LocationReady {
                anchors: vec![
                    AnchorDistance::new(0xAB, 1500),
                    AnchorDistance::new(0x1_0005, 999),
                    AnchorDistance::new(1, 123_456),
                ]
            }
        );
    }

    #[test]
    fn test_parse_empty_location() {
        assert_eq!(parse("loc"), TagEvent::LocationReady { anchors: vec![] });
    }

    #[test]
    fn test_parse_user_data() {
        assert_eq!(
            parse("usr 6 DE AD be ef"),
            TagEvent::UserDataReady {
                total_len: 6,
                data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }
        );
        assert_eq!(
            parse("usr 2"),
            TagEvent::UserDataReady {
                total_len: 2,
                data: vec![],
            }
        );
    }

    #[test]
    fn test_parse_status_events() {
        assert_eq!(parse("sent"), TagEvent::UserDataSent);
        assert_eq!(
            parse("bh 1"),
            TagEvent::BackhaulChanged { initialized: true }
        );
        assert_eq!(
            parse("joined false"),
            TagEvent::UwbmacJoinedChanged { joined: false }
        );
        assert_eq!(parse("evt 0x40"), TagEvent::Unsupported { id: 0x40 });
    }

    #[test]
    fn test_parse_comments_and_blanks() {
        assert!(parse_event_line("").is_none());
        assert!(parse_event_line("   ").is_none());
        assert!(parse_event_line("# header").is_none());
        assert_eq!(parse("sent # trailing"), TagEvent::UserDataSent);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_event_line("loc 12").unwrap().is_err());
        assert!(parse_event_line("loc 0xZZ:10").unwrap().is_err());
        assert!(parse_event_line("loc 1:-5").unwrap().is_err());
        assert!(parse_event_line("usr").unwrap().is_err());
        assert!(parse_event_line("usr 4 ABC").unwrap().is_err());
        assert!(parse_event_line("bh").unwrap().is_err());
        assert!(parse_event_line("bh 2").unwrap().is_err());
        assert!(parse_event_line("fly away").unwrap().is_err());
    }

    #[test]
    fn test_source_filters_by_mask() {
        let mut source = ScriptSource::from_text("sent\nbh 1\n");
        source.register(EventMask::APP_DEFAULT);

        let evt = source.wait_event().unwrap();
        assert_eq!(evt, Some(TagEvent::BackhaulChanged { initialized: true }));
        assert!(source.wait_event().unwrap().is_none());
    }

    #[test]
    fn test_source_reports_bad_line_and_continues() {
        let mut source = ScriptSource::from_text("# test\nbogus\nloc 1:1000\n");
        source.register(EventMask::APP_DEFAULT);

        let err = source.wait_event().unwrap_err();
        assert!(matches!(err, TagError::Script { line: 2, .. }));
        assert!(matches!(
            source.wait_event().unwrap(),
            Some(TagEvent::LocationReady { .. })
        ));
        assert!(source.wait_event().unwrap().is_none());
    }

    #[test]
    fn test_source_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "loc 0xAB:1500").unwrap();
        writeln!(file, "joined 1").unwrap();

        let source = ScriptSource::open(file.path()).unwrap();
        let events = source.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0, 2);
    }
}
