//! Uplink writer that streams payloads to stdout or a file.

use std::io::Write;

use log::{debug, error};

use dwm_core::uplink::{UplinkWriter, WRITE_INTERNAL, WRITE_INVALID_PARAMETER, WRITE_OK};

/// Writes each payload verbatim to `out`, enforcing an optional frame limit.
pub struct StreamUplink<W: Write> {
    out: W,
    max_frame: Option<usize>,
    pub frames: u64,
    pub bytes: u64,
}

impl<W: Write> StreamUplink<W> {
    pub fn new(out: W, max_frame: Option<usize>) -> Self {
        StreamUplink {
            out,
            max_frame,
            frames: 0,
            bytes: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> UplinkWriter for StreamUplink<W> {
    fn usr_data_write(&mut self, data: &[u8], important: bool) -> i32 {
        if let Some(max) = self.max_frame {
            if data.len() > max {
                debug!("frame of {} bytes exceeds limit of {max}", data.len());
                return WRITE_INVALID_PARAMETER;
            }
        }

        if let Err(e) = self.out.write_all(data).and_then(|_| self.out.flush()) {
            error!("uplink output failed: {e}");
            return WRITE_INTERNAL;
        }

        self.frames += 1;
        self.bytes += data.len() as u64;
        debug!("uplink frame {} ({} bytes, important={important})", self.frames, data.len());
        WRITE_OK
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
