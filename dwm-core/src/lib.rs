//! dwm-core: Event dispatch and uplink payload encoding for DWM tags.
//!
//! Holds the per-event pipeline only; the `dwm-tag` binary
//! supplies the event source and the uplink writer.

pub mod config;
pub mod dispatch;
pub mod encode;
pub mod event;
pub mod service;
pub mod types;
pub mod uplink;

// Re-export commonly used types at crate root
pub use config::Config;
pub use dispatch::{Dispatcher, EventOutcome};
pub use encode::{Encoder, Padding, SampleSet};
pub use event::{EventMask, TagEvent};
pub use service::{run, EventSource, ServiceStats};
pub use types::*;
pub use uplink::{MemoryUplink, UplinkWriter, WriteStatus};
