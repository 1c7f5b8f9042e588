//! Aggregate ranging samples and encode them as the uplink text payload.
//!
//! Wire format, one line per anchor in arrival order:
//!
//! ```text
//! IIII DDD.DD\n
//! ```
//!
//! - `IIII`: anchor identifier masked to 16 bits, 4 uppercase hex digits
//! - `DDD.DD`: distance in meters, 2 decimals, field width 6
//!
//! The payload is the plain concatenation of all lines with no terminator.

use std::fmt::Write;

use log::debug;

use crate::config::EncoderConfig;
use crate::types::{AnchorDistance, RangingSample, Result, TagError};

/// Nominal line buffer size, terminator included.
pub const LINE_BUF_SIZE: usize = 13;

/// Nominal printable width of one line (`"00AB   1.50\n"`).
pub const LINE_WIDTH: usize = LINE_BUF_SIZE - 1;

/// Capacity of a fresh sample set.
pub const INITIAL_CAPACITY: usize = 1;

/// How the distance field is padded to its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// `"  1.50"`
    #[default]
    Spaces,
    /// `"001.50"`, as emitted by older tag firmware.
    Zeros,
}

impl Padding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Padding::Spaces => "spaces",
            Padding::Zeros => "zeros",
        }
    }

    pub fn parse(s: &str) -> Option<Padding> {
        match s {
            "spaces" => Some(Padding::Spaces),
            "zeros" => Some(Padding::Zeros),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sample set
// ---------------------------------------------------------------------------

/// Growable sequence of samples for one event, optionally capped.
///
/// Capacity doubles when full, clamped to the budget when one is set. Every
/// allocation goes through `try_reserve_exact`, so running out of memory (or
/// budget) is an error instead of an abort.
#[derive(Debug)]
pub struct SampleSet {
    samples: Vec<RangingSample>,
    budget: Option<usize>,
}

impl SampleSet {
    /// Create an empty set limited only by available memory.
    pub fn new() -> Result<Self> {
        SampleSet::create(None)
    }

    /// Create an empty set holding at most `budget` samples.
    pub fn with_budget(budget: usize) -> Result<Self> {
        SampleSet::create(Some(budget))
    }

    fn create(budget: Option<usize>) -> Result<Self> {
        if budget.is_some_and(|b| b < INITIAL_CAPACITY) {
            return Err(alloc_error("sample set", INITIAL_CAPACITY));
        }
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|_| alloc_error("sample set", INITIAL_CAPACITY))?;
        Ok(SampleSet { samples, budget })
    }

    /// Append a sample, growing first if the set is full.
    pub fn push(&mut self, sample: RangingSample) -> Result<()> {
        let len = self.samples.len();
        if self.budget.is_some_and(|b| len >= b) {
            return Err(alloc_error("sample set", len + 1));
        }
        if len == self.samples.capacity() {
            self.grow()?;
        }
        self.samples.push(sample);
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let len = self.samples.len();
        let mut target = (len * 2).max(INITIAL_CAPACITY);
        if let Some(budget) = self.budget {
            target = target.min(budget);
        }
        self.samples
            .try_reserve_exact(target - len)
            .map_err(|_| alloc_error("sample set", target))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn as_slice(&self) -> &[RangingSample] {
        &self.samples
    }
}

fn alloc_error(what: &'static str, requested: usize) -> TagError {
    TagError::Alloc { what, requested }
}

// ---------------------------------------------------------------------------
// Line rendering
// ---------------------------------------------------------------------------

/// Append one encoded line for `sample` to `out`.
///
/// A distance of 1000 m or more renders wider than the nominal field; the
/// line is written in full rather than truncated.
pub fn render_line(sample: &RangingSample, padding: Padding, out: &mut String) {
    // Writing to a String cannot fail.
    let _ = match padding {
        Padding::Spaces => writeln!(out, "{:04X} {:6.2}", sample.anchor_id, sample.distance_m),
        Padding::Zeros => writeln!(out, "{:04X} {:06.2}", sample.anchor_id, sample.distance_m),
    };
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Turns the anchor list of a location-ready event into an uplink payload.
#[derive(Debug, Clone)]
pub struct Encoder {
    padding: Padding,
    max_samples: Option<usize>,
}

impl Encoder {
    pub fn new(config: &EncoderConfig) -> Self {
        Encoder {
            padding: config.padding,
            max_samples: config.max_samples,
        }
    }

    /// Collect measurements into a sample set, masking identifiers and
    /// converting to meters.
    pub fn collect(&self, anchors: &[AnchorDistance]) -> Result<SampleSet> {
        let mut set = match self.max_samples {
            Some(max) => SampleSet::with_budget(max)?,
            None => SampleSet::new()?,
        };
        for &m in anchors {
            set.push(RangingSample::from(m))?;
        }
        Ok(set)
    }

    /// Render every sample into one text buffer and hand back its bytes.
    ///
    /// Consumes the sample set; it is released once the text is built.
    pub fn render(&self, samples: SampleSet) -> Result<Vec<u8>> {
        let count = samples.len();
        let mut text = String::new();
        text.try_reserve_exact(LINE_WIDTH * count)
            .map_err(|_| alloc_error("text buffer", LINE_WIDTH * count))?;

        for sample in samples.as_slice() {
            render_line(sample, self.padding, &mut text);
        }
        drop(samples);

        debug!("encoded {count} samples:\n{text}");
        Ok(text.into_bytes())
    }

    /// Full pipeline: collect, render, return the payload bytes.
    pub fn encode(&self, anchors: &[AnchorDistance]) -> Result<Vec<u8>> {
        let samples = self.collect(anchors)?;
        self.render(samples)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(&EncoderConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
