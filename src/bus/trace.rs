//! Recorded bus traces.
//!
//! A trace is the sequence of snapshots a sampler produced, stored with
//! bincode so a session can be replayed without the board attached.

use super::{BusSample, BusSampler};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusTrace {
    pub version: u32,
    pub samples: Vec<BusSample>,
}

impl BusTrace {
    const CURRENT_VERSION: u32 = 1;

    pub fn new(samples: Vec<BusSample>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            samples,
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        log::info!(
            "Bus trace written to {} ({} samples)",
            path.as_ref().display(),
            self.samples.len()
        );
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let trace: BusTrace = bincode::deserialize_from(reader)?;
        if trace.version > Self::CURRENT_VERSION {
            return Err(BridgeError::Config(format!(
                "bus trace version {} is not supported (current: {})",
                trace.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(trace)
    }
}

/// Plays a trace back once, in order.
pub struct ReplaySampler {
    samples: Vec<BusSample>,
    pos: usize,
}

impl ReplaySampler {
    pub fn new(trace: BusTrace) -> Self {
        Self {
            samples: trace.samples,
            pos: 0,
        }
    }
}

impl BusSampler for ReplaySampler {
    fn sample(&mut self) -> io::Result<BusSample> {
        let sample = self.samples.get(self.pos).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "bus trace exhausted")
        })?;
        self.pos += 1;
        Ok(sample)
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.samples.len()
    }
}

/// Keeps a copy of up to `limit` samples taken from the wrapped sampler.
pub struct RecordingSampler<S: BusSampler> {
    inner: S,
    samples: Vec<BusSample>,
    limit: usize,
    dropped: u64,
}

impl<S: BusSampler> RecordingSampler<S> {
    /// A limit of zero records nothing.
    pub fn new(inner: S, limit: usize) -> Self {
        Self {
            inner,
            samples: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    /// Samples taken after the limit was reached.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn into_trace(self) -> (S, BusTrace) {
        (self.inner, BusTrace::new(self.samples))
    }
}

impl<S: BusSampler> BusSampler for RecordingSampler<S> {
    fn sample(&mut self) -> io::Result<BusSample> {
        let sample = self.inner.sample()?;
        if self.samples.len() < self.limit {
            self.samples.push(sample);
        } else if self.limit > 0 {
            self.dropped += 1;
        }
        Ok(sample)
    }

    fn exhausted(&self) -> bool {
        self.inner.exhausted()
    }
}
