//! The cartridge loop: poll the bus, decode, answer reads.
//!
//! # Timing
//!
//! The loop busy-polls. A bus transition that starts and ends between two
//! samples is never seen, so one iteration (sample, decode, lookup, send)
//! must finish within the console's bus cycle. Run it on a dedicated core
//! and set `LoopConfig::latency_budget` to have overruns counted and
//! reported.

use crate::bus::{BusSample, BusSampler};
use crate::error::{BridgeError, Result};
use crate::mapping::{Address, AddressDecoder, DecodedLocation};
use crate::memory::ImageStore;
use crate::shutdown;
use crate::transport::ByteSink;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Cartridge-select deasserted.
    Idle,
    /// The console is addressing the cartridge.
    Active,
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Idle,
    /// Read strobe asserted and the byte went out.
    Served {
        address: Address,
        location: DecodedLocation,
        byte: u8,
    },
    /// Read strobe asserted but nothing lives there; the bus is left alone.
    NoData {
        address: Address,
        location: DecodedLocation,
    },
    /// Selected, but neither strobe asserted.
    NotRead {
        address: Address,
        location: DecodedLocation,
    },
    /// The console is writing. Writes are not emulated: nothing is read
    /// from the bus and SRAM is left untouched.
    WriteIgnored {
        address: Address,
        location: DecodedLocation,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub active_cycles: u64,
    pub bytes_sent: u64,
    pub unmapped_reads: u64,
    pub ignored_writes: u64,
    pub latency_overruns: u64,
    pub worst_iteration: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoopConfig {
    pub latency_budget: Option<Duration>,
    pub trace_cycles: bool,
}

pub struct CartLoop<S: BusSampler, T: ByteSink> {
    sampler: S,
    sink: T,
    decoder: AddressDecoder,
    store: ImageStore,
    config: LoopConfig,
    state: BusState,
    stats: LoopStats,
}

impl<S: BusSampler, T: ByteSink> CartLoop<S, T> {
    pub fn new(
        decoder: AddressDecoder,
        store: ImageStore,
        sampler: S,
        sink: T,
        config: LoopConfig,
    ) -> Self {
        Self {
            sampler,
            sink,
            decoder,
            store,
            config,
            state: BusState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Runs one poll of the bus.
    pub fn step(&mut self) -> Result<Cycle> {
        let sample = self.sampler.sample().map_err(BridgeError::Sample)?;
        self.stats.iterations += 1;

        if !sample.cart_selected() {
            if self.state == BusState::Active && self.config.trace_cycles {
                log::trace!("cart deselected");
            }
            self.state = BusState::Idle;
            return Ok(Cycle::Idle);
        }
        self.state = BusState::Active;
        self.stats.active_cycles += 1;

        let cycle = self.serve(sample)?;
        if self.config.trace_cycles {
            log::debug!("{:?}", cycle);
        }
        Ok(cycle)
    }

    fn serve(&mut self, sample: BusSample) -> Result<Cycle> {
        let address = sample.address;
        let location = self.decoder.decode(address);

        if sample.reading() {
            // Out-of-range offsets come back as None, same as Unmapped.
            match self.store.get(location) {
                Some(byte) => {
                    self.sink.send(byte).map_err(BridgeError::Transport)?;
                    self.stats.bytes_sent += 1;
                    Ok(Cycle::Served {
                        address,
                        location,
                        byte,
                    })
                }
                None => {
                    self.stats.unmapped_reads += 1;
                    Ok(Cycle::NoData { address, location })
                }
            }
        } else if sample.writing() {
            if self.stats.ignored_writes == 0 {
                log::warn!(
                    "Console write at {} ignored; cartridge writes are not emulated",
                    address
                );
            }
            self.stats.ignored_writes += 1;
            Ok(Cycle::WriteIgnored { address, location })
        } else {
            Ok(Cycle::NotRead { address, location })
        }
    }

    /// Polls until shutdown is requested or the sampler runs dry.
    /// A transport or sampling failure ends the session with an error.
    pub fn run(&mut self) -> Result<LoopStats> {
        log::info!("Cartridge loop running ({})", self.decoder.mode());

        match self.config.latency_budget {
            Some(budget) => {
                while !shutdown::should_quit() && !self.sampler.exhausted() {
                    let started = Instant::now();
                    self.step()?;
                    self.record_latency(started.elapsed(), budget);
                }
            }
            None => {
                while !shutdown::should_quit() && !self.sampler.exhausted() {
                    self.step()?;
                }
            }
        }

        self.sink.flush().map_err(BridgeError::Transport)?;
        Ok(self.stats.clone())
    }

    fn record_latency(&mut self, elapsed: Duration, budget: Duration) {
        if elapsed > self.stats.worst_iteration {
            self.stats.worst_iteration = elapsed;
        }
        if elapsed > budget {
            if self.stats.latency_overruns == 0 {
                log::warn!(
                    "Loop iteration took {:?}, over the {:?} budget; bus cycles may be missed",
                    elapsed,
                    budget
                );
            }
            self.stats.latency_overruns += 1;
        }
    }

    pub fn into_parts(self) -> (S, T, ImageStore) {
        (self.sampler, self.sink, self.store)
    }
}
