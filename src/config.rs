//! Session configuration, fixed before the loop starts.

use crate::bus::PinLayout;
use crate::cartridge::CartridgeHeader;
use crate::debug_flags::parse_flag;
use crate::error::{BridgeError, Result};
use crate::mapping::{MappingMode, SramAddressing};
use crate::sram;
use crate::transport::DEFAULT_BAUD_RATE;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT: &str = "/dev/ttyACM0";
pub const DEFAULT_RECORD_LIMIT: usize = 1_000_000;

/// How the session picks its mapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingSelection {
    /// Use what the ROM header says.
    #[default]
    FromHeader,
    /// Override the header; meant for bring-up and debugging.
    Forced(MappingMode),
}

impl MappingSelection {
    pub fn resolve(self, header: &CartridgeHeader) -> (MappingMode, &'static str) {
        match self {
            MappingSelection::FromHeader => (header.mapping, "header"),
            MappingSelection::Forced(mode) => (mode, "forced"),
        }
    }

    fn parse(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("header") || value.eq_ignore_ascii_case("auto") {
            return Ok(MappingSelection::FromHeader);
        }
        value
            .parse::<MappingMode>()
            .map(MappingSelection::Forced)
            .map_err(BridgeError::Config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusSource {
    Gpio,
    Replay(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub rom_path: PathBuf,
    pub sram_path: PathBuf,
    pub mapping: MappingSelection,
    pub sram_addressing: SramAddressing,
    pub output: PathBuf,
    /// Serial line speed; unused when replaying into a plain file.
    pub baud_rate: u32,
    pub bus_source: BusSource,
    pub pin_layout: PinLayout,
    pub record: Option<PathBuf>,
    pub record_limit: usize,
    /// Longest a single poll may take before the console's bus cycle is
    /// missed. `None` disables the measurement.
    pub latency_budget: Option<Duration>,
    pub dump_header: bool,
    pub ignore_sram: bool,
    pub save_sram: bool,
    pub trace_cycles: bool,
}

impl SessionConfig {
    pub fn new(rom_path: PathBuf) -> Self {
        Self {
            sram_path: sram::get_save_file_path(&rom_path),
            rom_path,
            mapping: MappingSelection::default(),
            sram_addressing: SramAddressing::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            baud_rate: DEFAULT_BAUD_RATE,
            bus_source: BusSource::Gpio,
            pin_layout: PinLayout::wiring(),
            record: None,
            record_limit: DEFAULT_RECORD_LIMIT,
            latency_budget: None,
            dump_header: false,
            ignore_sram: false,
            save_sram: true,
            trace_cycles: false,
        }
    }
}

pub enum Command {
    Run(SessionConfig),
    Help,
}

/// Parses `args` (program name first), consulting `env` for anything the
/// command line leaves unset.
pub fn parse_args<F>(args: &[String], env: F) -> Result<Command>
where
    F: Fn(&str) -> Option<String>,
{
    if args.iter().skip(1).any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }

    let mut rom_arg: Option<String> = None;
    let mut sram_arg = env("SRAM_PATH");
    let mut mode_arg = env("FORCE_MAPPING");
    let mut sram_addressing_arg = env("SRAM_ADDRESSING");
    let mut output_arg = env("CART_OUTPUT");
    let mut baud_arg = env("CART_BAUD");
    let mut latency_arg = env("MAX_ITERATION_NS");
    let mut replay: Option<PathBuf> = None;
    let mut record: Option<PathBuf> = None;
    let mut record_limit: Option<String> = None;
    let mut dump_header = env_flag(&env, "DEBUG_DUMP");
    let mut save_sram = !env_flag(&env, "NO_SRAM_SAVE");
    let mut active_low = env_flag(&env, "CONTROL_ACTIVE_LOW");

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--sram" | "--mode" | "--sram-addressing" | "--output" | "--baud" | "--replay"
            | "--record" | "--record-limit" | "--max-latency-ns" => {
                let value = args
                    .get(i + 1)
                    .cloned()
                    .ok_or_else(|| BridgeError::Config(format!("{} requires a value", arg)))?;
                match arg {
                    "--sram" => sram_arg = Some(value),
                    "--mode" => mode_arg = Some(value),
                    "--sram-addressing" => sram_addressing_arg = Some(value),
                    "--output" => output_arg = Some(value),
                    "--baud" => baud_arg = Some(value),
                    "--replay" => replay = Some(PathBuf::from(value)),
                    "--record" => record = Some(PathBuf::from(value)),
                    "--record-limit" => record_limit = Some(value),
                    _ => latency_arg = Some(value),
                }
                i += 2;
            }
            "--dump-header" => {
                dump_header = true;
                i += 1;
            }
            "--no-sram-save" => {
                save_sram = false;
                i += 1;
            }
            "--active-low" => {
                active_low = true;
                i += 1;
            }
            s if s.starts_with('-') => {
                return Err(BridgeError::Config(format!("unknown option: {}", s)));
            }
            s => {
                if rom_arg.is_some() {
                    return Err(BridgeError::Config(format!("unexpected argument: {}", s)));
                }
                rom_arg = Some(s.to_string());
                i += 1;
            }
        }
    }

    let rom_path = rom_arg
        .map(PathBuf::from)
        .ok_or_else(|| BridgeError::Config("ROM argument missing".to_string()))?;
    let mut config = SessionConfig::new(rom_path);

    if let Some(path) = sram_arg {
        config.sram_path = PathBuf::from(path);
    }
    if let Some(mode) = mode_arg {
        config.mapping = MappingSelection::parse(&mode)?;
    }
    if let Some(policy) = sram_addressing_arg {
        config.sram_addressing = policy.parse().map_err(BridgeError::Config)?;
    }
    if let Some(output) = output_arg {
        config.output = PathBuf::from(output);
    }
    if let Some(baud) = baud_arg {
        config.baud_rate = u32::try_from(parse_number(&baud, "--baud")?)
            .ok()
            .filter(|&rate| rate > 0)
            .ok_or_else(|| BridgeError::Config(format!("--baud: {} is out of range", baud)))?;
    }
    if let Some(path) = replay {
        config.bus_source = BusSource::Replay(path);
    }
    if let Some(limit) = record_limit {
        config.record_limit = parse_number(&limit, "--record-limit")? as usize;
    }
    if let Some(ns) = latency_arg {
        config.latency_budget = Some(Duration::from_nanos(parse_number(&ns, "--max-latency-ns")?));
    }
    config.record = record;
    config.pin_layout.control_active_low = active_low;
    config.dump_header = dump_header;
    config.save_sram = save_sram;
    config.ignore_sram = env_flag(&env, "IGNORE_SRAM");
    config.trace_cycles = env_flag(&env, "DEBUG_BUS");

    Ok(Command::Run(config))
}

fn env_flag<F>(env: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    env(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_number(s: &str, what: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|_| BridgeError::Config(format!("{}: '{}' is not a number", what, s)))
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--mode lorom|hirom|exlorom|exhirom|header] [--sram PATH] \
         [--sram-addressing start|continuous] [--output DEVICE] [--baud RATE] [--replay TRACE] \
         [--record TRACE] [--record-limit N] [--max-latency-ns N] [--active-low] \
         [--dump-header] [--no-sram-save] <rom>",
        program
    )
}
