mod bus;
mod cartridge;
mod config;
mod debug;
mod debug_flags;
mod error;
mod mapping;
mod memory;
mod monitor;
mod shutdown;
mod sram;
mod transport;

use bus::{BusSampler, BusTrace, PinSampler, RecordingSampler, ReplaySampler, SysfsGpio};
use cartridge::Cartridge;
use config::{BusSource, Command, SessionConfig};
use error::{BridgeError, Result};
use mapping::AddressDecoder;
use memory::ImageStore;
use monitor::{CartLoop, LoopConfig};
use std::env;
use sram::SramSnapshot;
use std::process;
use transport::ByteSink;

const HEADER_DUMP_START: usize = 0x7FC0;
const HEADER_DUMP_END: usize = 0x8000;

fn main() {
    let default_level = if debug_flags::quiet() { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("snes-cart-bridge");

    let config = match config::parse_args(&args, |key| env::var(key).ok()) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            eprintln!("{}", config::usage(program));
            return;
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", config::usage(program));
            process::exit(2);
        }
    };

    // Ctrl-C/SIGTERM end the loop so SRAM is persisted on the way out
    shutdown::install();

    if let Err(e) = run(&config) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(config: &SessionConfig) -> Result<()> {
    log::info!("Loading ROM: {}", config.rom_path.display());
    let cartridge = Cartridge::load_from_file(&config.rom_path)?;
    let header = &cartridge.header;
    let (mode, mode_source) = config.mapping.resolve(header);

    log::info!("Title: {}", header.title);
    log::info!(
        "Mapping: {} ({}, map byte 0x{:02X}, {})",
        mode,
        mode_source,
        header.map_mode,
        if header.fast_rom { "FastROM" } else { "SlowROM" }
    );
    log::info!(
        "ROM: {} KB{}, SRAM: {} bytes",
        cartridge.rom.len() / 1024,
        if cartridge.has_copier_header() {
            " (copier header stripped)"
        } else {
            ""
        },
        header.sram_size
    );
    if !mode.is_supported() {
        log::warn!("{} is not emulated; the cartridge will not answer any read", mode);
    }

    if config.dump_header {
        print!(
            "{}",
            debug::hex_dump(cartridge.rom.as_slice(), HEADER_DUMP_START, HEADER_DUMP_END)
        );
    }

    let sram_size = header.sram_size;
    let mut store = ImageStore::new(cartridge.rom, sram_size);
    let save = if config.ignore_sram {
        log::info!("IGNORE_SRAM set, starting with fresh SRAM; the save file is left alone");
        None
    } else {
        sram::load_sram(&config.sram_path)?
    };
    if let Some(save) = &save {
        if save.len() != sram_size {
            log::warn!(
                "Save is {} bytes but the header asks for {}; fitting it",
                save.len(),
                sram_size
            );
        }
        store.load_sram(save);
    }
    let snapshot = (config.save_sram && !config.ignore_sram)
        .then(|| SramSnapshot::new(save, store.sram()));

    let decoder = AddressDecoder::new(mode, config.sram_addressing, store.sram_len());

    match &config.bus_source {
        BusSource::Gpio => {
            let gpio = SysfsGpio::new(config.pin_layout.lines()).map_err(BridgeError::Sample)?;
            let sink = transport::open_serial(&config.output, config.baud_rate)
                .map_err(BridgeError::Transport)?;
            let sampler = PinSampler::new(gpio, config.pin_layout);
            serve(config, decoder, store, snapshot, sampler, sink)
        }
        BusSource::Replay(path) => {
            let trace = BusTrace::load_from_file(path)?;
            log::info!("Replaying {} bus samples from {}", trace.samples.len(), path.display());
            let sink = transport::open_file(&config.output).map_err(BridgeError::Transport)?;
            serve(config, decoder, store, snapshot, ReplaySampler::new(trace), sink)
        }
    }
}

fn serve<S: BusSampler, T: ByteSink>(
    config: &SessionConfig,
    decoder: AddressDecoder,
    store: ImageStore,
    snapshot: Option<SramSnapshot>,
    sampler: S,
    sink: T,
) -> Result<()> {
    let record_limit = if config.record.is_some() {
        config.record_limit
    } else {
        0
    };
    let loop_config = LoopConfig {
        latency_budget: config.latency_budget,
        trace_cycles: config.trace_cycles,
    };
    let mut cart = CartLoop::new(
        decoder,
        store,
        RecordingSampler::new(sampler, record_limit),
        sink,
        loop_config,
    );

    let outcome = cart.run();
    let (recorder, _sink, store) = cart.into_parts();

    // Teardown runs whether or not the loop failed.
    if let Some(path) = &config.record {
        if recorder.dropped() > 0 {
            log::warn!(
                "Trace limit reached, {} samples were not recorded",
                recorder.dropped()
            );
        }
        let (_, trace) = recorder.into_trace();
        if let Err(e) = trace.save_to_file(path) {
            log::error!("Failed to write bus trace to {}: {}", path.display(), e);
        }
    }
    if let Some(snapshot) = &snapshot {
        match snapshot.contents_to_persist(store.sram()) {
            Some(data) => {
                if let Err(e) = sram::save_sram(&config.sram_path, &data) {
                    log::error!("Failed to save SRAM to {}: {}", config.sram_path.display(), e);
                }
            }
            None => log::info!("SRAM unchanged, {} left as is", config.sram_path.display()),
        }
    }

    let stats = outcome?;
    log::info!(
        "Stopped after {} polls: {} active, {} bytes sent, {} reads unanswered, {} writes ignored",
        stats.iterations,
        stats.active_cycles,
        stats.bytes_sent,
        stats.unmapped_reads,
        stats.ignored_writes
    );
    if config.latency_budget.is_some() {
        log::info!(
            "Worst iteration {:?}, {} over budget",
            stats.worst_iteration,
            stats.latency_overruns
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("snes-cart-bridge-main-{}", std::process::id()))
            .join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// 32 KB LoROM image with the given SRAM size class.
    fn write_rom(dir: &Path, sram_class: u8) -> PathBuf {
        let mut rom = vec![0u8; 0x8000];
        rom[0x7FC0..0x7FC4].copy_from_slice(b"TEST");
        rom[0x7FD5] = 0x20;
        rom[0x7FD8] = sram_class;
        rom[0x7FDC] = 0xFF;
        rom[0x7FDD] = 0xFF;
        let path = dir.join("game.sfc");
        fs::write(&path, rom).unwrap();
        path
    }

    /// Replays an empty trace into a plain output file.
    fn replay_config(dir: &Path, rom: PathBuf) -> SessionConfig {
        let trace = dir.join("empty.trace");
        BusTrace::new(Vec::new()).save_to_file(&trace).unwrap();
        let output = dir.join("bus.out");
        fs::write(&output, b"").unwrap();

        let mut config = SessionConfig::new(rom);
        config.bus_source = BusSource::Replay(trace);
        config.output = output;
        config
    }

    #[test]
    fn test_ignored_save_is_left_alone() {
        let dir = scratch_dir("ignore");
        let mut config = replay_config(&dir, write_rom(&dir, 3));
        let save = vec![0xAB; 0x2000];
        fs::write(&config.sram_path, &save).unwrap();
        config.ignore_sram = true;

        run(&config).unwrap();

        assert_eq!(fs::read(&config.sram_path).unwrap(), save);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_oversized_save_is_not_truncated() {
        let dir = scratch_dir("oversized");
        let config = replay_config(&dir, write_rom(&dir, 3));
        let save: Vec<u8> = (0..0x8000).map(|i| i as u8).collect();
        fs::write(&config.sram_path, &save).unwrap();

        run(&config).unwrap();

        assert_eq!(fs::read(&config.sram_path).unwrap(), save);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_untouched_fresh_sram_creates_no_save() {
        let dir = scratch_dir("fresh");
        let config = replay_config(&dir, write_rom(&dir, 1));

        run(&config).unwrap();

        assert!(!config.sram_path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_teardown_writes_changed_sram() {
        let dir = scratch_dir("changed");
        let config = replay_config(&dir, write_rom(&dir, 1));
        let save = vec![0x11; 0x1000];
        fs::write(&config.sram_path, &save).unwrap();

        let cartridge = Cartridge::load_from_file(&config.rom_path).unwrap();
        let mut store = ImageStore::new(cartridge.rom, 0x800);
        store.load_sram(&save);
        let snapshot = SramSnapshot::new(Some(save.clone()), store.sram());
        store.load_sram(&[0x22]);

        let decoder = AddressDecoder::new(
            cartridge.header.mapping,
            config.sram_addressing,
            store.sram_len(),
        );
        let sampler = ReplaySampler::new(BusTrace::new(Vec::new()));
        serve(&config, decoder, store, Some(snapshot), sampler, Vec::new()).unwrap();

        let written = fs::read(&config.sram_path).unwrap();
        assert_eq!(written.len(), save.len());
        assert_eq!(written[0], 0x22);
        assert!(written[1..].iter().all(|&b| b == 0x11));
        let _ = fs::remove_dir_all(&dir);
    }
}
