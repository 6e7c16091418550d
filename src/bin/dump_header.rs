#![allow(dead_code)]

#[path = "../cartridge.rs"]
mod cartridge;
#[path = "../debug.rs"]
mod debug;
#[path = "../error.rs"]
mod error;
#[path = "../mapping/mod.rs"]
mod mapping;
#[path = "../memory/mod.rs"]
mod memory;

use crate::cartridge::Cartridge;
use std::env;
use std::path::PathBuf;
use std::process;

// ROM header dump
// Usage:
//   cargo run --bin dump_header -- "roms/Super Mario World (U) [!].smc" --start 0x7FC0 --len 0x40
// Defaults come from HEADER_START / HEADER_LEN when the flags are absent.

fn parse_usize_hex_or_dec(s: &str) -> Option<usize> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x") {
        usize::from_str_radix(stripped, 16).ok()
    } else {
        s.parse::<usize>().ok()
    }
}

fn parse_args() -> Result<(PathBuf, Option<usize>, usize), String> {
    let mut args = env::args().skip(1);
    let mut rom: Option<PathBuf> = None;
    let mut start: Option<usize> = None;
    let mut len: Option<usize> = None;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--start" => {
                let v = args.next().ok_or("--start requires a value")?;
                start = Some(parse_usize_hex_or_dec(&v).ok_or("--start: not a number")?);
            }
            "--len" | "--length" => {
                let v = args.next().ok_or("--len requires a value")?;
                len = Some(parse_usize_hex_or_dec(&v).ok_or("--len: not a number")?);
            }
            _ => {
                if rom.is_none() {
                    rom = Some(PathBuf::from(&a));
                }
            }
        }
    }

    let rom = rom.ok_or("ROM path is required")?;
    let start = start.or_else(|| {
        env::var("HEADER_START")
            .ok()
            .and_then(|s| parse_usize_hex_or_dec(&s))
    });
    let len = len
        .or_else(|| {
            env::var("HEADER_LEN")
                .ok()
                .and_then(|s| parse_usize_hex_or_dec(&s))
        })
        .unwrap_or(0x40);

    Ok((rom, start, len))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (rom_path, start, len) = match parse_args() {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("Usage: dump_header <rom> [--start ADDR] [--len N]");
            process::exit(2);
        }
    };

    let cart = match Cartridge::load_from_file(&rom_path) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("Failed to load {}: {}", rom_path.display(), e);
            process::exit(1);
        }
    };

    let header = &cart.header;
    println!("Title:      {}", header.title);
    println!(
        "Header:     {:?} at 0x{:04X}",
        header.location,
        header.location.offset()
    );
    println!(
        "Map mode:   0x{:02X} -> {} ({})",
        header.map_mode,
        header.mapping,
        if header.fast_rom { "FastROM" } else { "SlowROM" }
    );
    println!(
        "SRAM:       class 0x{:02X} -> {} bytes",
        header.sram_size_class, header.sram_size
    );
    println!(
        "Checksum:   0x{:04X} / complement 0x{:04X}",
        header.checksum, header.checksum_complement
    );
    println!(
        "Image:      {} bytes{}",
        cart.rom.len(),
        if cart.has_copier_header() {
            " after copier header"
        } else {
            ""
        }
    );

    let start = start.unwrap_or_else(|| header.location.offset());
    println!();
    print!(
        "{}",
        debug::hex_dump(cart.rom.as_slice(), start, start.saturating_add(len))
    );
}
