//! Console address decoding.
//!
//! Turns a 24-bit address seen on the cartridge bus into the location it
//! refers to inside the header-stripped ROM image or the SRAM buffer.
//! Decoding is a pure function of the address and the session's mapping
//! configuration; it never touches the images themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Banks above this one mirror the lower half of the address space.
const MIRROR_FOLD_BANK: u32 = 0x80;
const MIRROR_SPAN: u32 = 0x80_0000;

/// A 24-bit console address: `bank` in bits 16-23, `offset` in bits 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Address(u32);

impl Address {
    pub const MASK: u32 = 0x00FF_FFFF;

    pub fn new(raw: u32) -> Self {
        Address(raw & Self::MASK)
    }

    #[cfg(test)]
    pub fn from_parts(bank: u8, offset: u16) -> Self {
        Address(((bank as u32) << 16) | offset as u32)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn bank(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub fn offset(self) -> u16 {
        self.0 as u16
    }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self {
        Address::new(raw)
    }
}

impl From<Address> for u32 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.bank(), self.offset())
    }
}

/// Cartridge address-to-ROM conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    LoRom,
    HiRom,
    ExLoRom,
    ExHiRom,
}

impl MappingMode {
    /// Interprets the map-mode byte of the internal header ($FFD5/$7FD5).
    /// Bit 4 is the FastROM flag and does not change the layout.
    pub fn from_map_byte(byte: u8) -> Option<Self> {
        match byte {
            0x20 | 0x30 => Some(MappingMode::LoRom),
            0x21 | 0x31 => Some(MappingMode::HiRom),
            0x32 => Some(MappingMode::ExLoRom),
            0x25 | 0x35 => Some(MappingMode::ExHiRom),
            _ => None,
        }
    }

    /// Whether addresses in this mode decode to anything at all.
    pub fn is_supported(self) -> bool {
        matches!(self, MappingMode::LoRom | MappingMode::HiRom)
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MappingMode::LoRom => "LoROM",
            MappingMode::HiRom => "HiROM",
            MappingMode::ExLoRom => "ExLoROM",
            MappingMode::ExHiRom => "ExHiROM",
        };
        f.write_str(name)
    }
}

impl FromStr for MappingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lorom" | "lo" => Ok(MappingMode::LoRom),
            "hirom" | "hi" => Ok(MappingMode::HiRom),
            "exlorom" => Ok(MappingMode::ExLoRom),
            "exhirom" => Ok(MappingMode::ExHiRom),
            other => Err(format!("unknown mapping mode '{}'", other)),
        }
    }
}

/// Where a decoded address points. Offsets are relative to the logical
/// (header-stripped) ROM image or to the start of the SRAM buffer, and
/// may still lie past the end of the image: callers range-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedLocation {
    Rom(usize),
    Sram(usize),
    Unmapped,
}

/// Policy for turning an address inside an SRAM window into a buffer offset.
///
/// Which SRAM bank a window selects is not settled for the supported
/// boards, so the formula is chosen per session instead of being fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SramAddressing {
    /// Every SRAM access points at the first byte of the buffer.
    #[default]
    BufferStart,
    /// SRAM windows are laid out back to back across banks
    /// (LoROM: 32KB per bank from $70, HiROM: 8KB per bank from $20),
    /// wrapped to the buffer size.
    Continuous,
}

impl SramAddressing {
    fn offset(self, mode: MappingMode, folded: u32, sram_size: usize) -> usize {
        match self {
            SramAddressing::BufferStart => 0,
            SramAddressing::Continuous => {
                if sram_size == 0 {
                    return 0;
                }
                let bank = (folded >> 16) as usize;
                let linear = match mode {
                    MappingMode::LoRom => {
                        bank.saturating_sub(0x70) * 0x8000 + (folded & 0x7FFF) as usize
                    }
                    MappingMode::HiRom => {
                        bank.saturating_sub(0x20) * 0x2000 + (folded & 0x1FFF) as usize
                    }
                    MappingMode::ExLoRom | MappingMode::ExHiRom => 0,
                };
                linear % sram_size
            }
        }
    }
}

impl FromStr for SramAddressing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" | "buffer-start" => Ok(SramAddressing::BufferStart),
            "continuous" => Ok(SramAddressing::Continuous),
            other => Err(format!("unknown SRAM addressing policy '{}'", other)),
        }
    }
}

/// Address decoder configured once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDecoder {
    mode: MappingMode,
    sram_addressing: SramAddressing,
    sram_size: usize,
}

impl AddressDecoder {
    pub fn new(mode: MappingMode, sram_addressing: SramAddressing, sram_size: usize) -> Self {
        Self {
            mode,
            sram_addressing,
            sram_size,
        }
    }

    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    pub fn decode(&self, address: Address) -> DecodedLocation {
        match self.mode {
            MappingMode::LoRom => self.decode_lorom(address.raw()),
            MappingMode::HiRom => self.decode_hirom(address.raw()),
            // No layout for the extended boards; they answer nothing.
            MappingMode::ExLoRom | MappingMode::ExHiRom => DecodedLocation::Unmapped,
        }
    }

    // https://en.wikibooks.org/wiki/Super_NES_Programming/SNES_memory_map#LoROM
    fn decode_lorom(&self, raw: u32) -> DecodedLocation {
        let addr = fold_mirror(raw);
        let bank = addr >> 16;
        let offset = addr & 0xFFFF;

        if bank < 0x40 && offset >= 0x8000 {
            DecodedLocation::Rom(lorom_cart_addr(addr))
        } else if bank < 0x70 {
            // 00-3F:0000-7FFF read through to the next bank up, which lands
            // bank 3F on bank 40 of the 40-6F block.
            let effective = if bank < 0x40 { addr + 0x1_0000 } else { addr };
            DecodedLocation::Rom(lorom_cart_addr(effective))
        } else if offset < 0x8000 {
            DecodedLocation::Sram(self.sram_addressing.offset(
                MappingMode::LoRom,
                addr,
                self.sram_size,
            ))
        } else {
            DecodedLocation::Rom(lorom_cart_addr(addr))
        }
    }

    // https://en.wikibooks.org/wiki/Super_NES_Programming/SNES_memory_map#HiROM
    fn decode_hirom(&self, raw: u32) -> DecodedLocation {
        let addr = fold_mirror(raw);
        let bank = addr >> 16;
        let offset = addr & 0xFFFF;

        if bank < 0x20 {
            DecodedLocation::Rom(addr as usize)
        } else if bank < 0x40 {
            if offset < 0x8000 {
                DecodedLocation::Sram(self.sram_addressing.offset(
                    MappingMode::HiRom,
                    addr,
                    self.sram_size,
                ))
            } else {
                DecodedLocation::Rom(addr as usize)
            }
        } else {
            DecodedLocation::Rom((addr - 0x40_0000) as usize)
        }
    }
}

/// Decodes with the default SRAM policy and no knowledge of the SRAM size.
pub fn decode(address: Address, mode: MappingMode) -> DecodedLocation {
    AddressDecoder::new(mode, SramAddressing::default(), 0).decode(address)
}

/// Folds banks $81-$FF onto $01-$7F. Bank $80 itself is left in place.
#[inline]
fn fold_mirror(addr: u32) -> u32 {
    if addr >> 16 > MIRROR_FOLD_BANK {
        addr - MIRROR_SPAN
    } else {
        addr
    }
}

#[inline]
fn lorom_cart_addr(addr: u32) -> usize {
    let cart_bank = (addr & 0x11_0000) >> 1;
    (cart_bank + (addr & 0x7FFF)) as usize
}

#[cfg(test)]
mod tests;
