use crate::error::{BridgeError, Result};
use crate::mapping::MappingMode;
use crate::memory::RomImage;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default SRAM size when the header's size class is unusable.
pub const DEFAULT_SRAM_SIZE: usize = 0x2000;
const MAX_SRAM_SIZE_CLASS: u8 = 0x0F;

/// Where the internal header sits in the logical image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLocation {
    Lo,
    Hi,
}

impl HeaderLocation {
    pub fn offset(self) -> usize {
        match self {
            HeaderLocation::Lo => 0x7FC0,
            HeaderLocation::Hi => 0xFFC0,
        }
    }

    /// Mode a header at this location belongs to.
    pub fn implied_mode(self) -> MappingMode {
        match self {
            HeaderLocation::Lo => MappingMode::LoRom,
            HeaderLocation::Hi => MappingMode::HiRom,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub location: HeaderLocation,
    pub map_mode: u8,
    /// Layout from the map-mode byte, or from the header location when
    /// the byte names something else.
    pub mapping: MappingMode,
    pub fast_rom: bool,
    pub sram_size_class: u8,
    pub sram_size: usize,
    pub checksum: u16,
    pub checksum_complement: u16,
}

pub struct Cartridge {
    pub rom: RomImage,
    pub header: CartridgeHeader,
}

impl Cartridge {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Self::load_from_bytes(data)
    }

    pub fn load_from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(BridgeError::Header("ROM file is empty".to_string()));
        }

        let rom = RomImage::from_file_bytes(data);
        match rom.base() {
            0 => {}
            crate::memory::COPIER_HEADER_LEN => log::info!("Copier header found, skipping 512 bytes"),
            odd => log::warn!(
                "ROM size is {} bytes past a 1KB boundary; skipping them as a header",
                odd
            ),
        }

        let header = Self::parse_header(rom.as_slice())?;
        Ok(Cartridge { rom, header })
    }

    pub fn has_copier_header(&self) -> bool {
        self.rom.base() != 0
    }

    fn parse_header(rom: &[u8]) -> Result<CartridgeHeader> {
        let location = Self::locate_header(rom)?;
        let base = location.offset();

        let title = Self::extract_title(&rom[base..base + 21]);
        let map_mode = rom[base + 0x15];
        let mapping = match MappingMode::from_map_byte(map_mode) {
            Some(mode) => mode,
            None => {
                let fallback = location.implied_mode();
                log::warn!(
                    "Unknown map mode byte 0x{:02X}, using {} from the header location",
                    map_mode,
                    fallback
                );
                fallback
            }
        };

        let sram_size_class = rom[base + 0x18];
        let sram_size = Self::decode_sram_size(sram_size_class);

        let checksum_complement = u16::from_le_bytes([rom[base + 0x1C], rom[base + 0x1D]]);
        let checksum = u16::from_le_bytes([rom[base + 0x1E], rom[base + 0x1F]]);

        Ok(CartridgeHeader {
            title,
            location,
            map_mode,
            mapping,
            fast_rom: map_mode & 0x10 != 0,
            sram_size_class,
            sram_size,
            checksum,
            checksum_complement,
        })
    }

    /// The LoROM header wins when its checksum and complement bytes are
    /// bitwise complements of each other; otherwise the header is HiROM.
    fn locate_header(rom: &[u8]) -> Result<HeaderLocation> {
        if rom.len() < 0x8000 {
            return Err(BridgeError::Header(format!(
                "ROM too small to contain a header ({} bytes)",
                rom.len()
            )));
        }

        if (rom[0x7FDC] | rom[0x7FDE]) == 0xFF && (rom[0x7FDD] | rom[0x7FDF]) == 0xFF {
            return Ok(HeaderLocation::Lo);
        }

        if rom.len() < 0x10000 {
            return Err(BridgeError::Header(
                "no LoROM header and ROM too small for a HiROM header".to_string(),
            ));
        }
        Ok(HeaderLocation::Hi)
    }

    fn extract_title(title_bytes: &[u8]) -> String {
        let mut title = String::new();
        for &byte in title_bytes {
            if byte == 0x00 {
                break;
            } else if (0x20..=0x7E).contains(&byte) {
                title.push(byte as char);
            } else if byte >= 0x80 {
                title.push('?');
            }
        }
        title.trim().to_string()
    }

    fn decode_sram_size(size_class: u8) -> usize {
        if size_class > MAX_SRAM_SIZE_CLASS {
            log::warn!(
                "SRAM size class 0x{:02X} out of range, assuming {} bytes",
                size_class,
                DEFAULT_SRAM_SIZE
            );
            return DEFAULT_SRAM_SIZE;
        }
        0x400usize << size_class
    }
}
