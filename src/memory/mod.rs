use crate::mapping::DecodedLocation;

/// Copier headers are padded to 512 bytes; real images are whole KB.
const COPIER_GRANULE: usize = 0x400;
pub const COPIER_HEADER_LEN: usize = 0x200;

/// Logical ROM image: an owned file buffer seen from a fixed base offset.
///
/// All decoder offsets are relative to `base`, never to the raw buffer,
/// so a stripped copier header can not shift the mapping.
pub struct RomImage {
    raw: Vec<u8>,
    base: usize,
}

impl RomImage {
    /// Skips `len % 0x400` leading bytes as a copier header.
    pub fn from_file_bytes(raw: Vec<u8>) -> Self {
        let base = raw.len() % COPIER_GRANULE;
        Self { raw, base }
    }

    /// Bytes skipped in front of the logical image.
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.raw.len() - self.base
    }

    #[inline]
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.as_slice().get(offset).copied()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.raw[self.base..]
    }
}

/// ROM and SRAM buffers owned by a running session.
pub struct ImageStore {
    rom: RomImage,
    sram: Vec<u8>,
}

impl ImageStore {
    /// Creates the store with a zero-filled SRAM buffer of `sram_size` bytes.
    pub fn new(rom: RomImage, sram_size: usize) -> Self {
        Self {
            rom,
            sram: vec![0; sram_size],
        }
    }

    /// Byte behind a decoded location, if the location lies inside an image.
    #[inline]
    pub fn get(&self, location: DecodedLocation) -> Option<u8> {
        match location {
            DecodedLocation::Rom(offset) => self.rom.get(offset),
            DecodedLocation::Sram(offset) => self.sram.get(offset).copied(),
            DecodedLocation::Unmapped => None,
        }
    }

    /// Copies a prior save into SRAM; extra bytes are dropped and a short
    /// save leaves the tail zeroed. Returns the number of bytes taken.
    pub fn load_sram(&mut self, save: &[u8]) -> usize {
        let len = save.len().min(self.sram.len());
        self.sram[..len].copy_from_slice(&save[..len]);
        len
    }

    pub fn rom(&self) -> &RomImage {
        &self.rom
    }

    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    pub fn sram_len(&self) -> usize {
        self.sram.len()
    }
}
