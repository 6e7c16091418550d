use std::fs::{self, create_dir_all};
use std::io::{ErrorKind, Result};
use std::path::{Path, PathBuf};

pub fn get_save_file_path(rom_path: &Path) -> PathBuf {
    let mut save_path = rom_path.to_path_buf();
    save_path.set_extension("sav");
    save_path
}

/// Reads a prior save. A missing file is not an error: `Ok(None)`.
pub fn load_sram(save_path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(save_path) {
        Ok(data) => {
            log::info!(
                "Loaded {} bytes of save data from {}",
                data.len(),
                save_path.display()
            );
            Ok(Some(data))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No save found at {}, starting with fresh SRAM", save_path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Writes SRAM next to the target first and renames it over, so a crash
/// mid-write never leaves a truncated save behind.
pub fn save_sram(save_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = save_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let mut tmp = save_path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, data)?;
    fs::rename(&tmp, save_path)?;

    log::info!("Saved {} bytes of SRAM to {}", data.len(), save_path.display());
    Ok(())
}

/// SRAM as the session found it, kept so teardown only writes when
/// something changed and never shortens the save on disk.
pub struct SramSnapshot {
    on_disk: Option<Vec<u8>>,
    initial: Vec<u8>,
}

impl SramSnapshot {
    pub fn new(on_disk: Option<Vec<u8>>, initial: &[u8]) -> Self {
        Self {
            on_disk,
            initial: initial.to_vec(),
        }
    }

    /// Bytes to write back, or `None` when `current` still matches the
    /// buffer the session started with. Save bytes past the end of the
    /// buffer are carried over unchanged.
    pub fn contents_to_persist(&self, current: &[u8]) -> Option<Vec<u8>> {
        if current == self.initial.as_slice() {
            return None;
        }
        let mut data = current.to_vec();
        if let Some(save) = &self.on_disk {
            if save.len() > data.len() {
                data.extend_from_slice(&save[data.len()..]);
            }
        }
        Some(data)
    }
}
