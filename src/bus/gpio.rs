use super::GpioLines;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Line access through the Linux sysfs GPIO interface.
///
/// Every line is exported and switched to input once, at construction;
/// afterwards a read is a seek plus a one-byte read on a held handle.
pub struct SysfsGpio {
    values: Vec<Option<File>>,
}

impl SysfsGpio {
    pub fn new<I: IntoIterator<Item = u8>>(lines: I) -> io::Result<Self> {
        Self::with_root(SYSFS_GPIO_ROOT, lines)
    }

    pub fn with_root<P: AsRef<Path>, I: IntoIterator<Item = u8>>(
        root: P,
        lines: I,
    ) -> io::Result<Self> {
        let root = root.as_ref();
        let mut values: Vec<Option<File>> = Vec::new();
        for line in lines {
            let dir = Self::export(root, line)?;
            fs::write(dir.join("direction"), "in")?;
            let value = File::open(dir.join("value"))?;

            let idx = line as usize;
            if values.len() <= idx {
                values.resize_with(idx + 1, || None);
            }
            values[idx] = Some(value);
        }
        log::debug!("sysfs GPIO ready under {}", root.display());
        Ok(Self { values })
    }

    fn export(root: &Path, line: u8) -> io::Result<PathBuf> {
        let dir = root.join(format!("gpio{}", line));
        if !dir.exists() {
            let mut export = OpenOptions::new().write(true).open(root.join("export"))?;
            export.write_all(line.to_string().as_bytes())?;
        }
        Ok(dir)
    }
}

impl GpioLines for SysfsGpio {
    fn read_line(&mut self, line: u8) -> io::Result<bool> {
        let file = self
            .values
            .get_mut(line as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("GPIO line {} was not set up", line),
                )
            })?;
        let mut level = [0u8; 1];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut level)?;
        Ok(level[0] == b'1')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs(name: &str, levels: &[(u8, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "snes-cart-bridge-gpio-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        for &(line, level) in levels {
            let dir = root.join(format!("gpio{}", line));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("value"), level).unwrap();
        }
        root
    }

    #[test]
    fn test_reads_exported_lines() {
        let root = fake_sysfs("read", &[(3, "1\n"), (7, "0\n")]);
        let mut gpio = SysfsGpio::with_root(&root, [3u8, 7]).unwrap();

        assert!(gpio.read_line(3).unwrap());
        assert!(!gpio.read_line(7).unwrap());
        // repeated reads rewind the handle
        assert!(gpio.read_line(3).unwrap());
        assert_eq!(
            fs::read_to_string(root.join("gpio3").join("direction")).unwrap(),
            "in"
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_unknown_line_is_an_error() {
        let root = fake_sysfs("unknown", &[(2, "1")]);
        let mut gpio = SysfsGpio::with_root(&root, [2u8]).unwrap();

        let err = gpio.read_line(5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let _ = fs::remove_dir_all(&root);
    }
}
