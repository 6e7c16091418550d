use std::fmt::Write;

/// Hex dump of `data[start..end]`, 16 bytes per line in groups of four.
/// The range is clipped to the data.
pub fn hex_dump(data: &[u8], start: usize, end: usize) -> String {
    let end = end.min(data.len());
    let mut out = String::new();
    let mut line = start;
    while line < end {
        let _ = write!(out, "{:#06x}:", line);
        for (j, byte) in data[line..end.min(line + 16)].iter().enumerate() {
            if j % 4 == 0 {
                out.push(' ');
            }
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
        line += 16;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump_layout() {
        let data: Vec<u8> = (0u8..0x20).collect();
        let dump = hex_dump(&data, 0x10, 0x20);
        assert_eq!(
            dump,
            "0x0010:  10 11 12 13  14 15 16 17  18 19 1a 1b  1c 1d 1e 1f\n"
        );
    }

    #[test]
    fn test_hex_dump_clips_range() {
        let data = [0xAAu8; 20];
        let dump = hex_dump(&data, 16, 64);
        assert_eq!(dump, "0x0010:  aa aa aa aa\n");
        assert_eq!(hex_dump(&data, 32, 64), "");
    }
}
