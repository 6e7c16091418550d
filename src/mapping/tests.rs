use super::*;

fn lorom() -> AddressDecoder {
    AddressDecoder::new(MappingMode::LoRom, SramAddressing::BufferStart, 0x2000)
}

fn hirom() -> AddressDecoder {
    AddressDecoder::new(MappingMode::HiRom, SramAddressing::BufferStart, 0x2000)
}

// A spread of offsets covering both halves of a bank and their edges.
const PROBE_OFFSETS: [u16; 8] = [0x0000, 0x1234, 0x5FFF, 0x6000, 0x7FFF, 0x8000, 0xC0DE, 0xFFFF];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parts() {
        let addr = Address::new(0xFF12_3456);
        assert_eq!(addr.raw(), 0x12_3456);
        assert_eq!(addr.bank(), 0x12);
        assert_eq!(addr.offset(), 0x3456);
        assert_eq!(Address::from_parts(0x12, 0x3456), addr);
        assert_eq!(addr.to_string(), "12:3456");
    }

    #[test]
    fn test_lorom_first_rom_byte() {
        assert_eq!(
            lorom().decode(Address::new(0x00_8000)),
            DecodedLocation::Rom(0x0000)
        );
        assert_eq!(
            decode(Address::new(0x00_8000), MappingMode::LoRom),
            DecodedLocation::Rom(0x0000)
        );
    }

    #[test]
    fn test_lorom_upper_rom_half() {
        // cart bank takes bits 16 and 20 of the address, halved
        assert_eq!(
            lorom().decode(Address::new(0x01_8000)),
            DecodedLocation::Rom(0x8000)
        );
        assert_eq!(
            lorom().decode(Address::new(0x10_FFFF)),
            DecodedLocation::Rom(0x8_0000 + 0x7FFF)
        );
    }

    #[test]
    fn test_lorom_top_of_bank_7f_is_rom() {
        // bank 7F is not folded and not below 70; offset FFFF selects ROM
        assert_eq!(
            lorom().decode(Address::new(0x7F_FFFF)),
            DecodedLocation::Rom(0x8_FFFF)
        );
    }

    #[test]
    fn test_lorom_sram_window() {
        assert_eq!(lorom().decode(Address::new(0x70_0000)), DecodedLocation::Sram(0));
        assert_eq!(lorom().decode(Address::new(0x7D_7FFF)), DecodedLocation::Sram(0));
        assert_eq!(lorom().decode(Address::new(0xF0_1234)), DecodedLocation::Sram(0));
    }

    #[test]
    fn test_lorom_bank_80_is_not_folded() {
        assert_eq!(lorom().decode(Address::new(0x80_0000)), DecodedLocation::Sram(0));
        assert_eq!(
            lorom().decode(Address::new(0x80_8000)),
            DecodedLocation::Rom(0x0000)
        );
    }

    #[test]
    fn test_lorom_low_bank_mirror_of_bank_40() {
        let d = lorom();
        for &offset in PROBE_OFFSETS.iter().filter(|&&o| o <= 0x7FFF) {
            assert_eq!(
                d.decode(Address::from_parts(0x3F, offset)),
                d.decode(Address::from_parts(0x40, offset)),
                "offset {:04X}",
                offset
            );
        }
    }

    #[test]
    fn test_lorom_low_half_reads_next_bank() {
        assert_eq!(
            lorom().decode(Address::new(0x00_1234)),
            DecodedLocation::Rom(0x8000 + 0x1234)
        );
        assert_eq!(
            lorom().decode(Address::new(0x45_1234)),
            DecodedLocation::Rom(0x8000 + 0x1234)
        );
    }

    #[test]
    fn test_top_half_mirrors_bottom_half() {
        for decoder in [lorom(), hirom()] {
            for bank in 0x81u32..=0xFF {
                for &offset in PROBE_OFFSETS.iter() {
                    let high = Address::new((bank << 16) | offset as u32);
                    let low = Address::new(high.raw() - 0x80_0000);
                    assert_eq!(
                        decoder.decode(high),
                        decoder.decode(low),
                        "{:?} {}",
                        decoder.mode(),
                        high
                    );
                }
            }
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        for decoder in [lorom(), hirom()] {
            for raw in (0..=Address::MASK).step_by(0x1FFF) {
                let addr = Address::new(raw);
                assert_eq!(decoder.decode(addr), decoder.decode(addr));
            }
        }
    }

    #[test]
    fn test_hirom_regions() {
        let d = hirom();
        assert_eq!(d.decode(Address::new(0x00_1234)), DecodedLocation::Rom(0x1234));
        assert_eq!(d.decode(Address::new(0x1F_FFFF)), DecodedLocation::Rom(0x1F_FFFF));
        assert_eq!(d.decode(Address::new(0x20_6000)), DecodedLocation::Sram(0));
        assert_eq!(d.decode(Address::new(0x3F_7FFF)), DecodedLocation::Sram(0));
        assert_eq!(d.decode(Address::new(0x20_8000)), DecodedLocation::Rom(0x20_8000));
        assert_eq!(d.decode(Address::new(0x40_0000)), DecodedLocation::Rom(0x0000));
        assert_eq!(d.decode(Address::new(0x7F_FFFF)), DecodedLocation::Rom(0x3F_FFFF));
        assert_eq!(d.decode(Address::new(0xC0_0000)), DecodedLocation::Rom(0x0000));
        assert_eq!(d.decode(Address::new(0x80_0000)), DecodedLocation::Rom(0x40_0000));
    }

    #[test]
    fn test_extended_modes_are_unmapped() {
        for mode in [MappingMode::ExLoRom, MappingMode::ExHiRom] {
            for raw in (0..=Address::MASK).step_by(0x0FFF) {
                assert_eq!(decode(Address::new(raw), mode), DecodedLocation::Unmapped);
            }
        }
    }

    #[test]
    fn test_continuous_sram_addressing() {
        let lo = AddressDecoder::new(MappingMode::LoRom, SramAddressing::Continuous, 0x2000);
        assert_eq!(lo.decode(Address::new(0x70_0010)), DecodedLocation::Sram(0x10));
        // 0x8010 wraps in an 8KB buffer
        assert_eq!(lo.decode(Address::new(0x71_0010)), DecodedLocation::Sram(0x10));

        let lo_big = AddressDecoder::new(MappingMode::LoRom, SramAddressing::Continuous, 0x2_0000);
        assert_eq!(lo_big.decode(Address::new(0x71_0010)), DecodedLocation::Sram(0x8010));

        let hi = AddressDecoder::new(MappingMode::HiRom, SramAddressing::Continuous, 0x8000);
        assert_eq!(hi.decode(Address::new(0x20_6004)), DecodedLocation::Sram(0x0004));
        assert_eq!(hi.decode(Address::new(0x21_7FFF)), DecodedLocation::Sram(0x3FFF));

        let empty = AddressDecoder::new(MappingMode::HiRom, SramAddressing::Continuous, 0);
        assert_eq!(empty.decode(Address::new(0x21_7FFF)), DecodedLocation::Sram(0));
    }

    #[test]
    fn test_map_byte_parsing() {
        assert_eq!(MappingMode::from_map_byte(0x20), Some(MappingMode::LoRom));
        assert_eq!(MappingMode::from_map_byte(0x30), Some(MappingMode::LoRom));
        assert_eq!(MappingMode::from_map_byte(0x31), Some(MappingMode::HiRom));
        assert_eq!(MappingMode::from_map_byte(0x32), Some(MappingMode::ExLoRom));
        assert_eq!(MappingMode::from_map_byte(0x35), Some(MappingMode::ExHiRom));
        assert_eq!(MappingMode::from_map_byte(0x23), None);
        assert!(!MappingMode::ExHiRom.is_supported());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("HiROM".parse::<MappingMode>(), Ok(MappingMode::HiRom));
        assert_eq!("lorom".parse::<MappingMode>(), Ok(MappingMode::LoRom));
        assert!("sa1".parse::<MappingMode>().is_err());
        assert_eq!(
            "continuous".parse::<SramAddressing>(),
            Ok(SramAddressing::Continuous)
        );
    }
}
