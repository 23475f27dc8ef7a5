use crate::error::{CartridgeTooSmallSnafu, PocketboyError};
use bitflags::bitflags;
use snafu::ensure;
use std::sync::Arc;

/// Everything below this offset is header (entry point, logo, title, type,
/// sizes, checksums). Images shorter than this cannot be decoded at all.
pub const HEADER_END: usize = 0x150;

const LOGO_START: usize = 0x104;
const LOGO_END: usize = 0x134;
const TITLE_START: usize = 0x134;
const TITLE_END: usize = 0x143;

// The fixed bitmap every licensed cartridge carries at 0x104. The boot ROM
// refuses to hand over control when it does not match.
const BOOT_LOGO: [u8; 0x30] = [
    0xce, 0xed, 0x66, 0x66, 0xcc, 0x0d, 0x00, 0x0b, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0c, 0x00, 0x0d,
    0x00, 0x08, 0x11, 0x1f, 0x88, 0x89, 0x00, 0x0e, 0xdc, 0xcc, 0x6e, 0xe6, 0xdd, 0xdd, 0xd9, 0x99,
    0xbb, 0xbb, 0x67, 0x63, 0x6e, 0x0e, 0xec, 0xcc, 0xdd, 0xdc, 0x99, 0x9f, 0xbb, 0xb9, 0x33, 0x3e,
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorSupport {
    MonochromeSupported,
    ColorOnly,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BankController {
    None,
    Mbc1,
    Mbc2,
    Mmm01,
    Mbc3,
    Mbc5,
    Mbc6,
    Mbc7,
    PocketCamera,
    BandaiTama5,
    Huc3,
    Huc1,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Hardware: u8 {
        const RAM           = 1 << 0;
        const BATTERY       = 1 << 1;
        const TIMER         = 1 << 2;
        const RUMBLE        = 1 << 3;
        const ACCELEROMETER = 1 << 4;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CartridgeType {
    pub controller: BankController,
    pub hardware: Hardware,
}

impl CartridgeType {
    const fn new(controller: BankController, hardware: Hardware) -> CartridgeType {
        CartridgeType { controller, hardware }
    }
}

/// A loaded cartridge image. The byte buffer is immutable after construction;
/// the memory bus and the selected mapper each hold an independent handle to
/// it.
#[derive(Clone)]
pub struct Cartridge {
    data: Arc<Vec<u8>>,
}

impl Cartridge {
    pub fn new(data: Vec<u8>) -> Result<Cartridge, PocketboyError> {
        ensure!(data.len() >= HEADER_END, CartridgeTooSmallSnafu { size: data.len() });
        Ok(Cartridge { data: Arc::new(data) })
    }

    pub fn loaded(&self) -> bool {
        self.data.len() >= HEADER_END
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A shared handle to the ROM bytes, for handing to a mapper.
    pub fn rom(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }

    pub fn entry_point(&self) -> [u8; 4] {
        let mut out = [0; 4];
        out.copy_from_slice(&self.data[0x100..0x104]);
        out
    }

    pub fn boot_logo(&self) -> [u8; 0x30] {
        let mut out = [0; 0x30];
        out.copy_from_slice(&self.data[LOGO_START..LOGO_END]);
        out
    }

    pub fn boot_logo_valid(&self) -> bool {
        self.boot_logo() == BOOT_LOGO
    }

    pub fn title(&self) -> String {
        let raw = &self.data[TITLE_START..TITLE_END];
        let end = raw.iter().rposition(|&byte| byte != 0).map_or(0, |idx| idx + 1);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    pub fn color_support(&self) -> ColorSupport {
        if self.data[0x143] == 0xc0 {
            ColorSupport::ColorOnly
        } else {
            ColorSupport::MonochromeSupported
        }
    }

    pub fn licensee_code(&self) -> String {
        let old = self.data[0x14b];
        if old == 0x33 {
            String::from_utf8_lossy(&self.data[0x144..=0x145]).into_owned()
        } else {
            (old as char).to_string()
        }
    }

    pub fn supports_super_functions(&self) -> bool {
        self.data[0x146] == 0x03
    }

    pub fn cartridge_type(&self) -> CartridgeType {
        use BankController::*;

        let code = self.data[0x147];
        match code {
            0x00 => CartridgeType::new(None, Hardware::empty()),
            0x01 => CartridgeType::new(Mbc1, Hardware::empty()),
            0x02 => CartridgeType::new(Mbc1, Hardware::RAM),
            0x03 => CartridgeType::new(Mbc1, Hardware::RAM | Hardware::BATTERY),
            0x05 => CartridgeType::new(Mbc2, Hardware::empty()),
            0x06 => CartridgeType::new(Mbc2, Hardware::RAM | Hardware::BATTERY),
            0x08 => CartridgeType::new(None, Hardware::RAM),
            0x09 => CartridgeType::new(None, Hardware::RAM | Hardware::BATTERY),
            0x0b => CartridgeType::new(Mmm01, Hardware::empty()),
            0x0c => CartridgeType::new(Mmm01, Hardware::RAM),
            0x0d => CartridgeType::new(Mmm01, Hardware::RAM | Hardware::BATTERY),
            0x0f => CartridgeType::new(Mbc3, Hardware::TIMER | Hardware::BATTERY),
            0x10 => CartridgeType::new(Mbc3, Hardware::RAM | Hardware::TIMER | Hardware::BATTERY),
            0x11 => CartridgeType::new(Mbc3, Hardware::empty()),
            0x12 => CartridgeType::new(Mbc3, Hardware::RAM),
            0x13 => CartridgeType::new(Mbc3, Hardware::RAM | Hardware::BATTERY),
            0x19 => CartridgeType::new(Mbc5, Hardware::empty()),
            0x1a => CartridgeType::new(Mbc5, Hardware::RAM),
            0x1b => CartridgeType::new(Mbc5, Hardware::RAM | Hardware::BATTERY),
            0x1c => CartridgeType::new(Mbc5, Hardware::RUMBLE),
            0x1d => CartridgeType::new(Mbc5, Hardware::RAM | Hardware::RUMBLE),
            0x1e => CartridgeType::new(Mbc5, Hardware::RAM | Hardware::BATTERY | Hardware::RUMBLE),
            0x20 => CartridgeType::new(Mbc6, Hardware::RAM | Hardware::BATTERY),
            0x22 => CartridgeType::new(Mbc7, Hardware::RAM | Hardware::BATTERY | Hardware::ACCELEROMETER),
            0xfc => CartridgeType::new(PocketCamera, Hardware::empty()),
            0xfd => CartridgeType::new(BandaiTama5, Hardware::empty()),
            0xfe => CartridgeType::new(Huc3, Hardware::empty()),
            0xff => CartridgeType::new(Huc1, Hardware::RAM | Hardware::BATTERY),
            // Unlisted type codes get the trivial direct mapping.
            _ => CartridgeType::new(None, Hardware::empty()),
        }
    }

    /// Number of 16 KiB ROM banks the header declares.
    pub fn rom_banks(&self) -> usize {
        2 << self.data[0x148]
    }

    pub fn rom_size(&self) -> usize {
        self.rom_banks() * 0x4000
    }

    pub fn ram_banks(&self) -> usize {
        match self.data[0x149] {
            0 => 0,
            1 | 2 => 1,
            3 => 4,
            4 => 16,
            5 => 8,
            _ => 0,
        }
    }

    pub fn ram_size(&self) -> usize {
        match self.data[0x149] {
            0 => 0,
            1 => 0x800,
            2 => 0x2000,
            3 => 0x2000 * 4,
            4 => 0x2000 * 16,
            5 => 0x2000 * 8,
            _ => 0,
        }
    }

    pub fn japan_only(&self) -> bool {
        self.data[0x14a] == 0
    }

    pub fn version(&self) -> u8 {
        self.data[0x14b]
    }

    /// Header checksum over 0x134..=0x14c. Returns the computed value and
    /// whether it matches the stored byte at 0x14d.
    pub fn header_checksum(&self) -> (u8, bool) {
        let mut sum: u8 = 0;
        for i in 0x134..=0x14c {
            sum = sum.wrapping_sub(self.data[i]).wrapping_sub(1);
        }
        (sum, sum == self.data[0x14d])
    }

    /// 16-bit sum of every byte except the stored checksum itself. Returns
    /// the computed value and whether it matches the big-endian word at
    /// 0x14e.
    pub fn global_checksum(&self) -> (u16, bool) {
        let mut sum: u16 = 0;
        for (i, &byte) in self.data.iter().enumerate() {
            if i == 0x14e || i == 0x14f {
                continue;
            }
            sum = sum.wrapping_add(byte as u16);
        }
        let stored = (self.data[0x14e] as u16) << 8 | self.data[0x14f] as u16;
        (sum, sum == stored)
    }
}

impl std::fmt::Display for BankController {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            BankController::None => "ROM only",
            BankController::Mbc1 => "MBC1",
            BankController::Mbc2 => "MBC2",
            BankController::Mmm01 => "MMM01",
            BankController::Mbc3 => "MBC3",
            BankController::Mbc5 => "MBC5",
            BankController::Mbc6 => "MBC6",
            BankController::Mbc7 => "MBC7",
            BankController::PocketCamera => "Pocket Camera",
            BankController::BandaiTama5 => "Bandai TAMA5",
            BankController::Huc3 => "HuC3",
            BankController::Huc1 => "HuC1",
        };

        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_header() -> Vec<u8> {
        let mut data = vec![0u8; 0x8000];
        data[LOGO_START..LOGO_END].copy_from_slice(&BOOT_LOGO);
        data[TITLE_START..TITLE_START + 7].copy_from_slice(b"TESTROM");
        data[0x143] = 0x00; // monochrome
        data[0x146] = 0x03; // super functions
        data[0x147] = 0x03; // MBC1+RAM+BATTERY
        data[0x148] = 0x01; // 4 banks = 64 KiB
        data[0x149] = 0x03; // 32 KiB RAM
        data[0x14a] = 0x01; // overseas
        data[0x14b] = 0x33; // new licensee code at 0x144
        data[0x144] = b'0';
        data[0x145] = b'1';

        // Stamp a valid header checksum.
        let mut sum: u8 = 0;
        for i in 0x134..=0x14c {
            sum = sum.wrapping_sub(data[i]).wrapping_sub(1);
        }
        data[0x14d] = sum;

        data
    }

    #[test]
    fn rejects_truncated_image() {
        assert!(Cartridge::new(vec![0; 0x14f]).is_err());
        assert!(Cartridge::new(vec![0; HEADER_END]).is_ok());
    }

    #[test]
    fn decodes_header_fields() {
        let cartridge = Cartridge::new(image_with_header()).unwrap();

        assert!(cartridge.loaded());
        assert_eq!(cartridge.title(), "TESTROM");
        assert_eq!(cartridge.color_support(), ColorSupport::MonochromeSupported);
        assert_eq!(cartridge.licensee_code(), "01");
        assert!(cartridge.supports_super_functions());
        assert!(!cartridge.japan_only());
        assert!(cartridge.boot_logo_valid());

        let kind = cartridge.cartridge_type();
        assert_eq!(kind.controller, BankController::Mbc1);
        assert_eq!(kind.hardware, Hardware::RAM | Hardware::BATTERY);

        assert_eq!(cartridge.rom_banks(), 4);
        assert_eq!(cartridge.rom_size(), 0x10000);
        assert_eq!(cartridge.ram_banks(), 4);
        assert_eq!(cartridge.ram_size(), 0x8000);
    }

    #[test]
    fn title_trims_trailing_padding() {
        let mut data = image_with_header();
        for byte in &mut data[TITLE_START..TITLE_END] {
            *byte = 0;
        }
        data[TITLE_START] = b'A';
        data[TITLE_START + 1] = b'B';
        let cartridge = Cartridge::new(data).unwrap();

        assert_eq!(cartridge.title(), "AB");
    }

    #[test]
    fn old_style_licensee_code() {
        let mut data = image_with_header();
        data[0x14b] = 0x42;
        let cartridge = Cartridge::new(data).unwrap();

        assert_eq!(cartridge.licensee_code(), "B");
        assert_eq!(cartridge.version(), 0x42);
    }

    #[test]
    fn unknown_type_code_falls_back_to_direct_mapping() {
        let mut data = image_with_header();
        data[0x147] = 0x7b;
        let cartridge = Cartridge::new(data).unwrap();

        let kind = cartridge.cartridge_type();
        assert_eq!(kind.controller, BankController::None);
        assert_eq!(kind.hardware, Hardware::empty());
    }

    #[test]
    fn header_checksum_round_trip() {
        let cartridge = Cartridge::new(image_with_header()).unwrap();
        let (computed, valid) = cartridge.header_checksum();
        assert!(valid);

        let mut data = image_with_header();
        data[0x14d] = computed.wrapping_add(1);
        let tampered = Cartridge::new(data).unwrap();
        let (recomputed, valid) = tampered.header_checksum();
        assert_eq!(recomputed, computed);
        assert!(!valid);
    }

    #[test]
    fn global_checksum_skips_its_own_bytes() {
        let mut data = image_with_header();
        let mut sum: u16 = 0;
        for (i, &byte) in data.iter().enumerate() {
            if i == 0x14e || i == 0x14f {
                continue;
            }
            sum = sum.wrapping_add(byte as u16);
        }
        data[0x14e] = (sum >> 8) as u8;
        data[0x14f] = (sum & 0xff) as u8;

        let cartridge = Cartridge::new(data).unwrap();
        let (computed, valid) = cartridge.global_checksum();
        assert_eq!(computed, sum);
        assert!(valid);
    }

    #[test]
    fn corrupted_logo_detected() {
        let mut data = image_with_header();
        data[LOGO_START] ^= 0xff;
        let cartridge = Cartridge::new(data).unwrap();

        assert!(!cartridge.boot_logo_valid());
    }
}
