use crate::memory::mapper::Mapper;
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct Mbc5 {
    rom: Arc<Vec<u8>>,
    ram: Vec<u8>,
    rom_bank: u16,
    ram_bank: u8,
    ram_enabled: bool,
    has_rumble: bool,
}

impl Mbc5 {
    pub fn new(rom: Arc<Vec<u8>>, ram_size: usize) -> Mbc5 {
        Mbc5 {
            rom,
            ram: vec![0; ram_size],
            rom_bank: 1,
            ram_bank: 0,
            ram_enabled: false,
            has_rumble: false,
        }
    }

    /// Rumble carts route bit 3 of the RAM bank register to the motor, which
    /// we only log.
    pub fn with_rumble(rom: Arc<Vec<u8>>, ram_size: usize) -> Mbc5 {
        Mbc5 {
            has_rumble: true,
            ..Mbc5::new(rom, ram_size)
        }
    }

    fn ram_offset(&self, addr: u16) -> usize {
        (addr - EXTERNAL_RAM_START) as usize + self.ram_bank as usize * 0x2000
    }
}

impl Mapper for Mbc5 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3fff => self.rom.get(addr as usize).copied().unwrap_or(0),
            0x4000..=0x7fff => {
                let offset = (addr as usize % 0x4000) + (self.rom_bank as usize * 0x4000);
                self.rom.get(offset).copied().unwrap_or(0)
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                self.ram.get(self.ram_offset(addr)).copied().unwrap_or(0)
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                warn!("MBC5: read from disabled external RAM at {:04x}", addr);
                0
            }
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => {
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC5: RAM enabled: {}", self.ram_enabled);
            }
            0x2000..=0x2fff => {
                // Low 8 bits of the 9-bit bank number. Unlike MBC1/MBC3,
                // bank 0 is selectable.
                self.rom_bank = (self.rom_bank & 0x100) | data as u16;
                debug!("MBC5: switched to ROM bank {}", self.rom_bank);
            }
            0x3000..=0x3fff => {
                self.rom_bank = (self.rom_bank & 0xff) | ((data as u16 & 0x1) << 8);
                debug!("MBC5: switched to ROM bank {}", self.rom_bank);
            }
            0x4000..=0x5fff => {
                self.ram_bank = data & 0x0f;
                if self.has_rumble {
                    if self.ram_bank & 0b1000 != 0 {
                        debug!("MBC5: rumble on");
                    } else {
                        debug!("MBC5: rumble off");
                    }
                }
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                let offset = self.ram_offset(addr);
                if let Some(slot) = self.ram.get_mut(offset) {
                    *slot = data;
                }
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                warn!("MBC5: discarded write of {:02x} to disabled external RAM at {:04x}", data, addr);
            }
            _ => warn!("MBC5: discarded write of {:02x} to read-only address {:04x}", data, addr),
        }
    }

    #[inline]
    fn name(&self) -> String {
        if self.has_rumble {
            String::from("MBC5+RUMBLE")
        } else {
            String::from("MBC5")
        }
    }
}
