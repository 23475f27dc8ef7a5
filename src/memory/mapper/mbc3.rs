use crate::memory::mapper::Mapper;
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct Mbc3 {
    rom: Arc<Vec<u8>>,
    ram: Vec<u8>,
    rom_bank: u8,
    ram_bank: u8,
    ram_enabled: bool,
}

impl Mbc3 {
    pub fn new(rom: Arc<Vec<u8>>, ram_size: usize) -> Mbc3 {
        Mbc3 {
            rom,
            ram: vec![0; ram_size],
            rom_bank: 1,
            ram_bank: 0,
            ram_enabled: false,
        }
    }

    fn ram_offset(&self, addr: u16) -> usize {
        (addr - EXTERNAL_RAM_START) as usize + self.ram_bank as usize * 0x2000
    }
}

impl Mapper for Mbc3 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3fff => self.rom.get(addr as usize).copied().unwrap_or(0),
            0x4000..=0x7fff => {
                let offset = (addr as usize % 0x4000) + (self.rom_bank as usize * 0x4000);
                self.rom.get(offset).copied().unwrap_or(0)
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if self.ram_enabled {
                    self.ram.get(self.ram_offset(addr)).copied().unwrap_or(0)
                } else {
                    warn!("MBC3: read from disabled external RAM at {:04x}", addr);
                    0
                }
            }
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => {
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC3: RAM enabled: {}", self.ram_enabled);
            }
            0x2000..=0x3fff => {
                // 7-bit bank number; bank 0 selects bank 1.
                self.rom_bank = data & 0b0111_1111;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC3: switched to ROM bank {}", self.rom_bank);
            }
            0x4000..=0x5fff => {
                // Values 0x08-0x0c would select the clock registers; without
                // the timer hardware they land in the same 4-bit bank field.
                self.ram_bank = data & 0x0f;
                debug!("MBC3: switched to RAM bank {}", self.ram_bank);
            }
            0x6000..=0x7fff => {
                // Clock latch sequence, meaningless without the timer.
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if self.ram_enabled {
                    let offset = self.ram_offset(addr);
                    if let Some(slot) = self.ram.get_mut(offset) {
                        *slot = data;
                    }
                } else {
                    warn!("MBC3: discarded write of {:02x} to disabled external RAM at {:04x}", data, addr);
                }
            }
            _ => warn!("MBC3: discarded write of {:02x} to read-only address {:04x}", data, addr),
        }
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC3")
    }
}
