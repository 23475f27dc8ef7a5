use crate::memory::mapper::Mapper;
use log::warn;
use std::sync::Arc;

/// The no-banking controller: ROM addresses map 1:1 onto cartridge bytes.
/// Also substituted for bank controllers we do not implement.
#[derive(Clone)]
pub struct Direct {
    rom: Arc<Vec<u8>>,
}

impl Direct {
    pub fn new(rom: Arc<Vec<u8>>) -> Direct {
        Direct { rom }
    }
}

impl Mapper for Direct {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.rom.get(addr as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, addr: u16, data: u8) {
        warn!("ROM: discarded write of {:02x} to read-only address {:04x}", data, addr);
    }

    #[inline]
    fn name(&self) -> String {
        String::from("ROM")
    }
}
