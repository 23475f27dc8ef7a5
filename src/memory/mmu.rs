use crate::cartridge::Cartridge;
use crate::memory::mapper::Mapper;
use crate::memory::registers::InterruptFlags;
use crate::memory::{BOOTROM_DISABLE_REGISTER, INTERRUPT_FLAGS_REGISTER};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const VRAM_SIZE: usize = 0x2000;
const WRAM_BANK_SIZE: usize = 0x1000;
const IO_SIZE: usize = 0x80;
const HRAM_SIZE: usize = 0x7f;

// The 256-byte DMG bootstrap ROM, overlaid on 0x0000-0x00ff while the
// disable-boot register reads zero.
const BOOT_ROM: [u8; 0x100] = [
    0x31, 0xfe, 0xff, 0xaf, 0x21, 0xff, 0x9f, 0x32, 0xcb, 0x7c, 0x20, 0xfb, 0x21, 0x26, 0xff, 0x0e,
    0x11, 0x3e, 0x80, 0x32, 0xe2, 0x0c, 0x3e, 0xf3, 0xe2, 0x32, 0x3e, 0x77, 0x77, 0x3e, 0xfc, 0xe0,
    0x47, 0x11, 0x04, 0x01, 0x21, 0x10, 0x80, 0x1a, 0xcd, 0x95, 0x00, 0xcd, 0x96, 0x00, 0x13, 0x7b,
    0xfe, 0x34, 0x20, 0xf3, 0x11, 0xd8, 0x00, 0x06, 0x08, 0x1a, 0x13, 0x22, 0x23, 0x05, 0x20, 0xf9,
    0x3e, 0x19, 0xea, 0x10, 0x99, 0x21, 0x2f, 0x99, 0x0e, 0x0c, 0x3d, 0x28, 0x08, 0x32, 0x0d, 0x20,
    0xf9, 0x2e, 0x0f, 0x18, 0xf3, 0x67, 0x3e, 0x64, 0x57, 0xe0, 0x42, 0x3e, 0x91, 0xe0, 0x40, 0x04,
    0x1e, 0x02, 0x0e, 0x0c, 0xf0, 0x44, 0xfe, 0x90, 0x20, 0xfa, 0x0d, 0x20, 0xf7, 0x1d, 0x20, 0xf2,
    0x0e, 0x13, 0x24, 0x7c, 0x1e, 0x83, 0xfe, 0x62, 0x28, 0x06, 0x1e, 0xc1, 0xfe, 0x64, 0x20, 0x06,
    0x7b, 0xe2, 0x0c, 0x3e, 0x87, 0xe2, 0xf0, 0x42, 0x90, 0xe0, 0x42, 0x15, 0x20, 0xd2, 0x05, 0x20,
    0x4f, 0x16, 0x20, 0x18, 0xcb, 0x4f, 0x06, 0x04, 0xc5, 0xcb, 0x11, 0x17, 0xc1, 0xcb, 0x11, 0x17,
    0x05, 0x20, 0xf5, 0x22, 0x23, 0x22, 0x23, 0xc9, 0xce, 0xed, 0x66, 0x66, 0xcc, 0x0d, 0x00, 0x0b,
    0x03, 0x73, 0x00, 0x83, 0x00, 0x0c, 0x00, 0x0d, 0x00, 0x08, 0x11, 0x1f, 0x88, 0x89, 0x00, 0x0e,
    0xdc, 0xcc, 0x6e, 0xe6, 0xdd, 0xdd, 0xd9, 0x99, 0xbb, 0xbb, 0x67, 0x63, 0x6e, 0x0e, 0xec, 0xcc,
    0xdd, 0xdc, 0x99, 0x9f, 0xbb, 0xb9, 0x33, 0x3e, 0x3c, 0x42, 0xb9, 0xa5, 0xb9, 0xa5, 0x42, 0x3c,
    0x21, 0x04, 0x01, 0x11, 0xa8, 0x00, 0x1a, 0x13, 0xbe, 0x20, 0xfe, 0x23, 0x7d, 0xfe, 0x34, 0x20,
    0xf5, 0x06, 0x19, 0x78, 0x86, 0x23, 0x05, 0x20, 0xfb, 0x86, 0x20, 0xfe, 0x3e, 0x01, 0xe0, 0x50,
];

/// The 16-bit address-space dispatcher. Every byte access lands in exactly
/// one region; reads are total, writes to stubbed regions are discarded.
///
/// The interrupt-flag byte (0xff0f) lives in a shared atomic so a host
/// thread can request interrupts while the CPU runs.
pub struct Mmu {
    mapper: Box<dyn Mapper>,
    cartridge: Cartridge,
    vram: [u8; VRAM_SIZE],
    wram_bank_0: [u8; WRAM_BANK_SIZE],
    wram_bank_n: [u8; WRAM_BANK_SIZE],
    io_registers: [u8; IO_SIZE],
    hram: [u8; HRAM_SIZE],
    interrupt_enable: u8,
    interrupt_flags: Arc<AtomicU8>,
}

impl Mmu {
    pub fn new(cartridge: Cartridge, mapper: Box<dyn Mapper>) -> Mmu {
        Mmu {
            mapper,
            cartridge,
            vram: [0; VRAM_SIZE],
            wram_bank_0: [0; WRAM_BANK_SIZE],
            wram_bank_n: [0; WRAM_BANK_SIZE],
            io_registers: [0; IO_SIZE],
            hram: [0; HRAM_SIZE],
            interrupt_enable: 0,
            interrupt_flags: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    fn boot_rom_mapped(&self) -> bool {
        self.io_registers[(BOOTROM_DISABLE_REGISTER - 0xff00) as usize] == 0
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x00ff if self.boot_rom_mapped() => BOOT_ROM[addr as usize],
            // ROM bank 0 reads come straight from the cartridge bytes.
            0x0000..=0x3fff => self.cartridge.data().get(addr as usize).copied().unwrap_or(0),
            0x4000..=0x7fff => self.mapper.read(addr),
            0x8000..=0x9fff => self.vram[(addr - 0x8000) as usize],
            0xa000..=0xbfff => self.mapper.read(addr),
            0xc000..=0xcfff => self.wram_bank_0[(addr - 0xc000) as usize],
            0xd000..=0xdfff => self.wram_bank_n[(addr - 0xd000) as usize],
            // Echo RAM mirrors the two work RAM banks.
            0xe000..=0xefff => self.wram_bank_0[(addr - 0xe000) as usize],
            0xf000..=0xfdff => self.wram_bank_n[(addr - 0xf000) as usize],
            // OAM and the prohibited region are stubbed out.
            0xfe00..=0xfe9f => 0,
            0xfea0..=0xfeff => 0,
            INTERRUPT_FLAGS_REGISTER => self.interrupt_flags.load(Ordering::Acquire),
            0xff00..=0xff7f => self.io_registers[(addr - 0xff00) as usize],
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize],
            0xffff => self.interrupt_enable,
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            // The whole ROM window delegates to the bank controller; most of
            // these writes are bank-select commands.
            0x0000..=0x7fff => self.mapper.write(addr, data),
            0x8000..=0x9fff => self.vram[(addr - 0x8000) as usize] = data,
            0xa000..=0xbfff => self.mapper.write(addr, data),
            0xc000..=0xcfff => self.wram_bank_0[(addr - 0xc000) as usize] = data,
            0xd000..=0xdfff => self.wram_bank_n[(addr - 0xd000) as usize] = data,
            0xe000..=0xefff => self.wram_bank_0[(addr - 0xe000) as usize] = data,
            0xf000..=0xfdff => self.wram_bank_n[(addr - 0xf000) as usize] = data,
            0xfe00..=0xfe9f => {}
            0xfea0..=0xfeff => {}
            INTERRUPT_FLAGS_REGISTER => self.interrupt_flags.store(data, Ordering::Release),
            0xff00..=0xff7f => self.io_registers[(addr - 0xff00) as usize] = data,
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize] = data,
            0xffff => self.interrupt_enable = data,
        }
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, addr: u16, data: u16) {
        self.write(addr, (data & 0x00ff) as u8);
        self.write(addr.wrapping_add(1), (data >> 8) as u8);
    }

    /// OR an interrupt request into IF. Safe against a concurrently running
    /// CPU, which is why IF is not part of the flat I/O block.
    pub fn request_interrupt(&self, flags: InterruptFlags) {
        self.interrupt_flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Clear a serviced request bit from IF.
    pub fn acknowledge_interrupt(&self, flags: InterruptFlags) {
        self.interrupt_flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Shared handle to the IF byte for cross-thread interrupt requests.
    pub fn interrupt_flags_handle(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.interrupt_flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mapper::direct::Direct;
    use crate::memory::BOOTROM_DISABLE_REGISTER;

    fn mmu_with_rom(rom: Vec<u8>) -> Mmu {
        let cartridge = Cartridge::new(rom).unwrap();
        let mapper = Box::new(Direct::new(cartridge.rom()));
        Mmu::new(cartridge, mapper)
    }

    #[test]
    fn boot_rom_overlay_follows_disable_register() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0000] = 0x42;
        let mut mmu = mmu_with_rom(rom);

        // Fresh I/O block reads zero at 0xff50, so the overlay is visible.
        assert_eq!(mmu.read(0x0000), BOOT_ROM[0]);
        assert_eq!(mmu.read(0x00ff), BOOT_ROM[0xff]);

        mmu.write(BOOTROM_DISABLE_REGISTER, 0x01);
        assert_eq!(mmu.read(0x0000), 0x42);

        // The overlay only ever shadows the first page.
        mmu.write(BOOTROM_DISABLE_REGISTER, 0x00);
        assert_eq!(mmu.read(0x0100), 0x00);
    }

    #[test]
    fn echo_ram_mirrors_work_ram() {
        let mut mmu = mmu_with_rom(vec![0; 0x8000]);

        mmu.write(0xc123, 0xab);
        assert_eq!(mmu.read(0xe123), 0xab);

        mmu.write(0xf045, 0xcd);
        assert_eq!(mmu.read(0xd045), 0xcd);
    }

    #[test]
    fn oam_and_prohibited_regions_are_stubbed() {
        let mut mmu = mmu_with_rom(vec![0; 0x8000]);

        mmu.write(0xfe00, 0xff);
        mmu.write(0xfeab, 0xff);
        assert_eq!(mmu.read(0xfe00), 0);
        assert_eq!(mmu.read(0xfeab), 0);
    }

    #[test]
    fn wide_accesses_are_little_endian_byte_pairs() {
        let mut mmu = mmu_with_rom(vec![0; 0x8000]);

        mmu.write16(0xc000, 0x1234);
        assert_eq!(mmu.read(0xc000), 0x34);
        assert_eq!(mmu.read(0xc001), 0x12);
        assert_eq!(mmu.read16(0xc000), 0x1234);

        // Same in high RAM, where the stack usually lives.
        mmu.write16(0xfffc, 0xbeef);
        assert_eq!(mmu.read(0xfffc), 0xef);
        assert_eq!(mmu.read(0xfffd), 0xbe);
        assert_eq!(mmu.read16(0xfffc), 0xbeef);
    }

    #[test]
    fn interrupt_flag_byte_is_shared() {
        let mut mmu = mmu_with_rom(vec![0; 0x8000]);
        let handle = mmu.interrupt_flags_handle();

        handle.fetch_or(0b100, std::sync::atomic::Ordering::AcqRel);
        assert_eq!(mmu.read(0xff0f), 0b100);

        mmu.write(0xff0f, 0b1_0001);
        assert_eq!(handle.load(std::sync::atomic::Ordering::Acquire), 0b1_0001);
    }

    #[test]
    fn interrupt_enable_register_is_a_single_byte() {
        let mut mmu = mmu_with_rom(vec![0; 0x8000]);

        mmu.write(0xffff, 0x1f);
        assert_eq!(mmu.read(0xffff), 0x1f);
    }
}
