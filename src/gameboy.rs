use crate::cartridge::{BankController, Cartridge};
use crate::error::PocketboyError;
use crate::memory::mapper::direct::Direct;
use crate::memory::mapper::mbc1::Mbc1;
use crate::memory::mapper::mbc3::Mbc3;
use crate::memory::mapper::mbc5::Mbc5;
use crate::memory::mapper::Mapper;
use crate::memory::mmu::Mmu;
use crate::sm83::cpu::{Cpu, CpuHandle};
use crate::sm83::models::Model;
use log::{info, warn};

/// The assembled machine: cartridge, bank controller, bus and CPU.
pub struct GameBoy {
    cpu: Cpu,
}

impl GameBoy {
    pub fn new(rom: Vec<u8>, model: Model) -> Result<GameBoy, PocketboyError> {
        let cartridge = Cartridge::new(rom)?;

        let (_, header_ok) = cartridge.header_checksum();
        if !header_ok {
            warn!("header checksum mismatch, running anyway");
        }
        if !cartridge.boot_logo_valid() {
            warn!("boot logo mismatch, real hardware would refuse this cart");
        }

        let mapper = select_mapper(&cartridge);
        info!(
            "Loaded \"{}\" ({}), {} ROM banks, {} bytes external RAM",
            cartridge.title(),
            mapper.name(),
            cartridge.rom_banks(),
            cartridge.ram_size()
        );

        let mmu = Mmu::new(cartridge, mapper);
        let cpu = Cpu::new(mmu, model);

        Ok(GameBoy { cpu })
    }

    /// Blocks until the handle's `stop` is called.
    pub fn run(&mut self) {
        self.cpu.run();
    }

    pub fn handle(&self) -> CpuHandle {
        self.cpu.handle()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }
}

fn select_mapper(cartridge: &Cartridge) -> Box<dyn Mapper> {
    let kind = cartridge.cartridge_type();
    let ram_size = cartridge.ram_size();

    match kind.controller {
        BankController::None => Box::new(Direct::new(cartridge.rom())),
        BankController::Mbc1 => Box::new(Mbc1::new(cartridge.rom(), ram_size)),
        BankController::Mbc3 => Box::new(Mbc3::new(cartridge.rom(), ram_size)),
        BankController::Mbc5 if kind.hardware.contains(crate::cartridge::Hardware::RUMBLE) => {
            Box::new(Mbc5::with_rumble(cartridge.rom(), ram_size))
        }
        BankController::Mbc5 => Box::new(Mbc5::new(cartridge.rom(), ram_size)),
        other => {
            warn!("{} is not implemented, substituting direct mapping", other);
            Box::new(Direct::new(cartridge.rom()))
        }
    }
}
