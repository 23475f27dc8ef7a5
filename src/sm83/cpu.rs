use crate::cartridge::ColorSupport;
use crate::memory::mmu::Mmu;
use crate::memory::registers::{InterruptFlags, LcdControl};
use crate::memory::{
    BGP_REGISTER, BG_PALETTE_DATA_REGISTER, BG_PALETTE_INDEX_REGISTER, BOOTROM_DISABLE_REGISTER, DIV_REGISTER,
    INFRARED_REGISTER, INTERRUPT_ENABLE_REGISTER, INTERRUPT_FLAGS_REGISTER, JOYPAD_REGISTER, KEY1_REGISTER,
    LCD_CONTROL_REGISTER, LCD_STATUS_REGISTER, LYC_REGISTER, LY_REGISTER, OAM_DMA_REGISTER, OBJ_PALETTE_DATA_REGISTER,
    OBJ_PALETTE_INDEX_REGISTER, OBP0_REGISTER, OBP1_REGISTER, SCROLL_X_REGISTER, SCROLL_Y_REGISTER,
    SERIAL_CONTROL_REGISTER, SERIAL_DATA_REGISTER, TAC_REGISTER, TIMA_REGISTER, TMA_REGISTER, VRAM_BANK_REGISTER,
    WINDOW_X_REGISTER, WINDOW_Y_REGISTER, WRAM_BANK_REGISTER,
};
use crate::sm83::irq::Interrupt;
use crate::sm83::models::{self, Model};
use crate::sm83::registers::Registers;
use crate::sm83::timer::Timer;
use log::trace;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

// I/O register contents the boot ROM leaves behind on a monochrome unit.
// Seeded at construction since we start past the boot sequence, with the
// boot overlay already unmapped.
const POST_BOOT_IO: &[(u16, u8)] = &[
    (JOYPAD_REGISTER, 0xcf),
    (SERIAL_DATA_REGISTER, 0x00),
    (SERIAL_CONTROL_REGISTER, 0x7e),
    (DIV_REGISTER, 0xab),
    (TIMA_REGISTER, 0x00),
    (TMA_REGISTER, 0x00),
    (TAC_REGISTER, 0xf8),
    (INTERRUPT_FLAGS_REGISTER, 0xe1),
    (0xff10, 0x80),
    (0xff11, 0xbf),
    (0xff12, 0xf3),
    (0xff13, 0xff),
    (0xff14, 0xbf),
    (0xff16, 0x3f),
    (0xff17, 0x00),
    (0xff18, 0xff),
    (0xff19, 0xbf),
    (0xff1a, 0x7f),
    (0xff1b, 0xff),
    (0xff1c, 0x9f),
    (0xff1d, 0xff),
    (0xff1e, 0xbf),
    (0xff20, 0xff),
    (0xff21, 0x00),
    (0xff22, 0x00),
    (0xff23, 0xbf),
    (0xff24, 0x77),
    (0xff25, 0xf3),
    (0xff26, 0xf1),
    (LCD_CONTROL_REGISTER, 0x91),
    (LCD_STATUS_REGISTER, 0x85),
    (SCROLL_Y_REGISTER, 0x00),
    (SCROLL_X_REGISTER, 0x00),
    (LY_REGISTER, 0x00),
    (LYC_REGISTER, 0x00),
    (OAM_DMA_REGISTER, 0xff),
    (BGP_REGISTER, 0xfc),
    (OBP0_REGISTER, 0xff),
    (OBP1_REGISTER, 0xff),
    (WINDOW_Y_REGISTER, 0x00),
    (WINDOW_X_REGISTER, 0x00),
    (KEY1_REGISTER, 0xff),
    (VRAM_BANK_REGISTER, 0xff),
    (BOOTROM_DISABLE_REGISTER, 0x01),
    (0xff51, 0xff),
    (0xff52, 0xff),
    (0xff53, 0xff),
    (0xff54, 0xff),
    (0xff55, 0xff),
    (INFRARED_REGISTER, 0xff),
    (BG_PALETTE_INDEX_REGISTER, 0xff),
    (BG_PALETTE_DATA_REGISTER, 0xff),
    (OBJ_PALETTE_INDEX_REGISTER, 0xff),
    (OBJ_PALETTE_DATA_REGISTER, 0xff),
    (WRAM_BANK_REGISTER, 0xff),
    (INTERRUPT_ENABLE_REGISTER, 0x00),
];

/// What the main loop does on its next turn. HALT, DI and EI stretch over
/// loop iterations by enqueueing one of these instead of the usual fetch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Action {
    Execute,
    Halt,
    DisableInterrupts,
    EnableInterrupts,
}

pub struct Cpu {
    pub(crate) registers: Registers,
    pub(crate) mmu: Mmu,
    pub(crate) pipeline: VecDeque<Action>,
    pub(crate) ime: bool,
    pub(crate) cycles: usize,
    pub(crate) timer: Timer,
    running: Arc<AtomicBool>,
}

/// Cloneable control handle for the thread hosting the UI. `stop` and
/// `queue_interrupt` are the only operations another thread may perform
/// while `run` is executing.
#[derive(Clone)]
pub struct CpuHandle {
    running: Arc<AtomicBool>,
    interrupt_flags: Arc<AtomicU8>,
}

impl CpuHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn queue_interrupt(&self, interrupt: Interrupt) {
        self.interrupt_flags.fetch_or(interrupt.flag().bits(), Ordering::AcqRel);
    }
}

impl Cpu {
    pub fn new(mmu: Mmu, model: Model) -> Cpu {
        let color_game = mmu.cartridge().color_support() == ColorSupport::ColorOnly;

        let mut cpu = Cpu {
            registers: Registers::default(),
            mmu,
            pipeline: VecDeque::new(),
            ime: false,
            cycles: 0,
            timer: Timer::new(),
            running: Arc::new(AtomicBool::new(false)),
        };

        models::seed_registers(model, &mut cpu.registers, color_game);
        cpu.initialize_io();
        cpu
    }

    fn initialize_io(&mut self) {
        for &(addr, value) in POST_BOOT_IO {
            self.mmu.write(addr, value);
        }
    }

    /// Fetch/decode/execute until another thread asks us to stop.
    pub fn run(&mut self) {
        if self.pipeline.is_empty() {
            self.pipeline.push_back(Action::Execute);
        }
        self.running.store(true, Ordering::Release);

        while self.running.load(Ordering::Acquire) {
            self.step();
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn handle(&self) -> CpuHandle {
        CpuHandle {
            running: Arc::clone(&self.running),
            interrupt_flags: self.mmu.interrupt_flags_handle(),
        }
    }

    pub fn queue_interrupt(&self, interrupt: Interrupt) {
        self.mmu.request_interrupt(interrupt.flag());
    }

    /// One turn of the main loop: pop an action, perform it, then poll the
    /// interrupt controller, the LCD and the timers.
    pub(crate) fn step(&mut self) {
        let action = self.pipeline.pop_front().unwrap_or(Action::Execute);
        let cycles_before = self.cycles;

        match action {
            Action::Execute => {
                let pc = self.registers.pc;
                let opcode = self.fetch8();
                self.cycles += self.execute(opcode);
                trace!("[{:04x}] {:02x} [{}]", pc, opcode, self);
            }
            Action::Halt => {
                // The clock keeps running while halted.
                self.cycles += 4;
                if self.pending_interrupts().is_empty() {
                    self.pipeline.push_back(Action::Halt);
                }
            }
            Action::DisableInterrupts => self.ime = false,
            Action::EnableInterrupts => self.ime = true,
        }

        if self.pipeline.is_empty() {
            self.pipeline.push_back(Action::Execute);
        }

        // EI only takes effect after the following instruction: the turn
        // that performs the enable never dispatches, so the vector is taken
        // after the instruction following EI at the earliest.
        if self.ime && !matches!(action, Action::EnableInterrupts) {
            self.service_interrupts();
        }

        let spent = self.cycles - cycles_before;
        self.poll_lcd();
        self.timer.tick_div(&mut self.mmu, spent);
        self.timer.tick_tima(&mut self.mmu, spent);
    }

    pub(crate) fn fetch8(&mut self) -> u8 {
        let value = self.mmu.read(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch16(&mut self) -> u16 {
        let value = self.mmu.read16(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(2);
        value
    }

    pub(crate) fn push_stack(&mut self, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(2);
        self.mmu.write16(self.registers.sp, value);
    }

    pub(crate) fn pop_stack(&mut self) -> u16 {
        let value = self.mmu.read16(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);
        value
    }

    pub(crate) fn pending_interrupts(&self) -> InterruptFlags {
        let requested = InterruptFlags::from(self.mmu.read(INTERRUPT_FLAGS_REGISTER));
        let enabled = InterruptFlags::from(self.mmu.read(INTERRUPT_ENABLE_REGISTER));
        requested & enabled
    }

    /// Dispatch the highest-priority requested-and-enabled interrupt, if
    /// any: drop IME, push PC, acknowledge the request and jump to the
    /// vector. The caller gates this on IME.
    pub(crate) fn service_interrupts(&mut self) {
        let Some(interrupt) = Interrupt::highest_pending(self.pending_interrupts()) else {
            return;
        };

        trace!("servicing {} -> ${:04x}", interrupt, interrupt.vector());

        self.ime = false;
        self.push_stack(self.registers.pc);
        self.mmu.acknowledge_interrupt(interrupt.flag());
        self.registers.pc = interrupt.vector();
    }

    // TODO: raise vblank at the 59.7 Hz frame rate instead of every turn
    // once the PPU grows real mode timing.
    fn poll_lcd(&self) {
        let control = LcdControl::from(self.mmu.read(LCD_CONTROL_REGISTER));
        if control.contains(LcdControl::LCD_DISPLAY) {
            self.mmu.request_interrupt(InterruptFlags::VBLANK);
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    pub fn elapsed_cycles(&self) -> usize {
        self.cycles
    }

    pub fn reset_cycles(&mut self) {
        self.cycles = 0;
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "A: ${:02x}  F: ${:02x}  B: ${:02x}  C: ${:02x}  D: ${:02x}  E: ${:02x}  H: ${:02x}  L: ${:02x}  SP: ${:04x}  PC: ${:04x}",
            self.registers.a,
            self.registers.f.bits(),
            self.registers.b,
            self.registers.c,
            self.registers.d,
            self.registers.e,
            self.registers.h,
            self.registers.l,
            self.registers.sp,
            self.registers.pc
        )
    }
}
