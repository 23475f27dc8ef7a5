use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use crate::memory::{DIV_REGISTER, TAC_REGISTER, TIMA_REGISTER, TMA_REGISTER};

// DIV advances at 16384 Hz, i.e. once every 256 of the 4194304 Hz clock
// cycles, regardless of TAC.
const DIV_PERIOD: usize = 256;

const TAC_STARTED: u8 = 0b100;
const TAC_CLOCK_SELECT: u8 = 0b011;

/// The divider/timer unit, polled by the CPU between instructions. Both
/// counters keep their cycle remainders here; the visible registers live in
/// the bus's I/O block.
pub struct Timer {
    div_cycles: usize,
    tima_cycles: usize,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            div_cycles: 0,
            tima_cycles: 0,
        }
    }

    pub fn tick_div(&mut self, mmu: &mut Mmu, cycles: usize) {
        self.div_cycles += cycles;

        while self.div_cycles >= DIV_PERIOD {
            let div = mmu.read(DIV_REGISTER).wrapping_add(1);
            mmu.write(DIV_REGISTER, div);
            self.div_cycles -= DIV_PERIOD;
        }
    }

    pub fn tick_tima(&mut self, mmu: &mut Mmu, cycles: usize) {
        let tac = mmu.read(TAC_REGISTER);
        if tac & TAC_STARTED == 0 {
            return;
        }

        self.tima_cycles += cycles;

        let period: usize = match tac & TAC_CLOCK_SELECT {
            0b00 => 1024,
            0b01 => 16,
            0b10 => 64,
            0b11 => 256,
            _ => unreachable!(),
        };

        while self.tima_cycles >= period {
            let tima = mmu.read(TIMA_REGISTER);
            if tima == 0xff {
                let tma = mmu.read(TMA_REGISTER);
                mmu.write(TIMA_REGISTER, tma);
                mmu.request_interrupt(InterruptFlags::TIMER);
            } else {
                mmu.write(TIMA_REGISTER, tima.wrapping_add(1));
            }

            self.tima_cycles -= period;
        }
    }

    pub fn reset_divider(&mut self, mmu: &mut Mmu) {
        mmu.write(DIV_REGISTER, 0);
        self.div_cycles = 0;
    }
}

impl Default for Timer {
    fn default() -> Timer {
        Timer::new()
    }
}
