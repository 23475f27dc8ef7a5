use crate::memory::registers::InterruptFlags;

/// The five interrupt sources, in service priority order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub fn flag(&self) -> InterruptFlags {
        match self {
            Interrupt::VBlank => InterruptFlags::VBLANK,
            Interrupt::LcdStat => InterruptFlags::LCD_STAT,
            Interrupt::Timer => InterruptFlags::TIMER,
            Interrupt::Serial => InterruptFlags::SERIAL,
            Interrupt::Joypad => InterruptFlags::JOYPAD,
        }
    }

    /// Fixed page-zero service routine address.
    pub fn vector(&self) -> u16 {
        match self {
            Interrupt::VBlank => 0x0040,
            Interrupt::LcdStat => 0x0048,
            Interrupt::Timer => 0x0050,
            Interrupt::Serial => 0x0058,
            Interrupt::Joypad => 0x0060,
        }
    }

    /// The highest-priority source present in `pending`, if any.
    pub fn highest_pending(pending: InterruptFlags) -> Option<Interrupt> {
        if pending.contains(InterruptFlags::VBLANK) {
            Some(Interrupt::VBlank)
        } else if pending.contains(InterruptFlags::LCD_STAT) {
            Some(Interrupt::LcdStat)
        } else if pending.contains(InterruptFlags::TIMER) {
            Some(Interrupt::Timer)
        } else if pending.contains(InterruptFlags::SERIAL) {
            Some(Interrupt::Serial)
        } else if pending.contains(InterruptFlags::JOYPAD) {
            Some(Interrupt::Joypad)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Interrupt::VBlank => write!(f, "VBLANK"),
            Interrupt::LcdStat => write!(f, "STAT"),
            Interrupt::Timer => write!(f, "TIMER"),
            Interrupt::Serial => write!(f, "SERIAL"),
            Interrupt::Joypad => write!(f, "JOYPAD"),
        }
    }
}
