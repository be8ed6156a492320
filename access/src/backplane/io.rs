pub mod console_regs;
pub mod mmu_regs;
pub mod status_access;

use crate::register_file::Dev;

// Device registers of the page, as the I/O handlers see them.
pub struct PageRegs([[u32; Dev::NUM_REGS]; Dev::COUNT]);

impl PageRegs {
    pub fn new() -> Self {
        PageRegs([[0; Dev::NUM_REGS]; Dev::COUNT])
    }

    pub fn get(&self, dev: Dev, reg: usize) -> u32 {
        self.0[dev as usize][reg]
    }

    pub fn set(&mut self, dev: Dev, reg: usize, val: u32) {
        self.0[dev as usize][reg] = val;
    }
}

impl Default for PageRegs {
    fn default() -> Self {
        Self::new()
    }
}

// A device answering for addresses in the I/O page.
pub trait IoHandler: Send {
    fn reset(&mut self, _regs: &mut PageRegs) {}
    fn default_addrs(&self) -> Vec<u32>;

    fn read_word(&mut self, regs: &mut PageRegs, addr: u32) -> u16;
    fn write_word(&mut self, regs: &mut PageRegs, addr: u32, val: u16);
}
