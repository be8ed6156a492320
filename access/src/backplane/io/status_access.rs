use common::constants::PSW;

use crate::backplane::io::{IoHandler, PageRegs};

// Access for processor status word through the I/O page
#[derive(Default, Clone, Copy)]
pub struct StatusAccess(u16);

impl IoHandler for StatusAccess {
    fn reset(&mut self, _regs: &mut PageRegs) {
        self.0 = 0;
    }

    fn default_addrs(&self) -> Vec<u32> {
        vec![PSW]
    }

    fn read_word(&mut self, _regs: &mut PageRegs, addr: u32) -> u16 {
        assert_eq!(addr, PSW);
        self.0
    }

    fn write_word(&mut self, _regs: &mut PageRegs, addr: u32, val: u16) {
        assert_eq!(addr, PSW);
        self.0 = val;
    }
}
