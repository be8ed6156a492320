use common::constants::{KERNEL_PDR, MMR0, PAR_OFFSET, USER_PDR};

use crate::backplane::io::{IoHandler, PageRegs};

const PAGES: u32 = 8;

// MMR0 plus the kernel and user PDR/PAR banks.
#[derive(Default, Clone, Copy)]
pub struct MmuRegs {
    mmr0: u16,
    kernel: [u16; 2 * PAGES as usize], // PDRs then PARs
    user: [u16; 2 * PAGES as usize],
}

impl MmuRegs {
    fn bank_addrs(base: u32) -> impl Iterator<Item = u32> {
        (0..PAGES).flat_map(move |page| [base + 2 * page, base + PAR_OFFSET + 2 * page])
    }

    fn slot(&mut self, addr: u32) -> &mut u16 {
        if addr == MMR0 {
            return &mut self.mmr0;
        }
        let (bank, base) = if (KERNEL_PDR..KERNEL_PDR + 2 * PAR_OFFSET).contains(&addr) {
            (&mut self.kernel, KERNEL_PDR)
        } else if (USER_PDR..USER_PDR + 2 * PAR_OFFSET).contains(&addr) {
            (&mut self.user, USER_PDR)
        } else {
            panic!("MmuRegs doesn't handle address {addr:o}");
        };
        let off = addr - base;
        let idx = if off >= PAR_OFFSET { PAGES + (off - PAR_OFFSET) / 2 } else { off / 2 };
        &mut bank[idx as usize]
    }
}

impl IoHandler for MmuRegs {
    fn reset(&mut self, _regs: &mut PageRegs) {
        self.mmr0 = 0;
    }

    fn default_addrs(&self) -> Vec<u32> {
        let mut addrs = vec![MMR0];
        addrs.extend(Self::bank_addrs(KERNEL_PDR));
        addrs.extend(Self::bank_addrs(USER_PDR));
        addrs
    }

    fn read_word(&mut self, _regs: &mut PageRegs, addr: u32) -> u16 {
        *self.slot(addr)
    }

    fn write_word(&mut self, _regs: &mut PageRegs, addr: u32, val: u16) {
        *self.slot(addr) = val;
    }
}
