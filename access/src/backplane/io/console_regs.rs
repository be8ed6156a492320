use common::constants::{R0, SWITCH_REG};
use common::misc::{field, insert_field};

use crate::backplane::io::{IoHandler, PageRegs};
use crate::register_file::{Dev, KY1, KY_LIGHTS, KY_SWITCHES};

// 777570: reads give the switches, writes go to the light register.
#[derive(Default, Clone, Copy)]
pub struct SwitchLights();

impl IoHandler for SwitchLights {
    fn default_addrs(&self) -> Vec<u32> {
        vec![SWITCH_REG]
    }

    fn read_word(&mut self, regs: &mut PageRegs, addr: u32) -> u16 {
        assert_eq!(addr, SWITCH_REG);
        field(regs.get(Dev::Ky, KY1), KY_SWITCHES) as u16
    }

    fn write_word(&mut self, regs: &mut PageRegs, addr: u32, val: u16) {
        assert_eq!(addr, SWITCH_REG);
        let ky1 = regs.get(Dev::Ky, KY1);
        regs.set(Dev::Ky, KY1, insert_field(ky1, KY_LIGHTS, val as u32));
    }
}

////////////////////////////////////////////////////////////////////////////////

// R0-R5, SP, PC at 777700-777707. The console addresses them one apart.
#[derive(Default, Clone, Copy)]
pub struct GeneralRegs([u16; 8]);

impl IoHandler for GeneralRegs {
    fn default_addrs(&self) -> Vec<u32> {
        (R0..R0 + 8).collect()
    }

    fn read_word(&mut self, _regs: &mut PageRegs, addr: u32) -> u16 {
        self.0[(addr - R0) as usize]
    }

    fn write_word(&mut self, _regs: &mut PageRegs, addr: u32, val: u16) {
        self.0[(addr - R0) as usize] = val;
    }
}
