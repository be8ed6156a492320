use crate::register_file::*;

// A named configuration bit (or small field) on the register page.
#[derive(Debug, Clone, Copy)]
pub struct PinDef {
    pub name: &'static str,
    pub dev: Dev,
    pub reg: usize,
    pub mask: u32,
    pub writable: bool,
}

impl PinDef {
    const fn new(name: &'static str, dev: Dev, reg: usize, mask: u32, writable: bool) -> Self {
        PinDef { name, dev, reg, mask, writable }
    }
}

pub const PINDEFS: &[PinDef] = &[
    PinDef::new("fpgamode", Dev::Cpu, Z_RA, A_FPGAMODE, true),
    PinDef::new("bm_enablo", Dev::Bm, BM_ENABLO, u32::MAX, true),
    PinDef::new("bm_enabhi", Dev::Bm, BM_ENABHI, u32::MAX, true),
    PinDef::new("dl_enable", Dev::Dl, 0, ENABLE, true),
    PinDef::new("dz_enable", Dev::Dz, 0, ENABLE, true),
    PinDef::new("kw_enable", Dev::Kw, 0, ENABLE, true),
    PinDef::new("kw_fiftyhz", Dev::Kw, KW1, KW1_FIFTYHZ, true),
    PinDef::new("ky_enable", Dev::Ky, 0, ENABLE, true),
    PinDef::new("ky_halted", Dev::Ky, KY2, KY2_HALTED, false),
    PinDef::new("ky_haltins", Dev::Ky, KY2, KY2_HALTINS, false),
    PinDef::new("pc_enable", Dev::Pc, 0, ENABLE, true),
    PinDef::new("rl_enable", Dev::Rl, 0, ENABLE, true),
    PinDef::new("tm_enable", Dev::Tm, 0, ENABLE, true),
];

// Case-insensitive, like the pin command.
pub fn find(name: &str) -> Option<usize> {
    PINDEFS.iter().position(|p| p.name.eq_ignore_ascii_case(name))
}
