use std::io;

use common::{BusError, DeviceClass};

use num_derive::{FromPrimitive, ToPrimitive};

// Devices on the register page, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Dev {
    Cpu = 0, // "11"
    Bm,
    Dl,
    Dz,
    Kw,
    Ky,
    Pc,
    Rl,
    Tm,
}

impl Dev {
    pub const COUNT: usize = 9;
    pub const NUM_REGS: usize = 16;
}

// Register layout of the page. Masks are applied with common::misc::field().

pub const ENABLE: u32 = 1 << 31; // Register 0 of every device

pub const Z_RA: usize = 1;
pub const A_FPGAMODE: u32 = 3 << 30;
pub const Z_RK: usize = 10;
pub const K_LATADDR: u32 = 0o777777; // Address last seen on the bus
pub const Z_RL: usize = 11;
pub const L_LATDATA: u32 = 0o177777; // Data last seen on the bus

pub const FM_OFF: u32 = 0; // Disconnected, simulated devices held in reset
pub const FM_SIM: u32 = 1; // Simulated processor
pub const FM_REAL: u32 = 2; // Real PDP-11 on the bus
pub const FM_MAN: u32 = 3; // Manual control of bus lines

pub const KY1: usize = 1;
pub const KY_SWITCHES: u32 = 0x0000_ffff;
pub const KY_LIGHTS: u32 = 0xffff_0000;
pub const KY2: usize = 2;
pub const KY2_HALTED: u32 = 1 << 0;
pub const KY2_HALTINS: u32 = 1 << 1; // Halted by a HALT instruction
pub const KY2_SR1716: u32 = 3 << 2; // Switch register bits <17:16>

pub const KW1: usize = 1;
pub const KW1_FIFTYHZ: u32 = 1 << 0;

pub const BM_ENABLO: usize = 1;
pub const BM_ENABHI: usize = 2;

// Per-drive bits, shifted left by the drive number.
pub const RL4: usize = 4;
pub const RL4_DRDY0: u32 = 1 << 0;
pub const RL4_DERR0: u32 = 1 << 4;
pub const TM5: usize = 5;
pub const TM5_TURS0: u32 = 1 << 0;

////////////////////////////////////////////////////////////////////////////////

// Drive bookkeeping the mass storage servers share with the console.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsDrive {
    pub filename: String, // Empty when unloaded
    pub readonly: bool,
    pub rl01: bool,
    pub fnseq: u8, // Bumped on every filename change
    pub curposn: u32, // Cylinder for disks, byte position for tapes
}

// The hardware register page. Implemented by the native driver on real
// hardware and by Backplane when there is none. Callers own it exclusively,
// so a sequence of calls on one &mut borrow can't interleave with anyone else.
pub trait RegisterFile: Send {
    fn read_reg(&mut self, dev: Dev, reg: usize) -> u32;
    fn write_reg(&mut self, dev: Dev, reg: usize, val: u32);

    fn step_req(&mut self);
    fn halt_req(&mut self);
    fn cont_req(&mut self);
    fn reset(&mut self);

    fn dma_read(&mut self, addr: u32) -> Result<u16, BusError>;
    fn dma_write(&mut self, addr: u32, data: u16) -> Result<(), BusError>;

    fn ms_drive(&mut self, class: DeviceClass, drive: u8) -> MsDrive;

    // filename: None only changes write protection, Some("") unloads.
    fn ms_load(&mut self, class: DeviceClass, drive: u8, readonly: bool, filename: Option<&str>)
        -> io::Result<()>;
}
