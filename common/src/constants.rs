
pub const WORD_SIZE: u32 = 2; // Bytes

pub const ADDR_MASK: u32 = 0o777777; // 18-bit physical address
pub const DATA_MASK: u32 = 0o177777;
pub const VA_MASK: u32 = 0o177777;
pub const MODE_SHIFT: u32 = 16; // Mode of a loaded virtual address lives in <17:16>

// Top 8K of the 16-bit space aliases the I/O page when the MMU is off.
pub const IO_PAGE_VA: u32 = 0o160000;
pub const IO_PAGE_BITS: u32 = 0o760000;
pub const IO_PAGE_START: u32 = 0o760000;

pub const SWITCH_REG: u32 = 0o777570; // Reads give switches, writes go to the lights
pub const MMR0: u32 = 0o777572;
pub const PSW: u32 = 0o777776;

// General registers as seen from the console.
pub const REG_BLOCK_START: u32 = 0o777700;
pub const REG_BLOCK_END: u32 = 0o777717; // Inclusive
pub const R0: u32 = REG_BLOCK_START;
pub const PC: u32 = REG_BLOCK_START + 7;

pub const KERNEL_PDR: u32 = 0o772300;
pub const USER_PDR: u32 = 0o777600;
pub const PAR_OFFSET: u32 = 0o40; // PARs follow their PDRs

pub const KERNEL_MODE: u8 = 0;
pub const USER_MODE: u8 = 3;

pub const START_PS: u16 = 0o340;

// Polls check_halted() makes before giving up.
pub const HALT_POLLS: usize = 100_000;
