use std::io::{self, Read, Write};

use common::mem::{ReadLe, WriteLe};
use common::{DeviceClass, RegisterSnapshot, RunState};

use num_derive::{FromPrimitive, ToPrimitive};

// Command bytes. Requests and replies are little-endian; addresses take 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Command {
    Step = 1,
    Halt = 2,
    Cont = 3,
    Sample = 4,
    SetSr = 5,
    RdMem = 6,
    WrMem = 7,
    Reset = 8,
    ChkHlt = 9,
    PinFind = 10,
    PinGet = 11,
    PinSet = 12,
    MsStat = 13,
    MsFile = 14,
    MsLoad = 15,
}

// MSLOAD flags
pub const LOAD_WRPROT: u8 = 1 << 0;
pub const LOAD_HAS_FILE: u8 = 1 << 1;

pub const PIN_NOT_FOUND: i16 = -1;

pub fn write_sample<W: Write>(w: &mut W, snap: &RegisterSnapshot) -> io::Result<()> {
    w.write_u24(snap.addr)?;
    w.write_u16(snap.data)?;
    w.write_u16(snap.light_reg)?;
    w.write_u24(snap.switch_reg)?;
    w.write_i8(snap.run_state.to_indicator())
}

pub fn read_sample<R: Read>(r: &mut R) -> io::Result<RegisterSnapshot> {
    Ok(RegisterSnapshot {
        addr: r.read_u24()?,
        data: r.read_u16()?,
        light_reg: r.read_u16()?,
        switch_reg: r.read_u24()?,
        run_state: RunState::from_indicator(r.read_i8()?),
    })
}

pub fn write_drive<W: Write>(w: &mut W, class: DeviceClass, drive: u8) -> io::Result<()> {
    w.write_u16(class.ctlid())?;
    w.write_u8(drive)
}

pub fn read_drive<R: Read>(r: &mut R) -> io::Result<(DeviceClass, u8)> {
    let id = r.read_u16()?;
    let Some(class) = DeviceClass::from_ctlid(id) else {
        let msg = format!("unknown controller id {id:#06x}");
        return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
    };
    Ok((class, r.read_u8()?))
}
