use std::io;

use common::constants::HALT_POLLS;
use common::{DeviceClass, DriveStatus, MemoryResult, RegisterSnapshot, RunState};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinIndex(pub u16);

// Failures of the access path itself. Bus errors are not among them, those are
// ordinary MemoryResult values.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("bad command byte {0}")]
    BadCommand(u8),

    #[error("malformed reply: {0}")]
    BadReply(String),

    #[error("pin {0} not found")]
    UnknownPin(String),

    #[error("pin index {0} out of range")]
    BadPinIndex(u16),

    #[error("{class} drive {drive} out of range")]
    BadDrive { class: DeviceClass, drive: u8 },
}

impl AccessError {
    // Peer went away between commands or mid-reply.
    pub fn is_disconnect(&self) -> bool {
        match self {
            AccessError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

pub fn check_drive(class: DeviceClass, drive: u8) -> Result<(), AccessError> {
    if drive >= class.num_drives() {
        return Err(AccessError::BadDrive { class, drive });
    }
    Ok(())
}

// Everything the console can do to the processor. step/halt/cont/reset only
// request the change; the processor honors it some time later.
pub trait RegisterAccess {
    fn step(&mut self) -> Result<(), AccessError>;
    fn halt(&mut self) -> Result<(), AccessError>;
    fn cont(&mut self) -> Result<(), AccessError>;
    fn reset(&mut self) -> Result<(), AccessError>;

    fn sample(&mut self) -> Result<RegisterSnapshot, AccessError>;

    fn run_state(&mut self) -> Result<RunState, AccessError> {
        Ok(self.sample()?.run_state)
    }

    // Busy-polls for a halt. Returns false if the processor is still running
    // after HALT_POLLS polls.
    fn check_halted(&mut self) -> Result<bool, AccessError> {
        for _ in 0..HALT_POLLS {
            if self.run_state()?.is_halted() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn set_switch_register(&mut self, val: u32) -> Result<(), AccessError>;

    fn read_memory(&mut self, addr: u32) -> Result<MemoryResult, AccessError>;
    fn write_memory(&mut self, addr: u32, data: u16) -> Result<MemoryResult, AccessError>;

    fn find_pin(&mut self, name: &str) -> Result<PinIndex, AccessError>;
    fn get_pin(&mut self, pin: PinIndex) -> Result<u32, AccessError>;
    // False if the pin is read-only.
    fn set_pin(&mut self, pin: PinIndex, val: u32) -> Result<bool, AccessError>;

    fn drive_status(&mut self, class: DeviceClass, drive: u8) -> Result<DriveStatus, AccessError>;
    fn drive_file(&mut self, class: DeviceClass, drive: u8) -> Result<String, AccessError>;

    // file: Some(path) loads, Some("") unloads, None only sets write protection.
    // Returns a message describing why the load failed, if it did.
    fn load_drive(
        &mut self,
        class: DeviceClass,
        drive: u8,
        write_protected: bool,
        file: Option<&str>,
    ) -> Result<Option<String>, AccessError>;
}
