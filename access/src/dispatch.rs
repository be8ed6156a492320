use common::{DeviceClass, DriveStatus, MemoryResult, RegisterSnapshot, RunState};

use crate::backplane::Backplane;
use crate::local::LocalAccess;
use crate::register_access::{AccessError, PinIndex, RegisterAccess};
use crate::remote::TcpRemoteAccess;

use delegate::delegate;

// Either access path, picked at startup.
pub enum Access {
    Local(LocalAccess<Backplane>),
    Remote(TcpRemoteAccess),
}

impl Access {
    pub fn is_remote(&self) -> bool {
        matches!(self, Access::Remote(_))
    }
}

impl RegisterAccess for Access {
    delegate! {
        to match self {
            Access::Local(x) => x,
            Access::Remote(x) => x,
        } {
            fn step(&mut self) -> Result<(), AccessError>;
            fn halt(&mut self) -> Result<(), AccessError>;
            fn cont(&mut self) -> Result<(), AccessError>;
            fn reset(&mut self) -> Result<(), AccessError>;
            fn sample(&mut self) -> Result<RegisterSnapshot, AccessError>;
            fn run_state(&mut self) -> Result<RunState, AccessError>;
            fn check_halted(&mut self) -> Result<bool, AccessError>;
            fn set_switch_register(&mut self, val: u32) -> Result<(), AccessError>;
            fn read_memory(&mut self, addr: u32) -> Result<MemoryResult, AccessError>;
            fn write_memory(&mut self, addr: u32, data: u16) -> Result<MemoryResult, AccessError>;
            fn find_pin(&mut self, name: &str) -> Result<PinIndex, AccessError>;
            fn get_pin(&mut self, pin: PinIndex) -> Result<u32, AccessError>;
            fn set_pin(&mut self, pin: PinIndex, val: u32) -> Result<bool, AccessError>;
            fn drive_status(&mut self, class: DeviceClass, drive: u8) -> Result<DriveStatus, AccessError>;
            fn drive_file(&mut self, class: DeviceClass, drive: u8) -> Result<String, AccessError>;
            fn load_drive(
                &mut self,
                class: DeviceClass,
                drive: u8,
                write_protected: bool,
                file: Option<&str>
            ) -> Result<Option<String>, AccessError>;
        }
    }
}
