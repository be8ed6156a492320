pub mod constants;
pub mod device;
pub mod mem;
pub mod misc;
pub mod regs;

pub use device::{DecodedStatus, DeviceClass, DriveStatus, StatusLayout};
pub use regs::{BusError, MemoryResult, RegisterSnapshot, RunState};
