use std::fmt;

use derive_more::IsVariant;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use thiserror::Error;

// The hardware's run indicator is signed: positive running, zero halted by
// request (resumable), negative halted by a HALT instruction (reset required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum RunState {
    Running,
    HaltedResumable,
    HaltedNeedsReset,
}

impl RunState {
    pub fn from_indicator(val: i8) -> Self {
        match val {
            v if v > 0 => RunState::Running,
            0 => RunState::HaltedResumable,
            _ => RunState::HaltedNeedsReset,
        }
    }

    pub fn to_indicator(self) -> i8 {
        match self {
            RunState::Running => 1,
            RunState::HaltedResumable => 0,
            RunState::HaltedNeedsReset => -1,
        }
    }

    pub fn is_halted(self) -> bool {
        !self.is_running()
    }

    // Reset is the only way out of HaltedNeedsReset, and it lands in HaltedResumable.
    pub fn can_become(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Running, HaltedResumable)
                | (Running, HaltedNeedsReset)
                | (HaltedResumable, Running)
                | (HaltedNeedsReset, HaltedResumable)
        ) || self == next
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Running => "running",
            RunState::HaltedResumable => "halted",
            RunState::HaltedNeedsReset => "halted (reset required)",
        };
        f.write_str(s)
    }
}

////////////////////////////////////////////////////////////////////////////////

// One observation of the console lights. All fields come from the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub addr: u32, // 18 bits
    pub data: u16,
    pub light_reg: u16,
    pub switch_reg: u32, // 18 bits
    pub run_state: RunState,
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum BusError {
    #[error("dma timed out")]
    Timeout = -1, // Nothing at that address

    #[error("parity error")]
    Parity = -2, // Something there but corrupt

    #[error("dma blocked")]
    Blocked = -3, // Stuck, e.g. a real KY-11 holding the bus
}

impl BusError {
    pub fn code(self) -> i32 {
        self.to_i32().unwrap_or(-1)
    }

    pub fn from_code(code: i32) -> Option<BusError> {
        BusError::from_i32(code)
    }
}

pub type MemoryResult = Result<u16, BusError>;

// Wire form: the data value, or a negative error code.
pub fn memory_result_to_code(res: MemoryResult) -> i32 {
    match res {
        Ok(data) => data as i32,
        Err(e) => e.code(),
    }
}

pub fn memory_result_from_code(code: i32) -> Option<MemoryResult> {
    if code >= 0 {
        u16::try_from(code).ok().map(Ok)
    } else {
        BusError::from_code(code).map(Err)
    }
}
