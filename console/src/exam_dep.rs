use std::fmt;

use access_lib::{AccessError, RegisterAccess};
use common::constants::{ADDR_MASK, MODE_SHIFT, VA_MASK};
use common::misc::in_reg_block;
use common::{BusError, MemoryResult};

use crate::mmu::{self, MmuError, TranslationError};

use log::trace;

const MODE_BITS: u32 = ADDR_MASK & !VA_MASK; // <17:16> of a virtual loaded address

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedAddress {
    pub value: u32, // 18 bits. When virtual, mode in <17:16>
    pub virt: bool,
}

impl LoadedAddress {
    pub fn offset(&self) -> u32 {
        self.value & VA_MASK
    }

    pub fn mode(&self) -> u8 {
        (self.value >> MODE_SHIFT) as u8
    }

    // Physical address, or why there isn't one.
    pub fn resolve<A: RegisterAccess + ?Sized>(
        &self,
        acc: &mut A,
    ) -> Result<Result<u32, TranslationError>, AccessError> {
        if !self.virt {
            return Ok(Ok(self.value));
        }
        match mmu::translate(acc, self.offset(), Some(self.mode())) {
            Ok(pa) => Ok(Ok(pa)),
            Err(MmuError::Translation(e)) => Ok(Err(e)),
            Err(MmuError::Access(e)) => Err(e),
        }
    }

    fn advance(&mut self, pa: u32) {
        let inc = if in_reg_block(pa) { 1 } else { 2 };
        self.value = if self.virt {
            (self.value & MODE_BITS) | ((self.value + inc) & VA_MASK)
        } else {
            (self.value + inc) & ADDR_MASK
        };
    }

    fn kind(&self) -> &'static str {
        if self.virt { "virtual" } else { "physical" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExDepKind {
    Examine,
    Deposit,
}

// Result of one examine or deposit, displayable as the console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExDepOutcome {
    pub kind: ExDepKind,
    pub addr: LoadedAddress,
    pub pa: Result<u32, TranslationError>,
    pub result: Option<MemoryResult>, // None when there was no physical address
}

impl ExDepOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, Some(Ok(_)))
    }

    pub fn data(&self) -> Option<u16> {
        self.result.and_then(|r| r.ok())
    }

    pub fn bus_error(&self) -> Option<BusError> {
        self.result.and_then(|r| r.err())
    }
}

impl fmt::Display for ExDepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            ExDepKind::Examine => "examined",
            ExDepKind::Deposit => "deposited to",
        };
        write!(f, "{op} {} address {:06o}", self.addr.kind(), self.addr.value)?;
        match self.pa {
            Err(e) => return write!(f, ", {e}"),
            Ok(pa) if self.addr.virt => write!(f, " (pa {pa:06o})")?,
            Ok(_) => {}
        }
        match self.result {
            Some(Ok(data)) => write!(f, ", data {data:06o}"),
            Some(Err(e)) => write!(f, ", {e}"),
            None => Ok(()),
        }
    }
}

// The loaded address register and the examine/deposit auto-increment flags.
// A flag is set when the last operation was of that kind and succeeded; the
// next operation of the same kind then moves to the following location.
#[derive(Debug, Default)]
pub struct ExamDep {
    loaded: LoadedAddress,
    exam_inc: bool,
    dep_inc: bool,
}

impl ExamDep {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn loaded(&self) -> LoadedAddress {
        self.loaded
    }

    pub fn auto_increment(&self, kind: ExDepKind) -> bool {
        match kind {
            ExDepKind::Examine => self.exam_inc,
            ExDepKind::Deposit => self.dep_inc,
        }
    }

    pub fn clear_increments(&mut self) {
        self.exam_inc = false;
        self.dep_inc = false;
    }

    // From the switch register. Word aligned except in the register block.
    pub fn load(&mut self, switches: u32, virt: bool) -> LoadedAddress {
        let mut value = switches & ADDR_MASK;
        if !in_reg_block(value) {
            value &= !1;
        }
        self.set_loaded(LoadedAddress { value, virt });
        self.loaded
    }

    pub fn set_loaded(&mut self, addr: LoadedAddress) {
        self.loaded = addr;
        self.clear_increments();
    }

    // Examines, or deposits data, at the loaded address.
    pub fn access<A: RegisterAccess + ?Sized>(
        &mut self,
        acc: &mut A,
        kind: ExDepKind,
        data: u16,
    ) -> Result<ExDepOutcome, AccessError> {
        let mut pa = self.loaded.resolve(acc)?;
        if let (true, Ok(prev)) = (self.auto_increment(kind), pa) {
            self.loaded.advance(prev);
            pa = self.loaded.resolve(acc)?;
        }

        let result = match (pa, kind) {
            (Err(_), _) => None,
            (Ok(pa), ExDepKind::Examine) => Some(acc.read_memory(pa)?),
            (Ok(pa), ExDepKind::Deposit) => Some(acc.write_memory(pa, data)?),
        };
        let outcome = ExDepOutcome { kind, addr: self.loaded, pa, result };
        trace!("exam_dep: {outcome}");

        self.clear_increments();
        match kind {
            ExDepKind::Examine => self.exam_inc = outcome.succeeded(),
            ExDepKind::Deposit => self.dep_inc = outcome.succeeded(),
        }
        Ok(outcome)
    }
}
