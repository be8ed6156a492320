use access_lib::{AccessError, RegisterAccess};
use common::constants::{
    IO_PAGE_BITS, IO_PAGE_VA, KERNEL_MODE, KERNEL_PDR, MMR0, PAR_OFFSET, PSW, USER_MODE, USER_PDR, VA_MASK,
};
use common::misc::field;

use log::trace;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use thiserror::Error;

const MMR0_ENABLE: u16 = 0o1;
const PSW_MODE: u16 = 0o140000; // Current mode, <15:14>

const PDR_VALID: u16 = 0o2;
const PDR_EXPAND_DOWN: u16 = 0o10;
const PDR_LENGTH: u16 = 0o77400;
const PAR_ADDR: u16 = 0o7777;

const PAGE_SHIFT: u32 = 13;
const BLOCK_SHIFT: u32 = 6; // 64-byte blocks
const BLOCK_MASK: u32 = 0o177;
const PAGE_OFFSET: u32 = 0o17777;

// Why a virtual address has no physical address. Codes are stable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TranslationError {
    #[error("va out of range")]
    OutOfRange = 1,

    #[error("unable to read mmr0")]
    CannotReadMmr0,

    #[error("unable to read psw")]
    CannotReadStatusWord,

    #[error("invalid processor mode")]
    InvalidMode,

    #[error("unable to read pdr")]
    CannotReadPageDescriptor,

    #[error("page marked no-access")]
    PageNoAccess,

    #[error("below length of expand-down page")]
    BelowExpandDownLimit,

    #[error("above length of expand-up page")]
    AboveExpandUpLimit,

    #[error("unable to read par")]
    CannotReadPageAddress,
}

impl TranslationError {
    pub fn code(self) -> u8 {
        self.to_u8().unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum MmuError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

// Reads one I/O page word, turning a bus error into `err`.
fn read_word<A: RegisterAccess + ?Sized>(acc: &mut A, addr: u32, err: TranslationError) -> Result<u16, MmuError> {
    match acc.read_memory(addr)? {
        Ok(val) => Ok(val),
        Err(bus) => {
            trace!("mmu: read of {addr:06o} failed: {bus}");
            Err(err.into())
        }
    }
}

// Translates va the way the processor's memory management would. With mode
// None the current mode is taken from the PSW. Only ever reads.
pub fn translate<A: RegisterAccess + ?Sized>(acc: &mut A, va: u32, mode: Option<u8>) -> Result<u32, MmuError> {
    if va > VA_MASK {
        return Err(TranslationError::OutOfRange.into());
    }

    let mmr0 = read_word(acc, MMR0, TranslationError::CannotReadMmr0)?;
    if mmr0 & MMR0_ENABLE == 0 {
        return Ok(if va >= IO_PAGE_VA { va | IO_PAGE_BITS } else { va });
    }

    let mode = match mode {
        Some(mode) => mode,
        None => {
            let psw = read_word(acc, PSW, TranslationError::CannotReadStatusWord)?;
            field(psw as u32, PSW_MODE as u32) as u8
        }
    };

    let base = match mode {
        KERNEL_MODE => KERNEL_PDR,
        USER_MODE => USER_PDR,
        _ => return Err(TranslationError::InvalidMode.into()),
    };

    let page = va >> PAGE_SHIFT;
    let pdr = read_word(acc, base + 2 * page, TranslationError::CannotReadPageDescriptor)?;
    if pdr & PDR_VALID == 0 {
        return Err(TranslationError::PageNoAccess.into());
    }

    let block = (va >> BLOCK_SHIFT) & BLOCK_MASK;
    let length = field(pdr as u32, PDR_LENGTH as u32);
    if pdr & PDR_EXPAND_DOWN != 0 {
        if block < length {
            return Err(TranslationError::BelowExpandDownLimit.into());
        }
    } else if block > length {
        return Err(TranslationError::AboveExpandUpLimit.into());
    }

    let par = read_word(acc, base + PAR_OFFSET + 2 * page, TranslationError::CannotReadPageAddress)?;
    let pa = (va & PAGE_OFFSET) + (((par & PAR_ADDR) as u32) << BLOCK_SHIFT);
    trace!("mmu: {va:06o} mode {mode} -> {pa:06o}");
    Ok(pa)
}
