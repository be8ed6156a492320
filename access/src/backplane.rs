pub mod io;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;

use common::constants::{ADDR_MASK, IO_PAGE_START, PC, WORD_SIZE};
use common::misc::insert_field;
use common::{BusError, DeviceClass};

use crate::backplane::io::console_regs::{GeneralRegs, SwitchLights};
use crate::backplane::io::mmu_regs::MmuRegs;
use crate::backplane::io::status_access::StatusAccess;
use crate::backplane::io::{IoHandler, PageRegs};
use crate::register_file::*;

use log::{debug, info, trace};

pub const RL01_BYTES: u64 = 256 * 2 * 40 * 256;
pub const RL02_BYTES: u64 = 512 * 2 * 40 * 256;

pub const DEFAULT_MEM_BYTES: u32 = IO_PAGE_START;

// Register page with a simulated bus behind it, for hosts without the
// hardware. Memory answers below mem_bytes, the I/O page answers where a
// handler is registered, and everything else times out.
pub struct Backplane {
    regs: PageRegs,
    mem: Vec<u16>,
    io_handlers: Vec<Box<dyn IoHandler>>,
    io_map: HashMap<u32, usize>, // Address -> index into io_handlers
    parity: HashSet<u32>,        // Word addresses that fail parity
    rl_drives: Vec<MsDrive>,
    tm_drives: Vec<MsDrive>,
    halt_stuck: bool,
}

impl Backplane {
    pub fn new() -> Self {
        Self::with_memory(DEFAULT_MEM_BYTES)
    }

    pub fn with_memory(mem_bytes: u32) -> Self {
        let mem_bytes = mem_bytes.min(IO_PAGE_START);
        let mut bp = Backplane {
            regs: PageRegs::new(),
            mem: vec![0; (mem_bytes / WORD_SIZE) as usize],
            io_handlers: Vec::new(),
            io_map: HashMap::new(),
            parity: HashSet::new(),
            rl_drives: vec![MsDrive::default(); DeviceClass::Rl.num_drives() as usize],
            tm_drives: vec![MsDrive::default(); DeviceClass::Tm.num_drives() as usize],
            halt_stuck: false,
        };

        let ra = bp.regs.get(Dev::Cpu, Z_RA);
        bp.regs.set(Dev::Cpu, Z_RA, insert_field(ra, A_FPGAMODE, FM_SIM));
        bp.regs.set(Dev::Ky, 0, ENABLE);
        bp.regs.set(Dev::Ky, KY2, KY2_HALTED);

        bp.set_io_handler(StatusAccess::default());
        bp.set_io_handler(SwitchLights::default());
        bp.set_io_handler(GeneralRegs::default());
        bp.set_io_handler(MmuRegs::default());
        bp
    }

    pub fn set_io_handler(&mut self, handler: impl IoHandler + 'static) {
        let idx = self.io_handlers.len();
        for addr in handler.default_addrs() {
            assert!(addr >= IO_PAGE_START, "IoHandler addr {addr:o} below the I/O page");
            let prev = self.io_map.insert(addr, idx);
            assert!(prev.is_none(), "Duplicate IoHandler for {addr:o}");
        }
        self.io_handlers.push(Box::new(handler));
    }

    pub fn mem_bytes(&self) -> u32 {
        self.mem.len() as u32 * WORD_SIZE
    }

    // Make reads of the word at addr fail parity until it is written.
    pub fn poison(&mut self, addr: u32) {
        self.parity.insert(addr & ADDR_MASK & !1);
    }

    // What the processor does on executing HALT.
    pub fn halt_instruction(&mut self) {
        let ky2 = self.regs.get(Dev::Ky, KY2);
        self.regs.set(Dev::Ky, KY2, ky2 | KY2_HALTED | KY2_HALTINS);
    }

    // Make halt requests go unanswered.
    pub fn set_halt_stuck(&mut self, stuck: bool) {
        self.halt_stuck = stuck;
    }

    pub fn latch(&mut self, addr: u32, data: u16) {
        let rk = self.regs.get(Dev::Cpu, Z_RK);
        self.regs.set(Dev::Cpu, Z_RK, insert_field(rk, K_LATADDR, addr & ADDR_MASK));
        let rl = self.regs.get(Dev::Cpu, Z_RL);
        self.regs.set(Dev::Cpu, Z_RL, insert_field(rl, L_LATDATA, data as u32));
    }

    pub fn set_drive_ready(&mut self, class: DeviceClass, drive: u8, ready: bool) {
        let (dev, reg, bit) = match class {
            DeviceClass::Rl => (Dev::Rl, RL4, RL4_DRDY0 << drive),
            DeviceClass::Tm => (Dev::Tm, TM5, TM5_TURS0 << drive),
        };
        let old = self.regs.get(dev, reg);
        self.regs.set(dev, reg, if ready { old | bit } else { old & !bit });
    }

    pub fn set_drive_fault(&mut self, drive: u8, fault: bool) {
        let bit = RL4_DERR0 << drive;
        let old = self.regs.get(Dev::Rl, RL4);
        self.regs.set(Dev::Rl, RL4, if fault { old | bit } else { old & !bit });
    }

    pub fn set_drive_position(&mut self, class: DeviceClass, drive: u8, posn: u32) {
        self.drive_mut(class, drive).curposn = posn;
    }

    fn drive_mut(&mut self, class: DeviceClass, drive: u8) -> &mut MsDrive {
        match class {
            DeviceClass::Rl => &mut self.rl_drives[drive as usize],
            DeviceClass::Tm => &mut self.tm_drives[drive as usize],
        }
    }

    pub fn halted(&self) -> bool {
        self.regs.get(Dev::Ky, KY2) & KY2_HALTED != 0
    }

    fn io_read(&mut self, addr: u32) -> Result<u16, BusError> {
        let idx = *self.io_map.get(&addr).ok_or(BusError::Timeout)?;
        Ok(self.io_handlers[idx].read_word(&mut self.regs, addr))
    }

    fn io_write(&mut self, addr: u32, val: u16) -> Result<(), BusError> {
        let idx = *self.io_map.get(&addr).ok_or(BusError::Timeout)?;
        self.io_handlers[idx].write_word(&mut self.regs, addr, val);
        Ok(())
    }
}

impl Default for Backplane {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile for Backplane {
    fn read_reg(&mut self, dev: Dev, reg: usize) -> u32 {
        self.regs.get(dev, reg)
    }

    fn write_reg(&mut self, dev: Dev, reg: usize, val: u32) {
        // The halt bits belong to the processor.
        let val = if dev == Dev::Ky && reg == KY2 {
            let mask = KY2_HALTED | KY2_HALTINS;
            (val & !mask) | (self.regs.get(dev, reg) & mask)
        } else {
            val
        };
        self.regs.set(dev, reg, val);
    }

    // One instruction: with nothing to fetch, it behaves as a NOP.
    fn step_req(&mut self) {
        let ky2 = self.regs.get(Dev::Ky, KY2);
        if ky2 & KY2_HALTED == 0 || ky2 & KY2_HALTINS != 0 {
            debug!("Backplane: step ignored, ky2 {ky2:o}");
            return;
        }
        if let Ok(pc) = self.io_read(PC) {
            let _ = self.io_write(PC, pc.wrapping_add(WORD_SIZE as u16));
        }
    }

    fn halt_req(&mut self) {
        if self.halt_stuck {
            debug!("Backplane: halt request lost");
            return;
        }
        let ky2 = self.regs.get(Dev::Ky, KY2);
        self.regs.set(Dev::Ky, KY2, ky2 | KY2_HALTED);
    }

    fn cont_req(&mut self) {
        let ky2 = self.regs.get(Dev::Ky, KY2);
        if ky2 & KY2_HALTINS != 0 {
            debug!("Backplane: cont ignored after HALT instruction");
            return;
        }
        self.regs.set(Dev::Ky, KY2, ky2 & !KY2_HALTED);
    }

    fn reset(&mut self) {
        let ky2 = self.regs.get(Dev::Ky, KY2);
        self.regs.set(Dev::Ky, KY2, (ky2 | KY2_HALTED) & !KY2_HALTINS);
        for handler in self.io_handlers.iter_mut() {
            handler.reset(&mut self.regs);
        }
        self.latch(0, 0);
    }

    fn dma_read(&mut self, addr: u32) -> Result<u16, BusError> {
        let addr = addr & ADDR_MASK;
        let res = if addr >= IO_PAGE_START {
            self.io_read(addr)
        } else if self.parity.contains(&(addr & !1)) {
            Err(BusError::Parity)
        } else {
            self.mem.get((addr / WORD_SIZE) as usize).copied().ok_or(BusError::Timeout)
        };
        trace!("Backplane: read {addr:06o} -> {res:?}");
        if let Ok(data) = res {
            self.latch(addr, data);
        }
        res
    }

    fn dma_write(&mut self, addr: u32, data: u16) -> Result<(), BusError> {
        let addr = addr & ADDR_MASK;
        let res = if addr >= IO_PAGE_START {
            self.io_write(addr, data)
        } else {
            match self.mem.get_mut((addr / WORD_SIZE) as usize) {
                Some(word) => {
                    *word = data;
                    self.parity.remove(&(addr & !1));
                    Ok(())
                }
                None => Err(BusError::Timeout),
            }
        };
        trace!("Backplane: write {addr:06o} {data:06o} -> {res:?}");
        if res.is_ok() {
            self.latch(addr, data);
        }
        res
    }

    fn ms_drive(&mut self, class: DeviceClass, drive: u8) -> MsDrive {
        self.drive_mut(class, drive).clone()
    }

    fn ms_load(
        &mut self,
        class: DeviceClass,
        drive: u8,
        readonly: bool,
        filename: Option<&str>,
    ) -> std::io::Result<()> {
        let rl01 = match filename {
            None | Some("") => false,
            Some(name) => check_image(class, name)?,
        };

        let dr = self.drive_mut(class, drive);
        dr.readonly = readonly;
        let Some(name) = filename else {
            return Ok(());
        };
        if dr.filename != name {
            dr.fnseq = dr.fnseq.wrapping_add(1);
        }
        dr.filename = name.to_string();
        dr.rl01 = rl01;
        dr.curposn = 0;

        let loaded = !name.is_empty();
        info!("Backplane: {class}{drive} {}", if loaded { name } else { "unloaded" });
        self.set_drive_ready(class, drive, loaded);
        if class == DeviceClass::Rl {
            self.set_drive_fault(drive, false);
        }
        Ok(())
    }
}

// Validates an image for the class. For disks, returns whether it is an RL01.
fn check_image(class: DeviceClass, name: &str) -> std::io::Result<bool> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match class {
        DeviceClass::Rl => {
            let (rl01, want) = match ext.as_str() {
                "rl01" => (true, RL01_BYTES),
                "rl02" => (false, RL02_BYTES),
                _ => {
                    let msg = format!("{name} must end with .rl01 or .rl02");
                    return Err(Error::new(ErrorKind::InvalidInput, msg));
                }
            };
            let len = fs::metadata(name)?.len();
            if len != want {
                let msg = format!("{name} is {len} bytes, should be {want}");
                return Err(Error::new(ErrorKind::InvalidData, msg));
            }
            Ok(rl01)
        }
        DeviceClass::Tm => {
            if ext != "tap" {
                let msg = format!("{name} must end with .tap");
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            fs::metadata(name)?;
            Ok(false)
        }
    }
}
