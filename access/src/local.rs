use common::constants::{ADDR_MASK, DATA_MASK};
use common::misc::{field, insert_field, lobit};
use common::{BusError, DeviceClass, DriveStatus, MemoryResult, RegisterSnapshot, RunState, StatusLayout};

use crate::pins::{self, PINDEFS};
use crate::register_access::{check_drive, AccessError, PinIndex, RegisterAccess};
use crate::register_file::*;

use log::{trace, warn};

// Direct access to a register page on this host.
pub struct LocalAccess<F: RegisterFile> {
    file: F,
    max_pin: Option<usize>, // Highest index handed out by find_pin()
}

impl<F: RegisterFile> LocalAccess<F> {
    pub fn new(file: F) -> Self {
        LocalAccess { file, max_pin: None }
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut F {
        &mut self.file
    }

    fn ky2(&mut self) -> u32 {
        self.file.read_reg(Dev::Ky, KY2)
    }

    fn dma_allowed(&mut self) -> bool {
        let mode = field(self.file.read_reg(Dev::Cpu, Z_RA), A_FPGAMODE);
        mode == FM_SIM || mode == FM_REAL
    }

    fn pin_def(&self, pin: PinIndex) -> Result<&'static pins::PinDef, AccessError> {
        match self.max_pin {
            Some(max) if (pin.0 as usize) <= max => Ok(&PINDEFS[pin.0 as usize]),
            _ => Err(AccessError::BadPinIndex(pin.0)),
        }
    }

    fn status_word(&mut self, class: DeviceClass, drive: u8) -> DriveStatus {
        let dr = self.file.ms_drive(class, drive);
        let layout: &StatusLayout = class.layout();

        let mut word = 0;
        if !dr.filename.is_empty() {
            word |= layout.load;
        }
        if dr.readonly {
            word |= layout.wrprot;
        }
        if dr.rl01 {
            word |= layout.media;
        }
        word = insert_field(word, layout.fnseq, dr.fnseq as u32);

        let mut position = 0;
        if layout.cylno != 0 {
            word = insert_field(word, layout.cylno, dr.curposn);
        } else {
            position = dr.curposn;
        }

        match class {
            DeviceClass::Rl => {
                let rl4 = self.file.read_reg(Dev::Rl, RL4) >> drive;
                if rl4 & RL4_DRDY0 != 0 {
                    word |= layout.ready;
                }
                if rl4 & RL4_DERR0 != 0 {
                    word |= layout.fault;
                }
            }
            DeviceClass::Tm => {
                let tm5 = self.file.read_reg(Dev::Tm, TM5) >> drive;
                if tm5 & TM5_TURS0 != 0 {
                    word |= layout.ready;
                }
            }
        }

        DriveStatus { word, position }
    }
}

impl<F: RegisterFile> RegisterAccess for LocalAccess<F> {
    fn step(&mut self) -> Result<(), AccessError> {
        trace!("local: step");
        self.file.step_req();
        Ok(())
    }

    fn halt(&mut self) -> Result<(), AccessError> {
        trace!("local: halt");
        self.file.halt_req();
        Ok(())
    }

    fn cont(&mut self) -> Result<(), AccessError> {
        trace!("local: cont");
        self.file.cont_req();
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AccessError> {
        trace!("local: reset");
        self.file.reset();
        Ok(())
    }

    fn sample(&mut self) -> Result<RegisterSnapshot, AccessError> {
        let addr = field(self.file.read_reg(Dev::Cpu, Z_RK), K_LATADDR);
        let data = field(self.file.read_reg(Dev::Cpu, Z_RL), L_LATDATA) as u16;
        let ky1 = self.file.read_reg(Dev::Ky, KY1);
        let ky2 = self.ky2();
        let switch_reg = field(ky1, KY_SWITCHES) | (field(ky2, KY2_SR1716) << 16);
        Ok(RegisterSnapshot {
            addr,
            data,
            light_reg: field(ky1, KY_LIGHTS) as u16,
            switch_reg,
            run_state: run_state_of(ky2),
        })
    }

    fn run_state(&mut self) -> Result<RunState, AccessError> {
        let ky2 = self.ky2();
        Ok(run_state_of(ky2))
    }

    fn set_switch_register(&mut self, val: u32) -> Result<(), AccessError> {
        let val = val & ADDR_MASK;
        trace!("local: switches {val:06o}");
        let ky1 = self.file.read_reg(Dev::Ky, KY1);
        self.file.write_reg(Dev::Ky, KY1, insert_field(ky1, KY_SWITCHES, val & DATA_MASK));
        let ky2 = self.ky2();
        self.file.write_reg(Dev::Ky, KY2, insert_field(ky2, KY2_SR1716, val >> 16));
        Ok(())
    }

    fn read_memory(&mut self, addr: u32) -> Result<MemoryResult, AccessError> {
        if !self.dma_allowed() {
            return Ok(Err(BusError::Blocked));
        }
        let res = self.file.dma_read(addr & ADDR_MASK);
        trace!("local: rdmem {addr:06o} -> {res:?}");
        Ok(res)
    }

    fn write_memory(&mut self, addr: u32, data: u16) -> Result<MemoryResult, AccessError> {
        if !self.dma_allowed() {
            return Ok(Err(BusError::Blocked));
        }
        let res = self.file.dma_write(addr & ADDR_MASK, data).map(|()| data);
        trace!("local: wrmem {addr:06o} {data:06o} -> {res:?}");
        Ok(res)
    }

    fn find_pin(&mut self, name: &str) -> Result<PinIndex, AccessError> {
        let Some(index) = pins::find(name) else {
            return Err(AccessError::UnknownPin(name.to_string()));
        };
        self.max_pin = self.max_pin.max(Some(index));
        Ok(PinIndex(index as u16))
    }

    fn get_pin(&mut self, pin: PinIndex) -> Result<u32, AccessError> {
        let def = self.pin_def(pin)?;
        Ok(field(self.file.read_reg(def.dev, def.reg), def.mask))
    }

    fn set_pin(&mut self, pin: PinIndex, val: u32) -> Result<bool, AccessError> {
        let def = self.pin_def(pin)?;
        if !def.writable {
            warn!("local: pin {} is read-only", def.name);
            return Ok(false);
        }
        let old = self.file.read_reg(def.dev, def.reg);
        self.file.write_reg(def.dev, def.reg, insert_field(old, def.mask, val));
        trace!("local: pin {} <- {val} (lobit {:#x})", def.name, lobit(def.mask));
        Ok(true)
    }

    fn drive_status(&mut self, class: DeviceClass, drive: u8) -> Result<DriveStatus, AccessError> {
        check_drive(class, drive)?;
        Ok(self.status_word(class, drive))
    }

    fn drive_file(&mut self, class: DeviceClass, drive: u8) -> Result<String, AccessError> {
        check_drive(class, drive)?;
        Ok(self.file.ms_drive(class, drive).filename)
    }

    fn load_drive(
        &mut self,
        class: DeviceClass,
        drive: u8,
        write_protected: bool,
        file: Option<&str>,
    ) -> Result<Option<String>, AccessError> {
        check_drive(class, drive)?;
        match self.file.ms_load(class, drive, write_protected, file) {
            Ok(()) => Ok(None),
            Err(e) => Ok(Some(e.to_string())),
        }
    }
}

fn run_state_of(ky2: u32) -> RunState {
    if ky2 & KY2_HALTED == 0 {
        RunState::Running
    } else if ky2 & KY2_HALTINS != 0 {
        RunState::HaltedNeedsReset
    } else {
        RunState::HaltedResumable
    }
}
