use std::collections::HashMap;
use std::fmt::Write;
use std::time::{Duration, Instant};

use access_lib::register_access::check_drive;
use access_lib::{PinIndex, RegisterAccess};
use common::constants::{ADDR_MASK, DATA_MASK, PC, PSW, R0, START_PS, SWITCH_REG};
use common::{DeviceClass, RegisterSnapshot, RunState};

use crate::drive_status::DriveTracker;
use crate::error::{ConsoleError, Operation};
use crate::exam_dep::{ExDepKind, ExDepOutcome, ExamDep, LoadedAddress};
use crate::mmu::{self, MmuError};
use crate::run_state::{RunStateMachine, Transition};

use log::{debug, info, warn};

// Pins the console looks at, resolved once at startup.
pub const CONSOLE_PINS: &[&str] = &[
    "fpgamode",
    "bm_enablo",
    "bm_enabhi",
    "dl_enable",
    "dz_enable",
    "kw_enable",
    "kw_fiftyhz",
    "ky_enable",
    "pc_enable",
    "rl_enable",
    "tm_enable",
];

const PSW_MODE: u16 = 0o140000;

// How often a front end should call poll().
pub const POLL_INTERVAL: Duration = Duration::from_millis(23);

// Which kind of address the address lights show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrLabel {
    Virt,
    Phys,
}

// One console session. Owns the access path and all state derived from it;
// commands and polls both take &mut self so they never overlap.
pub struct Console<A: RegisterAccess> {
    access: A,
    run: RunStateMachine,
    exam_dep: ExamDep,
    pins: HashMap<&'static str, PinIndex>,
    rl_drives: Vec<DriveTracker>,
    tm_drives: Vec<DriveTracker>,
    last_sample: Option<RegisterSnapshot>,
    addr_label: Option<AddrLabel>, // Cached, dropped whenever the processor starts
    message: String,
}

impl<A: RegisterAccess> Console<A> {
    // Fails if any console pin is unknown to the access path.
    pub fn new(mut access: A) -> Result<Self, ConsoleError> {
        let mut pins = HashMap::new();
        for name in CONSOLE_PINS {
            pins.insert(*name, access.find_pin(name)?);
        }

        // The switches start out as whatever the switch register reads.
        match access.read_memory(SWITCH_REG)? {
            Ok(sr) => access.set_switch_register(sr as u32)?,
            Err(e) => warn!("console: can't read switch register: {e}"),
        }

        let trackers = |class: DeviceClass| -> Vec<DriveTracker> {
            (0..class.num_drives()).map(|d| DriveTracker::new(class, d)).collect()
        };
        Ok(Console {
            access,
            run: RunStateMachine::new(),
            exam_dep: ExamDep::new(),
            pins,
            rl_drives: trackers(DeviceClass::Rl),
            tm_drives: trackers(DeviceClass::Tm),
            last_sample: None,
            addr_label: None,
            message: String::new(),
        })
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut A {
        &mut self.access
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn run_state(&self) -> Option<RunState> {
        self.run.state()
    }

    pub fn last_sample(&self) -> Option<&RegisterSnapshot> {
        self.last_sample.as_ref()
    }

    pub fn loaded(&self) -> LoadedAddress {
        self.exam_dep.loaded()
    }

    pub fn auto_increment(&self, kind: ExDepKind) -> bool {
        self.exam_dep.auto_increment(kind)
    }

    pub fn drives(&self, class: DeviceClass) -> &[DriveTracker] {
        match class {
            DeviceClass::Rl => &self.rl_drives,
            DeviceClass::Tm => &self.tm_drives,
        }
    }

    fn tracker_mut(&mut self, class: DeviceClass, drive: u8) -> &mut DriveTracker {
        match class {
            DeviceClass::Rl => &mut self.rl_drives[drive as usize],
            DeviceClass::Tm => &mut self.tm_drives[drive as usize],
        }
    }

    pub fn addr_label(&mut self) -> AddrLabel {
        let loaded = self.exam_dep.loaded();
        let halted = self.run.state().is_some_and(RunState::is_halted);
        *self.addr_label.get_or_insert(if loaded.virt && halted { AddrLabel::Virt } else { AddrLabel::Phys })
    }

    fn set_message(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
        debug!("console: {}", self.message);
    }

    ////////////////////////////////////////////////////////////////////////////////

    // One display tick.
    pub fn poll(&mut self, now: Instant) -> Result<(), ConsoleError> {
        let snap = self.access.sample()?;
        self.last_sample = Some(snap);
        let trans = self.run.observe(snap.run_state);
        self.on_transition(trans)?;

        for class in [DeviceClass::Rl, DeviceClass::Tm] {
            if self.pin_value(class.enable_pin())? == 0 {
                continue;
            }
            let access = &mut self.access;
            let trackers = match class {
                DeviceClass::Rl => &mut self.rl_drives,
                DeviceClass::Tm => &mut self.tm_drives,
            };
            for tracker in trackers.iter_mut() {
                tracker.update(access, now)?;
            }
        }
        Ok(())
    }

    fn on_transition(&mut self, trans: Transition) -> Result<(), ConsoleError> {
        match trans {
            Transition::Started | Transition::Unexpected { to: RunState::Running, .. } => {
                self.exam_dep.clear_increments();
                self.addr_label = None;
            }
            Transition::Stopped | Transition::HaltInstruction => self.report_stop()?,
            _ => {}
        }
        Ok(())
    }

    // Shows where the processor stopped and loads PC as a virtual address.
    fn report_stop(&mut self) -> Result<(), ConsoleError> {
        let r0 = self.access.read_memory(R0)?;
        let pc = self.access.read_memory(PC)?;
        let ps = self.access.read_memory(PSW)?;

        let mut msg = String::new();
        match pc {
            Ok(pc) => {
                let _ = write!(msg, "stopped at PC {pc:06o}");
                let mode = ps.ok().map(|ps| ((ps & PSW_MODE) >> 14) as u8);
                match mmu::translate(&mut self.access, pc as u32, mode) {
                    Ok(pa) if pa != pc as u32 => {
                        let _ = write!(msg, " (pa {pa:06o})");
                    }
                    Ok(_) => {}
                    Err(MmuError::Translation(e)) => {
                        let _ = write!(msg, ", {e}");
                    }
                    Err(MmuError::Access(e)) => return Err(e.into()),
                }
                let mut value = pc as u32;
                if let Ok(ps) = ps {
                    value |= ((ps & PSW_MODE) as u32) << 2;
                }
                self.exam_dep.set_loaded(LoadedAddress { value, virt: true });
                self.addr_label = None;
            }
            Err(_) => msg.push_str("stopped at PC unknown"),
        }
        match ps {
            Ok(ps) => {
                let _ = write!(msg, ", PS {ps:06o}");
            }
            Err(_) => msg.push_str(", PS unknown"),
        }
        match r0 {
            Ok(r0) => {
                let _ = write!(msg, ", R0 {r0:06o}");
            }
            Err(_) => msg.push_str(", R0 unknown"),
        }
        info!("console: {msg}");
        self.set_message(msg);
        Ok(())
    }

    fn wait_halt(&mut self) -> Result<bool, ConsoleError> {
        if self.access.check_halted()? {
            return Ok(true);
        }
        warn!("console: processor failed to halt");
        self.set_message("processor failed to halt");
        Ok(false)
    }

    // Brings the run state up to date after a control operation, so gating
    // never works from a state the request has already changed.
    fn resample(&mut self) -> Result<Transition, ConsoleError> {
        let state = self.access.run_state()?;
        let trans = self.run.observe(state);
        self.on_transition(trans)?;
        Ok(trans)
    }

    ////////////////////////////////////////////////////////////////////////////////

    pub fn step(&mut self) -> Result<bool, ConsoleError> {
        self.run.check(Operation::Step)?;
        self.set_message("stepping processor");
        self.access.step()?;
        if !self.wait_halt()? {
            return Ok(false);
        }
        // A plain step stays halted, so there's no transition to report it.
        match self.resample()? {
            Transition::Stopped | Transition::HaltInstruction => {}
            _ => self.report_stop()?,
        }
        Ok(true)
    }

    pub fn halt(&mut self) -> Result<bool, ConsoleError> {
        self.run.check(Operation::Halt)?;
        self.set_message("halting processor");
        self.access.halt()?;
        if !self.wait_halt()? {
            return Ok(false);
        }
        self.resample()?;
        Ok(true)
    }

    pub fn cont(&mut self) -> Result<(), ConsoleError> {
        self.run.check(Operation::Cont)?;
        self.set_message("resuming processor");
        self.access.cont()?;
        self.resample()?;
        self.set_message("processor resumed");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<bool, ConsoleError> {
        self.run.check(Operation::Reset)?;
        self.set_message("resetting processor");
        self.access.reset()?;
        if !self.wait_halt()? {
            return Ok(false);
        }
        self.resample()?;
        self.set_message("processor reset complete");
        Ok(true)
    }

    // Reset, then run from the loaded address at priority 7.
    pub fn start(&mut self) -> Result<bool, ConsoleError> {
        self.run.check(Operation::Start)?;
        self.set_message("resetting processor");
        self.access.reset()?;
        if !self.wait_halt()? {
            return Ok(false);
        }
        self.resample()?;

        let start = self.exam_dep.loaded().value;
        self.set_message("writing PC and PS");
        if self.access.write_memory(PC, (start & DATA_MASK) as u16)?.is_err() {
            self.set_message("writing PC failed");
            return Ok(false);
        }
        if self.access.write_memory(PSW, START_PS)?.is_err() {
            self.set_message("writing PS failed");
            return Ok(false);
        }
        self.access.cont()?;
        self.resample()?;
        self.set_message(format!("starting at {start:06o}"));
        Ok(true)
    }

    pub fn set_switch_register(&mut self, val: u32) -> Result<(), ConsoleError> {
        self.access.set_switch_register(val & ADDR_MASK)?;
        Ok(())
    }

    pub fn switch_register(&mut self) -> Result<u32, ConsoleError> {
        Ok(self.access.sample()?.switch_reg)
    }

    // Loads the switch register into the address register. Virtual addresses
    // carry their mode in <17:16>.
    pub fn load_address(&mut self, virt: bool) -> Result<LoadedAddress, ConsoleError> {
        self.run.check(Operation::LoadAddress)?;
        let sr = self.switch_register()?;
        let loaded = self.exam_dep.load(sr, virt);
        self.addr_label = None;

        let kind = if virt { "virtual" } else { "physical" };
        let mut msg = format!("loaded {kind} address {:06o}", loaded.value);
        match loaded.resolve(&mut self.access)? {
            Ok(pa) if virt => {
                let _ = write!(msg, " (pa {pa:06o})");
            }
            Ok(_) => {}
            Err(e) => {
                let _ = write!(msg, ", {e}");
            }
        }
        self.set_message(msg);
        Ok(loaded)
    }

    pub fn examine(&mut self) -> Result<ExDepOutcome, ConsoleError> {
        self.run.check(Operation::Examine)?;
        let out = self.exam_dep.access(&mut self.access, ExDepKind::Examine, 0)?;
        self.set_message(out.to_string());
        Ok(out)
    }

    // Deposits the low 16 bits of the switch register.
    pub fn deposit(&mut self) -> Result<ExDepOutcome, ConsoleError> {
        self.run.check(Operation::Deposit)?;
        let data = (self.switch_register()? & DATA_MASK) as u16;
        let out = self.exam_dep.access(&mut self.access, ExDepKind::Deposit, data)?;
        self.set_message(out.to_string());
        Ok(out)
    }

    ////////////////////////////////////////////////////////////////////////////////

    fn pin_index(&mut self, name: &str) -> Result<PinIndex, ConsoleError> {
        if let Some(pin) = self.pins.get(name) {
            return Ok(*pin);
        }
        Ok(self.access.find_pin(name)?)
    }

    pub fn pin_value(&mut self, name: &str) -> Result<u32, ConsoleError> {
        let pin = self.pin_index(name)?;
        Ok(self.access.get_pin(pin)?)
    }

    // False if the pin is read-only.
    pub fn set_pin_value(&mut self, name: &str, val: u32) -> Result<bool, ConsoleError> {
        let pin = self.pin_index(name)?;
        let ok = self.access.set_pin(pin, val)?;
        if !ok {
            self.set_message(format!("pin {name} is read-only"));
        }
        Ok(ok)
    }

    // Loads file into a drive, keeping its write protection. Returns whether
    // it loaded; if not, the drive shows why for a while.
    pub fn load_drive(
        &mut self,
        class: DeviceClass,
        drive: u8,
        file: &str,
        now: Instant,
    ) -> Result<bool, ConsoleError> {
        check_drive(class, drive)?;
        let wrprot = self.access.drive_status(class, drive)?.decode(class).write_protected;
        match self.access.load_drive(class, drive, wrprot, Some(file))? {
            None => {
                self.set_message(format!("{class}{drive}: loaded {file}"));
                Ok(true)
            }
            Some(err) => {
                let msg = format!("error loading {file}: {err}");
                self.set_message(msg.clone());
                self.tracker_mut(class, drive).show_error(msg, now);
                Ok(false)
            }
        }
    }

    pub fn unload_drive(&mut self, class: DeviceClass, drive: u8, now: Instant) -> Result<bool, ConsoleError> {
        check_drive(class, drive)?;
        let wrprot = self.access.drive_status(class, drive)?.decode(class).write_protected;
        match self.access.load_drive(class, drive, wrprot, Some(""))? {
            None => {
                self.set_message(format!("{class}{drive}: unloaded"));
                Ok(true)
            }
            Some(err) => {
                let msg = format!("error unloading: {err}");
                self.set_message(msg.clone());
                self.tracker_mut(class, drive).show_error(msg, now);
                Ok(false)
            }
        }
    }

    pub fn write_protect(&mut self, class: DeviceClass, drive: u8, on: bool) -> Result<bool, ConsoleError> {
        check_drive(class, drive)?;
        match self.access.load_drive(class, drive, on, None)? {
            None => {
                let what = if on { "write protected" } else { "write enabled" };
                self.set_message(format!("{class}{drive}: {what}"));
                Ok(true)
            }
            Some(err) => {
                self.set_message(err);
                Ok(false)
            }
        }
    }
}
