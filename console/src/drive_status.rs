use std::time::{Duration, Instant};

use access_lib::{AccessError, RegisterAccess};
use common::{DecodedStatus, DeviceClass, DriveStatus};

use log::{debug, trace};

// Not-ready is stretched at least this long so a seek blinks the light.
pub const READY_HOLD: Duration = Duration::from_millis(20);

// How long a load error stays up before the filename comes back.
pub const ERROR_COOLDOWN: Duration = Duration::from_secs(5);

// Debounced view of one drive.
#[derive(Debug)]
pub struct DriveTracker {
    class: DeviceClass,
    drive: u8,
    status: Option<DecodedStatus>,
    last_position: Option<u32>,
    ready_deadline: Option<Instant>,
    ready_shown: bool,
    last_fnseq: Option<u32>,
    cooldown: Option<Instant>, // Label holds an error until then
    label: String,
}

impl DriveTracker {
    pub fn new(class: DeviceClass, drive: u8) -> Self {
        DriveTracker {
            class,
            drive,
            status: None,
            last_position: None,
            ready_deadline: None,
            ready_shown: false,
            last_fnseq: None,
            cooldown: None,
            label: String::new(),
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn drive(&self) -> u8 {
        self.drive
    }

    pub fn status(&self) -> Option<&DecodedStatus> {
        self.status.as_ref()
    }

    pub fn ready(&self) -> bool {
        self.ready_shown
    }

    // Filename, or the error being shown.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown.is_some()
    }

    // Takes one status sample. Returns whether the label should be refreshed
    // from the drive's filename.
    pub fn observe(&mut self, raw: DriveStatus, now: Instant) -> bool {
        let mut st = raw.decode(self.class);

        if st.position != self.last_position {
            trace!("{}{}: position {:?} -> {:?}", self.class, self.drive, self.last_position, st.position);
            self.last_position = st.position;
            st.ready = false;
        }
        if !st.ready {
            self.ready_deadline = Some(now + READY_HOLD);
        }
        self.ready_shown = self.ready_deadline.is_none_or(|deadline| now >= deadline);

        let refresh = match self.cooldown {
            None => self.last_fnseq != Some(st.fnseq),
            Some(until) => now > until,
        };
        if refresh {
            self.cooldown = None;
            self.last_fnseq = Some(st.fnseq);
        }

        self.status = Some(st);
        refresh
    }

    pub fn set_label(&mut self, label: String) {
        self.label = label;
    }

    // Shows msg in place of the filename for ERROR_COOLDOWN.
    pub fn show_error(&mut self, msg: String, now: Instant) {
        debug!("{}{}: {msg}", self.class, self.drive);
        self.label = msg;
        self.cooldown = Some(now + ERROR_COOLDOWN);
    }

    pub fn update<A: RegisterAccess + ?Sized>(&mut self, acc: &mut A, now: Instant) -> Result<(), AccessError> {
        let raw = acc.drive_status(self.class, self.drive)?;
        if self.observe(raw, now) {
            self.label = acc.drive_file(self.class, self.drive)?;
        }
        Ok(())
    }
}
