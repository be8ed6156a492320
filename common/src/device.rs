use std::fmt;

use crate::misc::field;

// Mass storage controllers, identified on the wire by their two-letter controller id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Rl, // RL11 with RL01/RL02 disks
    Tm, // TM11 with TU10 tapes
}

impl DeviceClass {
    pub const RL_ID: u16 = ((b'R' as u16) << 8) | b'L' as u16;
    pub const TM_ID: u16 = ((b'T' as u16) << 8) | b'M' as u16;

    pub fn ctlid(self) -> u16 {
        match self {
            DeviceClass::Rl => Self::RL_ID,
            DeviceClass::Tm => Self::TM_ID,
        }
    }

    pub fn from_ctlid(id: u16) -> Option<Self> {
        match id {
            Self::RL_ID => Some(DeviceClass::Rl),
            Self::TM_ID => Some(DeviceClass::Tm),
            _ => None,
        }
    }

    pub fn num_drives(self) -> u8 {
        match self {
            DeviceClass::Rl => 4,
            DeviceClass::Tm => 8,
        }
    }

    pub fn layout(self) -> &'static StatusLayout {
        match self {
            DeviceClass::Rl => &StatusLayout::RL,
            DeviceClass::Tm => &StatusLayout::TM,
        }
    }

    // Name of the pin that plugs the controller into the bus.
    pub fn enable_pin(self) -> &'static str {
        match self {
            DeviceClass::Rl => "rl_enable",
            DeviceClass::Tm => "tm_enable",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Rl => f.write_str("RL"),
            DeviceClass::Tm => f.write_str("TM"),
        }
    }
}

impl std::str::FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rl" => Ok(DeviceClass::Rl),
            "tm" => Ok(DeviceClass::Tm),
            _ => Err(format!("unknown device class {s}")),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

// Where each field lives in a controller's status word. A mask of zero means
// the controller doesn't report that field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLayout {
    pub load: u32,
    pub wrprot: u32,
    pub ready: u32,
    pub fault: u32,
    pub fnseq: u32,
    pub cylno: u32, // Zero: position comes from the separate position word
    pub media: u32, // RL01 vs RL02
}

impl StatusLayout {
    pub const RL: StatusLayout = StatusLayout {
        load: 0o000000001,
        wrprot: 0o000000002,
        ready: 0o000000004,
        fault: 0o000000010,
        fnseq: 0o000007760,
        cylno: 0o007770000,
        media: 0o010000000,
    };

    pub const TM: StatusLayout = StatusLayout {
        load: 0o000000001,
        wrprot: 0o000000002,
        ready: 0o000000004,
        fault: 0,
        fnseq: 0o000007760,
        cylno: 0,
        media: 0,
    };

    fn flag(word: u32, mask: u32) -> bool {
        mask != 0 && word & mask != 0
    }
}

// Raw status as the controller reports it, plus the tape byte position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStatus {
    pub word: u32,
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedStatus {
    pub loaded: bool,
    pub write_protected: bool,
    pub ready: bool,
    pub fault: bool,
    pub fnseq: u32,
    pub position: Option<u32>, // None when nothing is loaded
    pub media_tag: bool,
}

impl DriveStatus {
    pub fn decode(&self, class: DeviceClass) -> DecodedStatus {
        let layout = class.layout();
        let loaded = StatusLayout::flag(self.word, layout.load);
        let position = if !loaded {
            None
        } else if layout.cylno != 0 {
            Some(field(self.word, layout.cylno))
        } else {
            Some(self.position)
        };

        DecodedStatus {
            loaded,
            write_protected: StatusLayout::flag(self.word, layout.wrprot),
            ready: StatusLayout::flag(self.word, layout.ready),
            fault: StatusLayout::flag(self.word, layout.fault),
            fnseq: field(self.word, layout.fnseq),
            position,
            media_tag: StatusLayout::flag(self.word, layout.media),
        }
    }
}
