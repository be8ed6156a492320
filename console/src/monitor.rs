use std::io::{self, Write};

use common::{RegisterSnapshot, RunState};

use crate::drive_status::DriveTracker;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

fn run_light(state: RunState) -> (&'static str, Color) {
    match state {
        RunState::Running => ("RUN", Color::Green),
        RunState::HaltedResumable => ("HALT", Color::Yellow),
        RunState::HaltedNeedsReset => ("HALT*", Color::Red),
    }
}

// Redraws the current terminal line with the console lights.
pub fn render_status<W: Write>(out: &mut W, snap: &RegisterSnapshot, message: &str) -> io::Result<()> {
    let (light, color) = run_light(snap.run_state);
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(color),
        Print(format!("{light:<5}")),
        ResetColor,
        Print(format!(
            " ADDR {:06o} DATA {:06o} LIGHTS {:06o} SR {:06o}  {message}",
            snap.addr, snap.data, snap.light_reg, snap.switch_reg
        )),
    )?;
    out.flush()
}

pub fn format_snapshot(snap: &RegisterSnapshot) -> String {
    format!(
        "{} addr {:06o} data {:06o} lights {:06o} sr {:06o}",
        snap.run_state, snap.addr, snap.data, snap.light_reg, snap.switch_reg
    )
}

// One line per drive: lights, position and label.
pub fn format_drive(tracker: &DriveTracker) -> String {
    let name = format!("{}{}", tracker.class(), tracker.drive());
    let Some(st) = tracker.status() else {
        return format!("{name}: no status");
    };
    let lamp = |on: bool, label: &'static str| if on { label } else { "-" };
    let mut line = format!(
        "{name}: {} {} {} {}",
        lamp(st.loaded, "LOAD"),
        lamp(tracker.ready(), "RDY"),
        lamp(st.fault, "FAULT"),
        lamp(st.write_protected, "WRPRT"),
    );
    if let Some(posn) = st.position {
        line.push_str(&format!(" @{posn}"));
    }
    if st.media_tag {
        line.push_str(" RL01");
    }
    if !tracker.label().is_empty() {
        line.push_str(&format!(" {}", tracker.label()));
    }
    line
}
