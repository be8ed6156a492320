use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use access_lib::RegisterAccess;
use common::DeviceClass;

use crate::console::{Console, POLL_INTERVAL};
use crate::error::ConsoleError;
use crate::monitor;

use log::debug;
use thiserror::Error;

// One line of a console script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Sample,
    Poll,
    Step,
    Halt,
    Cont,
    Reset,
    Start,
    SwitchRegister(u32),
    LoadAddress { virt: bool },
    Examine,
    Deposit,
    Load { class: DeviceClass, drive: u8, file: String },
    Unload { class: DeviceClass, drive: u8 },
    WriteProtect { class: DeviceClass, drive: u8, on: bool },
    Pin { name: String, value: Option<u32> },
    Drives,
    Monitor { ticks: u32 },
    Sleep(Duration),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command {cmd:?}")]
    UnknownCommand { line: usize, cmd: String },

    #[error("line {line}: {cmd}: {msg}")]
    BadArgs { line: usize, cmd: String, msg: String },

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn octal(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 8).map_err(|_| format!("bad octal number {s:?}"))
}

fn decimal(s: &str) -> Result<u32, String> {
    s.parse().map_err(|_| format!("bad number {s:?}"))
}

fn drive_args<'a>(args: &mut impl Iterator<Item = &'a str>) -> Result<(DeviceClass, u8), String> {
    let class = args.next().ok_or("missing device class")?.parse::<DeviceClass>()?;
    let drive = decimal(args.next().ok_or("missing drive number")?)?;
    let drive = u8::try_from(drive).map_err(|_| format!("bad drive {drive}"))?;
    Ok((class, drive))
}

// Parses one line. Blank lines and # comments give None.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let line = line.split('#').next().unwrap_or("").trim();
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let bad = |msg: String| ScriptError::BadArgs { line: line_no, cmd: cmd.to_string(), msg };

    let parsed = match cmd.to_ascii_lowercase().as_str() {
        "sample" => ScriptCommand::Sample,
        "poll" => ScriptCommand::Poll,
        "step" => ScriptCommand::Step,
        "halt" => ScriptCommand::Halt,
        "cont" => ScriptCommand::Cont,
        "reset" => ScriptCommand::Reset,
        "start" => ScriptCommand::Start,
        "sr" => {
            let val = words.next().ok_or_else(|| bad("missing value".to_string()))?;
            ScriptCommand::SwitchRegister(octal(val).map_err(bad)?)
        }
        "ldad" => {
            let virt = match words.next() {
                None => false,
                Some("v" | "virt") => true,
                Some(other) => return Err(bad(format!("expected virt, got {other:?}"))),
            };
            ScriptCommand::LoadAddress { virt }
        }
        "exam" => ScriptCommand::Examine,
        "dep" => ScriptCommand::Deposit,
        "load" => {
            let (class, drive) = drive_args(&mut words).map_err(bad)?;
            let file = words.next().ok_or_else(|| bad("missing file".to_string()))?;
            ScriptCommand::Load { class, drive, file: file.to_string() }
        }
        "unload" => {
            let (class, drive) = drive_args(&mut words).map_err(bad)?;
            ScriptCommand::Unload { class, drive }
        }
        "wrprt" => {
            let (class, drive) = drive_args(&mut words).map_err(bad)?;
            let on = match words.next() {
                None | Some("on") => true,
                Some("off") => false,
                Some(other) => return Err(bad(format!("expected on or off, got {other:?}"))),
            };
            ScriptCommand::WriteProtect { class, drive, on }
        }
        "pin" => {
            let name = words.next().ok_or_else(|| bad("missing pin name".to_string()))?;
            let value = words.next().map(decimal).transpose().map_err(bad)?;
            ScriptCommand::Pin { name: name.to_string(), value }
        }
        "drives" => ScriptCommand::Drives,
        "monitor" => {
            let ticks = words.next().map(decimal).transpose().map_err(bad)?.unwrap_or(100);
            ScriptCommand::Monitor { ticks }
        }
        "sleep" => {
            let ms = words.next().ok_or_else(|| bad("missing milliseconds".to_string()))?;
            ScriptCommand::Sleep(Duration::from_millis(decimal(ms).map_err(bad)? as u64))
        }
        _ => return Err(ScriptError::UnknownCommand { line: line_no, cmd: cmd.to_string() }),
    };

    if let Some(extra) = words.next() {
        return Err(bad(format!("unexpected {extra:?}")));
    }
    Ok(Some(parsed))
}

pub fn parse(text: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut cmds = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(cmd) = parse_line(i + 1, line)? {
            cmds.push(cmd);
        }
    }
    Ok(cmds)
}

// Runs one command, writing what it shows to out. A rejected command is
// reported and doesn't stop the script.
pub fn execute<A: RegisterAccess, W: Write>(
    con: &mut Console<A>,
    cmd: &ScriptCommand,
    out: &mut W,
) -> Result<(), ScriptError> {
    debug!("script: {cmd:?}");
    let res = match cmd {
        ScriptCommand::Sample => {
            con.poll(Instant::now())?;
            if let Some(snap) = con.last_sample() {
                writeln!(out, "{}", monitor::format_snapshot(snap))?;
            }
            return Ok(());
        }
        ScriptCommand::Poll => {
            con.poll(Instant::now())?;
            return Ok(());
        }
        ScriptCommand::Step => con.step().map(drop),
        ScriptCommand::Halt => con.halt().map(drop),
        ScriptCommand::Cont => con.cont(),
        ScriptCommand::Reset => con.reset().map(drop),
        ScriptCommand::Start => con.start().map(drop),
        ScriptCommand::SwitchRegister(val) => {
            con.set_switch_register(*val)?;
            return Ok(());
        }
        ScriptCommand::LoadAddress { virt } => con.load_address(*virt).map(drop),
        ScriptCommand::Examine => con.examine().map(drop),
        ScriptCommand::Deposit => con.deposit().map(drop),
        ScriptCommand::Load { class, drive, file } => con.load_drive(*class, *drive, file, Instant::now()).map(drop),
        ScriptCommand::Unload { class, drive } => con.unload_drive(*class, *drive, Instant::now()).map(drop),
        ScriptCommand::WriteProtect { class, drive, on } => con.write_protect(*class, *drive, *on).map(drop),
        ScriptCommand::Pin { name, value: None } => {
            let val = con.pin_value(name)?;
            writeln!(out, "{name} = {val}")?;
            return Ok(());
        }
        ScriptCommand::Pin { name, value: Some(val) } => {
            if !con.set_pin_value(name, *val)? {
                writeln!(out, "{}", con.message())?;
            }
            return Ok(());
        }
        ScriptCommand::Drives => {
            con.poll(Instant::now())?;
            for class in [DeviceClass::Rl, DeviceClass::Tm] {
                for tracker in con.drives(class) {
                    if tracker.status().is_some() {
                        writeln!(out, "{}", monitor::format_drive(tracker))?;
                    }
                }
            }
            return Ok(());
        }
        ScriptCommand::Monitor { ticks } => {
            for _ in 0..*ticks {
                con.poll(Instant::now())?;
                if let Some(snap) = con.last_sample().copied() {
                    monitor::render_status(out, &snap, con.message())?;
                }
                thread::sleep(POLL_INTERVAL);
            }
            writeln!(out)?;
            return Ok(());
        }
        ScriptCommand::Sleep(dur) => {
            thread::sleep(*dur);
            return Ok(());
        }
    };

    match res {
        Ok(()) => {
            if !con.message().is_empty() {
                writeln!(out, "{}", con.message())?;
            }
            Ok(())
        }
        Err(e @ ConsoleError::NotPermitted { .. }) => {
            writeln!(out, "{e}")?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn run<A: RegisterAccess, W: Write>(con: &mut Console<A>, text: &str, out: &mut W) -> Result<(), ScriptError> {
    let cmds = parse(text)?;
    con.poll(Instant::now())?;
    for cmd in &cmds {
        execute(con, cmd, out)?;
    }
    Ok(())
}
