use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use common::mem::{ReadLe, WriteLe};
use common::regs::memory_result_from_code;
use common::{DeviceClass, DriveStatus, MemoryResult, RegisterSnapshot};

use crate::protocol::{self, Command, LOAD_HAS_FILE, LOAD_WRPROT, PIN_NOT_FOUND};
use crate::register_access::{check_drive, AccessError, PinIndex, RegisterAccess};

use log::{info, trace};

// Client end of the command protocol. Every request is flushed before its
// reply is awaited, so replies arrive in request order.
pub struct RemoteAccess<R: Read, W: Write> {
    reader: R,
    writer: W,
}

pub type TcpRemoteAccess = RemoteAccess<BufReader<TcpStream>, BufWriter<TcpStream>>;

impl RemoteAccess<BufReader<TcpStream>, BufWriter<TcpStream>> {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        info!("RemoteAccess: connected to {}", stream.peer_addr()?);
        let reader = BufReader::new(stream.try_clone()?);
        Ok(RemoteAccess::new(reader, BufWriter::new(stream)))
    }
}

impl<R: Read, W: Write> RemoteAccess<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        RemoteAccess { reader, writer }
    }

    // Strings carry a 2-byte length. Checked before the command byte is
    // buffered so a refused request leaves nothing half-written.
    fn check_string(val: &str) -> Result<(), AccessError> {
        if u16::try_from(val.len()).is_err() {
            let msg = format!("{} byte string too long for wire", val.len());
            return Err(io::Error::new(io::ErrorKind::InvalidInput, msg).into());
        }
        Ok(())
    }

    fn send(&mut self, cmd: Command) -> Result<(), AccessError> {
        trace!("RemoteAccess: {cmd:?}");
        self.writer.write_u8(cmd as u8)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AccessError> {
        self.writer.flush()?;
        Ok(())
    }

    fn simple(&mut self, cmd: Command) -> Result<(), AccessError> {
        self.send(cmd)?;
        self.flush()
    }

    fn memory_reply(&mut self) -> Result<MemoryResult, AccessError> {
        let code = self.reader.read_i32()?;
        memory_result_from_code(code).ok_or_else(|| AccessError::BadReply(format!("memory result {code}")))
    }
}

impl<R: Read, W: Write> RegisterAccess for RemoteAccess<R, W> {
    fn step(&mut self) -> Result<(), AccessError> {
        self.simple(Command::Step)
    }

    fn halt(&mut self) -> Result<(), AccessError> {
        self.simple(Command::Halt)
    }

    fn cont(&mut self) -> Result<(), AccessError> {
        self.simple(Command::Cont)
    }

    fn reset(&mut self) -> Result<(), AccessError> {
        self.simple(Command::Reset)
    }

    fn sample(&mut self) -> Result<RegisterSnapshot, AccessError> {
        self.simple(Command::Sample)?;
        Ok(protocol::read_sample(&mut self.reader)?)
    }

    // The server polls on its side, saving a round trip per poll.
    fn check_halted(&mut self) -> Result<bool, AccessError> {
        self.simple(Command::ChkHlt)?;
        match self.reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(AccessError::BadReply(format!("check halted {v}"))),
        }
    }

    fn set_switch_register(&mut self, val: u32) -> Result<(), AccessError> {
        self.send(Command::SetSr)?;
        self.writer.write_u24(val)?;
        self.flush()
    }

    fn read_memory(&mut self, addr: u32) -> Result<MemoryResult, AccessError> {
        self.send(Command::RdMem)?;
        self.writer.write_u24(addr)?;
        self.flush()?;
        self.memory_reply()
    }

    fn write_memory(&mut self, addr: u32, data: u16) -> Result<MemoryResult, AccessError> {
        self.send(Command::WrMem)?;
        self.writer.write_u24(addr)?;
        self.writer.write_u16(data)?;
        self.flush()?;
        self.memory_reply()
    }

    fn find_pin(&mut self, name: &str) -> Result<PinIndex, AccessError> {
        Self::check_string(name)?;
        self.send(Command::PinFind)?;
        self.writer.write_string(name)?;
        self.flush()?;
        match self.reader.read_i16()? {
            PIN_NOT_FOUND => Err(AccessError::UnknownPin(name.to_string())),
            i if i < 0 => Err(AccessError::BadReply(format!("pin index {i}"))),
            i => Ok(PinIndex(i as u16)),
        }
    }

    fn get_pin(&mut self, pin: PinIndex) -> Result<u32, AccessError> {
        self.send(Command::PinGet)?;
        self.writer.write_u16(pin.0)?;
        self.flush()?;
        Ok(self.reader.read_u32()?)
    }

    fn set_pin(&mut self, pin: PinIndex, val: u32) -> Result<bool, AccessError> {
        self.send(Command::PinSet)?;
        self.writer.write_u16(pin.0)?;
        self.writer.write_u32(val)?;
        self.flush()?;
        Ok(self.reader.read_u8()? != 0)
    }

    fn drive_status(&mut self, class: DeviceClass, drive: u8) -> Result<DriveStatus, AccessError> {
        check_drive(class, drive)?;
        self.send(Command::MsStat)?;
        protocol::write_drive(&mut self.writer, class, drive)?;
        self.flush()?;
        let word = self.reader.read_u32()?;
        let position = self.reader.read_u32()?;
        Ok(DriveStatus { word, position })
    }

    fn drive_file(&mut self, class: DeviceClass, drive: u8) -> Result<String, AccessError> {
        check_drive(class, drive)?;
        self.send(Command::MsFile)?;
        protocol::write_drive(&mut self.writer, class, drive)?;
        self.flush()?;
        Ok(self.reader.read_string()?)
    }

    fn load_drive(
        &mut self,
        class: DeviceClass,
        drive: u8,
        write_protected: bool,
        file: Option<&str>,
    ) -> Result<Option<String>, AccessError> {
        check_drive(class, drive)?;
        if let Some(name) = file {
            Self::check_string(name)?;
        }
        self.send(Command::MsLoad)?;
        protocol::write_drive(&mut self.writer, class, drive)?;
        let mut flags = 0;
        if write_protected {
            flags |= LOAD_WRPROT;
        }
        if file.is_some() {
            flags |= LOAD_HAS_FILE;
        }
        self.writer.write_u8(flags)?;
        if let Some(name) = file {
            self.writer.write_string(name)?;
        }
        self.flush()?;
        let msg = self.reader.read_string()?;
        Ok(if msg.is_empty() { None } else { Some(msg) })
    }
}
