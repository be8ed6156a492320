use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};

use common::mem::{ReadLe, WriteLe};
use common::regs::memory_result_to_code;

use crate::local::LocalAccess;
use crate::protocol::{self, Command, LOAD_HAS_FILE, LOAD_WRPROT, PIN_NOT_FOUND};
use crate::register_access::{AccessError, PinIndex, RegisterAccess};
use crate::register_file::RegisterFile;

use log::{error, info, trace};
use num_traits::FromPrimitive;

// Serves the register page to one client at a time. The page outlives
// connections, so a client that reconnects finds the machine as it left it.
pub struct CommandServer<F: RegisterFile> {
    access: LocalAccess<F>,
}

impl<F: RegisterFile> CommandServer<F> {
    pub fn new(access: LocalAccess<F>) -> Self {
        CommandServer { access }
    }

    pub fn access(&self) -> &LocalAccess<F> {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut LocalAccess<F> {
        &mut self.access
    }

    pub fn listen(&mut self, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        self.run(&listener)
    }

    // Accepts forever. Only a failing listener ends it.
    pub fn run(&mut self, listener: &TcpListener) -> io::Result<()> {
        info!("CommandServer: listening on {}", listener.local_addr()?);
        loop {
            self.accept_one(listener)?;
        }
    }

    pub fn accept_one(&mut self, listener: &TcpListener) -> io::Result<()> {
        let (stream, peer) = listener.accept()?;
        info!("CommandServer: connection from {peer}");
        match self.serve_stream(stream) {
            Ok(()) => info!("CommandServer: {peer} disconnected"),
            Err(e) if e.is_disconnect() => info!("CommandServer: {peer} dropped: {e}"),
            Err(e) => error!("CommandServer: closing {peer}: {e}"),
        }
        Ok(())
    }

    fn serve_stream(&mut self, stream: TcpStream) -> Result<(), AccessError> {
        stream.set_nodelay(true)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        self.serve(&mut reader, &mut writer)
    }

    // Runs commands until the client closes between two commands (Ok) or
    // something goes wrong on the connection (Err).
    pub fn serve<R: Read, W: Write>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), AccessError> {
        loop {
            let mut byte = [0u8; 1];
            match reader.read(&mut byte) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
            let Some(cmd) = Command::from_u8(byte[0]) else {
                return Err(AccessError::BadCommand(byte[0]));
            };
            trace!("CommandServer: {cmd:?}");
            self.execute(cmd, reader, writer)?;
            writer.flush()?;
        }
    }

    fn execute<R: Read, W: Write>(&mut self, cmd: Command, r: &mut R, w: &mut W) -> Result<(), AccessError> {
        let acc = &mut self.access;
        match cmd {
            Command::Step => acc.step()?,
            Command::Halt => acc.halt()?,
            Command::Cont => acc.cont()?,
            Command::Reset => acc.reset()?,
            Command::Sample => {
                let snap = acc.sample()?;
                protocol::write_sample(w, &snap)?;
            }
            Command::SetSr => {
                let val = r.read_u24()?;
                acc.set_switch_register(val)?;
            }
            Command::RdMem => {
                let addr = r.read_u24()?;
                let res = acc.read_memory(addr)?;
                w.write_i32(memory_result_to_code(res))?;
            }
            Command::WrMem => {
                let addr = r.read_u24()?;
                let data = r.read_u16()?;
                let res = acc.write_memory(addr, data)?;
                w.write_i32(memory_result_to_code(res))?;
            }
            Command::ChkHlt => {
                let halted = acc.check_halted()?;
                w.write_u8(halted as u8)?;
            }
            Command::PinFind => {
                let name = r.read_string()?;
                let index = match acc.find_pin(&name) {
                    Ok(pin) => pin.0 as i16,
                    Err(AccessError::UnknownPin(_)) => PIN_NOT_FOUND,
                    Err(e) => return Err(e),
                };
                w.write_i16(index)?;
            }
            Command::PinGet => {
                let pin = PinIndex(r.read_u16()?);
                let val = acc.get_pin(pin)?;
                w.write_u32(val)?;
            }
            Command::PinSet => {
                let pin = PinIndex(r.read_u16()?);
                let val = r.read_u32()?;
                let ok = acc.set_pin(pin, val)?;
                w.write_u8(ok as u8)?;
            }
            Command::MsStat => {
                let (class, drive) = protocol::read_drive(r)?;
                let status = acc.drive_status(class, drive)?;
                w.write_u32(status.word)?;
                w.write_u32(status.position)?;
            }
            Command::MsFile => {
                let (class, drive) = protocol::read_drive(r)?;
                let name = acc.drive_file(class, drive)?;
                w.write_string(&name)?;
            }
            Command::MsLoad => {
                let (class, drive) = protocol::read_drive(r)?;
                let flags = r.read_u8()?;
                let file = if flags & LOAD_HAS_FILE != 0 { Some(r.read_string()?) } else { None };
                let msg = acc.load_drive(class, drive, flags & LOAD_WRPROT != 0, file.as_deref())?;
                w.write_string(msg.as_deref().unwrap_or(""))?;
            }
        }
        Ok(())
    }
}
