use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use access_lib::backplane::Backplane;
use access_lib::{AccessError, CommandServer, LocalAccess, PinIndex, RegisterAccess, TcpRemoteAccess};
use common::{DeviceClass, DriveStatus, MemoryResult, RegisterSnapshot};

pub const TEST_MEM_BYTES: u32 = 0o20000;

// Serves bp on a loopback port for `conns` connections, one after another.
// Joining gives the server back so the backplane can be inspected.
pub fn spawn_server(bp: Backplane, conns: usize) -> (SocketAddr, JoinHandle<CommandServer<Backplane>>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut server = CommandServer::new(LocalAccess::new(bp));
        for _ in 0..conns {
            server.accept_one(&listener).unwrap();
        }
        server
    });
    (addr, handle)
}

pub fn connect(addr: SocketAddr) -> TcpRemoteAccess {
    TcpRemoteAccess::connect(addr).unwrap()
}

// Records which operations reach the access path.
pub struct Recording<A: RegisterAccess> {
    pub inner: A,
    pub calls: Vec<&'static str>,
    // Runs against the inner access after each step, standing in for the
    // instruction the step executed.
    pub on_step: Option<fn(&mut A)>,
}

impl<A: RegisterAccess> Recording<A> {
    pub fn new(inner: A) -> Self {
        Recording { inner, calls: Vec::new(), on_step: None }
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| **c == name).count()
    }
}

impl<A: RegisterAccess> RegisterAccess for Recording<A> {
    fn step(&mut self) -> Result<(), AccessError> {
        self.calls.push("step");
        self.inner.step()?;
        if let Some(f) = self.on_step {
            f(&mut self.inner);
        }
        Ok(())
    }

    fn halt(&mut self) -> Result<(), AccessError> {
        self.calls.push("halt");
        self.inner.halt()
    }

    fn cont(&mut self) -> Result<(), AccessError> {
        self.calls.push("cont");
        self.inner.cont()
    }

    fn reset(&mut self) -> Result<(), AccessError> {
        self.calls.push("reset");
        self.inner.reset()
    }

    fn sample(&mut self) -> Result<RegisterSnapshot, AccessError> {
        self.calls.push("sample");
        self.inner.sample()
    }

    fn set_switch_register(&mut self, val: u32) -> Result<(), AccessError> {
        self.calls.push("set_switch_register");
        self.inner.set_switch_register(val)
    }

    fn read_memory(&mut self, addr: u32) -> Result<MemoryResult, AccessError> {
        self.calls.push("read_memory");
        self.inner.read_memory(addr)
    }

    fn write_memory(&mut self, addr: u32, data: u16) -> Result<MemoryResult, AccessError> {
        self.calls.push("write_memory");
        self.inner.write_memory(addr, data)
    }

    fn find_pin(&mut self, name: &str) -> Result<PinIndex, AccessError> {
        self.inner.find_pin(name)
    }

    fn get_pin(&mut self, pin: PinIndex) -> Result<u32, AccessError> {
        self.inner.get_pin(pin)
    }

    fn set_pin(&mut self, pin: PinIndex, val: u32) -> Result<bool, AccessError> {
        self.calls.push("set_pin");
        self.inner.set_pin(pin, val)
    }

    fn drive_status(&mut self, class: DeviceClass, drive: u8) -> Result<DriveStatus, AccessError> {
        self.inner.drive_status(class, drive)
    }

    fn drive_file(&mut self, class: DeviceClass, drive: u8) -> Result<String, AccessError> {
        self.inner.drive_file(class, drive)
    }

    fn load_drive(
        &mut self,
        class: DeviceClass,
        drive: u8,
        write_protected: bool,
        file: Option<&str>,
    ) -> Result<Option<String>, AccessError> {
        self.calls.push("load_drive");
        self.inner.load_drive(class, drive, write_protected, file)
    }
}
