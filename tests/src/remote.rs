use std::io::{Read, Write};
use std::net::TcpStream;

use access_lib::backplane::Backplane;
use access_lib::{AccessError, RegisterAccess};
use common::constants::{PC, SWITCH_REG};
use common::{BusError, DeviceClass, RunState};

use crate::harness::{connect, spawn_server, TEST_MEM_BYTES};

#[test]
fn sample_reports_halt_instruction() {
    let mut bp = Backplane::with_memory(TEST_MEM_BYTES);
    bp.halt_instruction();
    let (addr, server) = spawn_server(bp, 1);

    let mut remote = connect(addr);
    let snap = remote.sample().unwrap();
    assert_eq!(snap.run_state, RunState::HaltedNeedsReset);

    // Continue is ignored after a HALT instruction; only reset gets out.
    remote.cont().unwrap();
    assert_eq!(remote.run_state().unwrap(), RunState::HaltedNeedsReset);
    remote.reset().unwrap();
    assert_eq!(remote.run_state().unwrap(), RunState::HaltedResumable);
    remote.cont().unwrap();
    assert_eq!(remote.run_state().unwrap(), RunState::Running);
    assert!(!remote.check_halted().unwrap());

    drop(remote);
    server.join().unwrap();
}

#[test]
fn switches_and_lights() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut remote = connect(addr);

    remote.set_switch_register(0o654321).unwrap();
    remote.write_memory(SWITCH_REG, 0o1357).unwrap().unwrap();
    let snap = remote.sample().unwrap();
    assert_eq!(snap.switch_reg, 0o654321);
    assert_eq!(snap.light_reg, 0o1357);
    assert_eq!(remote.read_memory(SWITCH_REG).unwrap(), Ok(0o54321));

    drop(remote);
    server.join().unwrap();
}

#[test]
fn bus_errors_keep_the_connection() {
    let mut bp = Backplane::with_memory(TEST_MEM_BYTES);
    bp.poison(0o1000);
    let (addr, server) = spawn_server(bp, 1);
    let mut remote = connect(addr);

    assert_eq!(remote.read_memory(TEST_MEM_BYTES).unwrap(), Err(BusError::Timeout));
    assert_eq!(remote.read_memory(0o770000).unwrap(), Err(BusError::Timeout));
    assert_eq!(remote.read_memory(0o1000).unwrap(), Err(BusError::Parity));

    assert_eq!(remote.write_memory(0o1000, 0o4321).unwrap(), Ok(0o4321));
    assert_eq!(remote.read_memory(0o1000).unwrap(), Ok(0o4321));

    // Failed operations leave the bus latches alone.
    assert_eq!(remote.read_memory(TEST_MEM_BYTES + 2).unwrap(), Err(BusError::Timeout));
    let snap = remote.sample().unwrap();
    assert_eq!((snap.addr, snap.data), (0o1000, 0o4321));

    drop(remote);
    server.join().unwrap();
}

#[test]
fn reconnect_keeps_state() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 2);

    let mut first = connect(addr);
    first.write_memory(0o2000, 0o1234).unwrap().unwrap();
    first.write_memory(PC, 0o2000).unwrap().unwrap();
    first.set_switch_register(0o777).unwrap();
    drop(first);

    let mut second = connect(addr);
    assert_eq!(second.read_memory(0o2000).unwrap(), Ok(0o1234));
    assert_eq!(second.read_memory(PC).unwrap(), Ok(0o2000));
    assert_eq!(second.sample().unwrap().switch_reg, 0o777);
    drop(second);

    let server = server.join().unwrap();
    assert!(server.access().file().halted());
}

#[test]
fn pins_over_the_wire() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut remote = connect(addr);

    let rl = remote.find_pin("RL_ENABLE").unwrap();
    assert_eq!(remote.get_pin(rl).unwrap(), 0);
    assert!(remote.set_pin(rl, 1).unwrap());
    assert_eq!(remote.get_pin(rl).unwrap(), 1);

    let halted = remote.find_pin("ky_halted").unwrap();
    assert_eq!(remote.get_pin(halted).unwrap(), 1);
    assert!(!remote.set_pin(halted, 0).unwrap());
    assert_eq!(remote.get_pin(halted).unwrap(), 1);

    assert!(matches!(remote.find_pin("rh_enable"), Err(AccessError::UnknownPin(_))));
    assert_eq!(remote.get_pin(rl).unwrap(), 1);

    drop(remote);
    server.join().unwrap();
}

#[test]
fn drives_over_the_wire() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut remote = connect(addr);

    let msg = remote.load_drive(DeviceClass::Tm, 1, false, Some("/nonexistent/x.tap")).unwrap();
    assert!(msg.is_some());
    let msg = remote.load_drive(DeviceClass::Rl, 0, false, Some("disk.img")).unwrap();
    assert!(msg.unwrap().contains(".rl01 or .rl02"));

    assert_eq!(remote.load_drive(DeviceClass::Tm, 1, true, None).unwrap(), None);
    let st = remote.drive_status(DeviceClass::Tm, 1).unwrap().decode(DeviceClass::Tm);
    assert!(st.write_protected);
    assert!(!st.loaded);
    assert_eq!(remote.drive_file(DeviceClass::Tm, 1).unwrap(), "");

    // Checked before anything is sent.
    assert!(matches!(
        remote.drive_status(DeviceClass::Rl, 4),
        Err(AccessError::BadDrive { drive: 4, .. })
    ));
    assert!(remote.drive_status(DeviceClass::Tm, 7).is_ok());

    drop(remote);
    server.join().unwrap();
}

#[test]
fn bad_command_closes_the_connection() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 2);

    let mut raw = TcpStream::connect(addr).unwrap();
    raw.write_all(&[99]).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(raw.read(&mut buf).unwrap(), 0);
    drop(raw);

    // The server goes back to accepting.
    let mut remote = connect(addr);
    assert_eq!(remote.run_state().unwrap(), RunState::HaltedResumable);
    drop(remote);
    server.join().unwrap();
}
