use std::time::Instant;

use access_lib::backplane::Backplane;
use access_lib::{Access, LocalAccess, RegisterAccess};
use common::constants::{PC, PSW, R0, START_PS};
use common::RunState;
use console_lib::{script, Console, ConsoleError, ExDepKind, LoadedAddress, Operation};

use crate::harness::{connect, spawn_server, Recording, TEST_MEM_BYTES};

fn local() -> LocalAccess<Backplane> {
    LocalAccess::new(Backplane::with_memory(TEST_MEM_BYTES))
}

#[test]
fn rejected_commands_never_reach_the_processor() {
    let mut con = Console::new(Recording::new(local())).unwrap();
    con.poll(Instant::now()).unwrap();
    con.cont().unwrap();
    con.poll(Instant::now()).unwrap();
    assert_eq!(con.run_state(), Some(RunState::Running));

    let before = con.access().calls.len();
    for res in [con.step().map(drop), con.cont(), con.start().map(drop)] {
        assert!(matches!(res, Err(ConsoleError::NotPermitted { state: Some(RunState::Running), .. })));
    }
    assert!(matches!(
        con.examine(),
        Err(ConsoleError::NotPermitted { op: Operation::Examine, .. })
    ));
    assert!(matches!(con.load_address(false), Err(ConsoleError::NotPermitted { .. })));
    assert_eq!(con.access().calls.len(), before);
    assert_eq!(con.access().count("step"), 0);
}

#[test]
fn gating_follows_cont_and_start_without_a_poll() {
    let mut con = Console::new(Recording::new(local())).unwrap();
    con.poll(Instant::now()).unwrap();
    con.cont().unwrap();
    assert_eq!(con.run_state(), Some(RunState::Running));

    let before = con.access().calls.len();
    assert!(matches!(con.examine(), Err(ConsoleError::NotPermitted { state: Some(RunState::Running), .. })));
    assert!(matches!(con.cont(), Err(ConsoleError::NotPermitted { op: Operation::Cont, .. })));
    assert_eq!(con.access().calls.len(), before);
    assert_eq!(con.access().count("cont"), 1);

    assert!(con.halt().unwrap());
    con.set_switch_register(0o1000).unwrap();
    con.load_address(false).unwrap();
    assert!(con.start().unwrap());
    assert_eq!(con.run_state(), Some(RunState::Running));
    let before = con.access().calls.len();
    assert!(matches!(con.deposit(), Err(ConsoleError::NotPermitted { op: Operation::Deposit, .. })));
    assert!(matches!(con.step(), Err(ConsoleError::NotPermitted { .. })));
    assert_eq!(con.access().calls.len(), before);
}

fn execute_halt(acc: &mut LocalAccess<Backplane>) {
    acc.file_mut().halt_instruction();
}

#[test]
fn step_onto_halt_needs_reset() {
    let mut rec = Recording::new(local());
    rec.on_step = Some(execute_halt);
    let mut con = Console::new(rec).unwrap();
    con.access_mut().inner.write_memory(PC, 0o1000).unwrap().unwrap();
    con.poll(Instant::now()).unwrap();

    assert!(con.step().unwrap());
    assert_eq!(con.run_state(), Some(RunState::HaltedNeedsReset));
    assert!(con.message().starts_with("stopped at PC 001002"));

    assert!(matches!(con.step(), Err(ConsoleError::NotPermitted { op: Operation::Step, .. })));
    assert!(matches!(con.cont(), Err(ConsoleError::NotPermitted { op: Operation::Cont, .. })));
    assert_eq!(con.access().count("step"), 1);
    assert_eq!(con.access().count("cont"), 0);
}

#[test]
fn unknown_state_rejects_everything_but_reset() {
    let mut con = Console::new(Recording::new(local())).unwrap();
    assert_eq!(con.run_state(), None);
    let err = con.halt().unwrap_err();
    assert_eq!(err.to_string(), "halt not permitted while processor is in an unknown state");
    assert!(matches!(con.deposit(), Err(ConsoleError::NotPermitted { .. })));
    assert_eq!(con.access().count("halt"), 0);

    assert!(con.reset().unwrap());
    assert_eq!(con.access().count("reset"), 1);
    assert_eq!(con.run_state(), Some(RunState::HaltedResumable));
}

#[test]
fn halt_instruction_needs_reset() {
    let mut con = Console::new(local()).unwrap();
    con.access_mut().write_memory(PC, 0o1000).unwrap().unwrap();
    con.poll(Instant::now()).unwrap();
    con.cont().unwrap();
    con.poll(Instant::now()).unwrap();

    con.access_mut().file_mut().halt_instruction();
    con.poll(Instant::now()).unwrap();
    assert_eq!(con.run_state(), Some(RunState::HaltedNeedsReset));
    assert!(con.message().starts_with("stopped at PC 001000"));

    assert!(matches!(con.cont(), Err(ConsoleError::NotPermitted { .. })));
    assert!(matches!(con.step(), Err(ConsoleError::NotPermitted { .. })));
    assert!(con.examine().is_ok());

    assert!(con.reset().unwrap());
    assert_eq!(con.run_state(), Some(RunState::HaltedResumable));
    assert!(con.step().unwrap());
}

#[test]
fn start_then_halt_over_the_network() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut con = Console::new(Access::Remote(connect(addr))).unwrap();
    con.poll(Instant::now()).unwrap();
    assert!(con.access().is_remote());

    con.access_mut().write_memory(R0, 0o17).unwrap().unwrap();
    con.set_switch_register(0o1000).unwrap();
    con.load_address(false).unwrap();
    assert!(con.start().unwrap());
    assert_eq!(con.message(), "starting at 001000");

    con.poll(Instant::now()).unwrap();
    assert_eq!(con.run_state(), Some(RunState::Running));
    assert!(con.halt().unwrap());
    assert_eq!(con.message(), "stopped at PC 001000, PS 000340, R0 000017");
    assert_eq!(con.loaded(), LoadedAddress { value: 0o1000, virt: true });
    assert_eq!(con.access_mut().read_memory(PSW).unwrap(), Ok(START_PS));

    drop(con);
    server.join().unwrap();
}

#[test]
fn auto_increment_over_the_network() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut con = Console::new(connect(addr)).unwrap();
    con.poll(Instant::now()).unwrap();

    con.set_switch_register(0o2000).unwrap();
    con.load_address(false).unwrap();
    for val in [0o11, 0o22, 0o33] {
        con.set_switch_register(val).unwrap();
        con.deposit().unwrap();
    }
    assert_eq!(con.loaded().value, 0o2004);

    con.set_switch_register(0o777700).unwrap();
    con.load_address(false).unwrap();
    con.examine().unwrap();
    let out = con.examine().unwrap();
    assert_eq!(out.addr.value, 0o777701);

    con.set_switch_register(0o2002).unwrap();
    con.load_address(false).unwrap();
    assert_eq!(con.examine().unwrap().data(), Some(0o22));
    assert_eq!(con.examine().unwrap().data(), Some(0o33));

    // Nothing answers at 770000, so the address stays put.
    con.set_switch_register(0o770000).unwrap();
    con.load_address(false).unwrap();
    assert!(!con.examine().unwrap().succeeded());
    assert!(!con.auto_increment(ExDepKind::Examine));
    assert_eq!(con.examine().unwrap().addr.value, 0o770000);

    drop(con);
    server.join().unwrap();
}

#[test]
fn script_over_the_network() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut con = Console::new(connect(addr)).unwrap();

    let text = "\
        sr 1000\n\
        ldad\n\
        sr 12737\n\
        dep\n\
        step\n\
        pin ky_halted\n\
        pin ky_halted 0\n\
        cont\n\
        step\n";
    let mut out = Vec::new();
    script::run(&mut con, text, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "loaded physical address 001000",
            "deposited to physical address 001000, data 012737",
            "stopped at PC 000002, PS 000000, R0 000000",
            "ky_halted = 1",
            "pin ky_halted is read-only",
            "processor resumed",
            "step not permitted while processor is running",
        ]
    );

    drop(con);
    server.join().unwrap();
}
