use std::fs;
use std::time::{Duration, Instant};

use access_lib::backplane::Backplane;
use access_lib::LocalAccess;
use common::DeviceClass;
use console_lib::drive_status::{ERROR_COOLDOWN, READY_HOLD};
use console_lib::Console;

use crate::harness::TEST_MEM_BYTES;

fn tape(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("console-tests-{}-{name}.tap", std::process::id()));
    fs::write(&path, [0u8; 64]).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn tape_debounce_and_label() {
    let file = tape("debounce");
    let mut con = Console::new(LocalAccess::new(Backplane::with_memory(TEST_MEM_BYTES))).unwrap();
    con.set_pin_value("tm_enable", 1).unwrap();
    let t0 = Instant::now();
    assert!(con.load_drive(DeviceClass::Tm, 2, &file, t0).unwrap());

    con.poll(t0).unwrap();
    let tr = &con.drives(DeviceClass::Tm)[2];
    assert_eq!(tr.label(), file);
    assert!(!tr.ready());

    con.poll(t0 + READY_HOLD).unwrap();
    assert!(con.drives(DeviceClass::Tm)[2].ready());

    // Tape motion blinks ready off.
    let t1 = t0 + Duration::from_millis(100);
    con.access_mut().file_mut().set_drive_position(DeviceClass::Tm, 2, 512);
    con.poll(t1).unwrap();
    let tr = &con.drives(DeviceClass::Tm)[2];
    assert!(!tr.ready());
    assert_eq!(tr.status().unwrap().position, Some(512));
    con.poll(t1 + READY_HOLD).unwrap();
    assert!(con.drives(DeviceClass::Tm)[2].ready());

    // Drives of a disabled controller aren't polled.
    assert!(con.drives(DeviceClass::Rl)[0].status().is_none());

    assert!(con.unload_drive(DeviceClass::Tm, 2, t1).unwrap());
    con.poll(t1 + Duration::from_millis(50)).unwrap();
    let tr = &con.drives(DeviceClass::Tm)[2];
    assert_eq!(tr.label(), "");
    assert!(!tr.status().unwrap().loaded);

    let _ = fs::remove_file(&file);
}

#[test]
fn load_error_holds_then_clears() {
    let mut con = Console::new(LocalAccess::new(Backplane::with_memory(TEST_MEM_BYTES))).unwrap();
    con.set_pin_value("rl_enable", 1).unwrap();
    let t0 = Instant::now();
    con.poll(t0).unwrap();

    // The cooldown runs on the clock the caller passes, not the wall clock.
    let shown = t0 + Duration::from_secs(60);
    assert!(!con.load_drive(DeviceClass::Rl, 1, "/nonexistent/pack.rl02", shown).unwrap());
    assert!(con.message().starts_with("error loading /nonexistent/pack.rl02"));
    con.poll(shown + ERROR_COOLDOWN).unwrap();
    let tr = &con.drives(DeviceClass::Rl)[1];
    assert!(tr.in_cooldown());
    assert!(tr.label().starts_with("error loading"));

    con.poll(shown + ERROR_COOLDOWN + Duration::from_millis(1)).unwrap();
    let tr = &con.drives(DeviceClass::Rl)[1];
    assert!(!tr.in_cooldown());
    assert_eq!(tr.label(), "");
}
