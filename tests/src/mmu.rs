use std::time::Instant;

use access_lib::backplane::Backplane;
use access_lib::RegisterAccess;
use common::constants::{KERNEL_PDR, MMR0, PAR_OFFSET, PSW, USER_PDR};
use console_lib::{translate, Console, LoadedAddress, MmuError, TranslationError};

use crate::harness::{connect, spawn_server, TEST_MEM_BYTES};

const PDR_RW_FULL: u16 = 0o77406; // 128 blocks, expand up, read/write

fn translation_err(res: Result<u32, MmuError>) -> TranslationError {
    match res {
        Err(MmuError::Translation(e)) => e,
        other => panic!("expected a translation error, got {other:?}"),
    }
}

fn map_page<A: RegisterAccess>(acc: &mut A, pdr_base: u32, page: u32, pdr: u16, par: u16) {
    acc.write_memory(pdr_base + 2 * page, pdr).unwrap().unwrap();
    acc.write_memory(pdr_base + PAR_OFFSET + 2 * page, par).unwrap().unwrap();
}

#[test]
fn translation_over_the_network() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut remote = connect(addr);

    // Off: identity, with the top 8K aliasing the I/O page.
    assert_eq!(translate(&mut remote, 0o1234, None).unwrap(), 0o1234);
    assert_eq!(translate(&mut remote, 0o177776, None).unwrap(), 0o777776);
    assert_eq!(translation_err(translate(&mut remote, 0o200000, None)), TranslationError::OutOfRange);

    map_page(&mut remote, KERNEL_PDR, 1, PDR_RW_FULL, 0o200);
    map_page(&mut remote, USER_PDR, 1, PDR_RW_FULL, 0o1000);
    remote.write_memory(MMR0, 1).unwrap().unwrap();

    assert_eq!(translate(&mut remote, 0o20100, Some(0)).unwrap(), 0o20100 - 0o20000 + 0o200 * 0o100);
    assert_eq!(translate(&mut remote, 0o20100, Some(3)).unwrap(), 0o100 + 0o1000 * 0o100);
    assert_eq!(translation_err(translate(&mut remote, 0o40000, Some(0))), TranslationError::PageNoAccess);

    // Mode from the PSW when none is given.
    remote.write_memory(PSW, 0o140000).unwrap().unwrap();
    assert_eq!(translate(&mut remote, 0o20100, None).unwrap(), 0o100100);
    remote.write_memory(PSW, 0o040000).unwrap().unwrap();
    assert_eq!(translation_err(translate(&mut remote, 0o20100, None)), TranslationError::InvalidMode);
    assert_eq!(translation_err(translate(&mut remote, 0o20100, Some(2))), TranslationError::InvalidMode);

    drop(remote);
    server.join().unwrap();
}

#[test]
fn virtual_examine_uses_the_loaded_mode() {
    let (addr, server) = spawn_server(Backplane::with_memory(TEST_MEM_BYTES), 1);
    let mut con = Console::new(connect(addr)).unwrap();
    con.poll(Instant::now()).unwrap();

    let acc = con.access_mut();
    map_page(acc, KERNEL_PDR, 0, PDR_RW_FULL, 0o10);
    map_page(acc, USER_PDR, 0, PDR_RW_FULL, 0o20);
    acc.write_memory(0o1100, 0o1111).unwrap().unwrap();
    acc.write_memory(0o2100, 0o2222).unwrap().unwrap();
    acc.write_memory(MMR0, 1).unwrap().unwrap();

    // Kernel: mode bits 00.
    con.set_switch_register(0o100).unwrap();
    assert_eq!(con.load_address(true).unwrap(), LoadedAddress { value: 0o100, virt: true });
    assert_eq!(con.message(), "loaded virtual address 000100 (pa 001100)");
    assert_eq!(con.examine().unwrap().data(), Some(0o1111));

    // User: mode bits 11 in <17:16>.
    con.set_switch_register(0o600100).unwrap();
    con.load_address(true).unwrap();
    let out = con.examine().unwrap();
    assert_eq!(out.pa, Ok(0o2100));
    assert_eq!(out.data(), Some(0o2222));
    assert_eq!(out.to_string(), "examined virtual address 600100 (pa 002100), data 002222");

    // The next one stays in user space.
    let out = con.examine().unwrap();
    assert_eq!(out.addr.value, 0o600102);

    // Past the page length.
    con.access_mut().write_memory(USER_PDR, 0o000406).unwrap().unwrap();
    con.set_switch_register(0o601000).unwrap();
    con.load_address(true).unwrap();
    assert_eq!(con.message(), "loaded virtual address 601000, above length of expand-up page");
    let out = con.examine().unwrap();
    assert_eq!(out.result, None);
    assert!(!out.succeeded());

    drop(con);
    server.join().unwrap();
}
