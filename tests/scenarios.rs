//! End-to-end scenarios against a full-featured instance (spec.md §8).

use iopmp_core::config::{
    ENTRYLCK_OFFSET, ENTRYOFFSET_OFFSET, ERR_CFG_OFFSET, ERR_MFR_OFFSET, ERR_MSIADDR_OFFSET, HWCFG0_OFFSET,
    MDCFG_TABLE_BASE_OFFSET, SRCMD_TABLE_BASE_OFFSET,
};
use iopmp_core::{ConfigSnapshot, ErrorType, Iopmp, MockMemory, Permission, Status, TransactionRequest};

fn baseline() -> ConfigSnapshot {
    ConfigSnapshot {
        vendor: 0x1234,
        specver: 1,
        impid: 1,

        md_num: 63,
        rrid_num: 63,
        entry_num: 512,

        enable: false,
        addrh_en: true,
        tor_en: true,

        prio_entry: 16,
        prio_ent_prog: true,
        non_prio_en: true,
        chk_x: true,
        peis: true,
        pees: true,
        sps_en: false,
        stall_en: true,
        mfr_en: true,

        mdcfg_fmt: 0,
        srcmd_fmt: 0,
        md_entry_num: 0,
        no_x: false,
        no_w: false,
        rrid_transl_en: false,
        rrid_transl_prog: false,
        rrid_transl: 0,

        entryoffset: 0x2000,

        imp_mdlck: true,
        imp_error_capture: true,
        imp_err_reqid_eid: true,
        imp_rridscp: true,
        imp_msi: true,
    }
}

fn entry_offset(idx: u64, sub: u64) -> u64 {
    0x2000 + idx * 16 + sub
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn s1_off_read_denied() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();

    iopmp.mmio_write(SRCMD_TABLE_BASE_OFFSET + 2 * 32, 0x10, 4);
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 3, 2, 4);
    iopmp.mmio_write(entry_offset(1, 0), 364 >> 2, 4); // ADDR
    iopmp.mmio_write(entry_offset(1, 8), 0b001, 4); // CFG: OFF | R
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4); // enable

    let mut mem = MockMemory::new(0x10000);
    let req = TransactionRequest {
        rrid: 2,
        addr: 364,
        length: 1,
        size: 0,
        perm: Permission::Read,
        is_amo: true,
    };
    let (resp, _) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Error);
    assert_eq!(iopmp.error_capture().etype, ErrorType::NotHitAnyRule);
}

#[test]
fn s2_napot_full_match() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();

    iopmp.mmio_write(SRCMD_TABLE_BASE_OFFSET + 32 * 32, 1 << 4, 4); // rrid 32 -> MD3
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 3, 2, 4);
    iopmp.mmio_write(entry_offset(1, 0), 90, 4); // ADDR encodes NAPOT [360,368)
    iopmp.mmio_write(entry_offset(1, 8), 0b0011_001, 4); // CFG: NAPOT | R
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);

    let mut mem = MockMemory::new(0x10000);
    let req = TransactionRequest {
        rrid: 32,
        addr: 360,
        length: 8,
        size: 3,
        perm: Permission::Read,
        is_amo: false,
    };
    let (resp, _) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Success);
}

#[test]
fn s3_tor_partial_hit() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();

    iopmp.mmio_write(SRCMD_TABLE_BASE_OFFSET + 2 * 32, 1 << 4, 4); // rrid 2 -> MD3
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 3, 2, 4);
    iopmp.mmio_write(entry_offset(1, 0), 368 >> 2, 4); // ADDR: TOR top
    iopmp.mmio_write(entry_offset(1, 8), 0b0001_001, 4); // CFG: TOR | R
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);

    let mut mem = MockMemory::new(0x10000);
    let req = TransactionRequest {
        rrid: 2,
        addr: 364,
        length: 8,
        size: 3,
        perm: Permission::Read,
        is_amo: false,
    };
    let (resp, _) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Error);
    assert_eq!(iopmp.error_capture().etype, ErrorType::PartialHitOnPriority);
}

#[test]
fn s4_lock_gating_freezes_entry() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();

    iopmp.mmio_write(SRCMD_TABLE_BASE_OFFSET + 2 * 32, 1 << 4, 4);
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 3, 2, 4);
    iopmp.mmio_write(entry_offset(1, 0), 90, 4);
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);

    // raw 0x1000 -> F = 2048, freezing every entry index below it (the whole table).
    iopmp.mmio_write(ENTRYLCK_OFFSET, 0x1000, 4);

    // The CFG write below is a no-op: entry 1's CFG stays all-zero (OFF, no perms).
    iopmp.mmio_write(entry_offset(1, 8), 0b0011_001, 4);

    let mut mem = MockMemory::new(0x10000);
    let req = TransactionRequest {
        rrid: 2,
        addr: 360,
        length: 8,
        size: 3,
        perm: Permission::Read,
        is_amo: false,
    };
    let (resp, _) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Error);
    assert_eq!(iopmp.error_capture().etype, ErrorType::NotHitAnyRule);
}

#[test]
fn s5_msi_write_error_still_records_violation() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);
    iopmp.mmio_write(ERR_CFG_OFFSET, 0x8F0A, 4);
    iopmp.mmio_write(ERR_MSIADDR_OFFSET, 0x8000, 4);

    let mut mem = MockMemory::new(0x10000);
    mem.bus_error_addr = Some(0x8000);

    let req = TransactionRequest {
        rrid: 2,
        addr: 360,
        length: 4,
        size: 2,
        perm: Permission::InstrFetch,
        is_amo: false,
    };
    let (resp, interrupt) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Error);
    assert!(interrupt.is_some());
    assert!(iopmp.error_capture().msi_werr);
}

#[test]
fn s6_mfr_subsequent_violation_accumulation() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);
    let mut mem = MockMemory::new(0x10000);

    for rrid in [2u16, 4, 6, 20] {
        let req = TransactionRequest {
            rrid,
            addr: 0,
            length: 4,
            size: 2,
            perm: Permission::Read,
            is_amo: false,
        };
        iopmp.check(&req, &mut mem);
    }

    let w0 = iopmp.mmio_read(ERR_MFR_OFFSET, 4);
    assert_eq!(w0 & 0xFFFF, (1 << 4) | (1 << 6));
    assert_eq!((w0 >> 16) & 0xFFF, 0);
    assert_eq!(w0 >> 31, 1);

    let w1 = iopmp.mmio_read(ERR_MFR_OFFSET, 4);
    assert_eq!(w1 & 0xFFFF, 1 << (20 - 16));
    assert_eq!((w1 >> 16) & 0xFFF, 1);
    assert_eq!(w1 >> 31, 1);

    let w2 = iopmp.mmio_read(ERR_MFR_OFFSET, 4);
    assert_eq!(w2, 0);
    assert!(!iopmp.error_capture().svc);
}

#[test]
fn non_priority_partial_overlap_yields_not_hit_with_no_diagnosis() {
    init_logger();
    // non_prio_en only gates whether HWCFG2.prio_entry is programmable
    // (the field stays at its reset value either way); it must never gate
    // whether entries at/after prio_entry participate in the sweep.
    let mut cfg = baseline();
    cfg.non_prio_en = false;
    let mut iopmp = Iopmp::reset(cfg).unwrap();

    iopmp.mmio_write(SRCMD_TABLE_BASE_OFFSET + 2 * 32, 1 << 4, 4); // rrid 2 -> MD3
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 0, 16, 4);
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 1, 16, 4);
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 2, 16, 4);
    iopmp.mmio_write(MDCFG_TABLE_BASE_OFFSET + 4 * 3, 18, 4); // MD3 owns entries [16,18)
    iopmp.mmio_write(entry_offset(17, 0), 368 >> 2, 4); // ADDR: TOR top
    iopmp.mmio_write(entry_offset(17, 8), 0b0001_001, 4); // CFG: TOR | R
    iopmp.mmio_write(HWCFG0_OFFSET, 1, 4);

    let mut mem = MockMemory::new(0x10000);
    let req = TransactionRequest {
        rrid: 2,
        addr: 364,
        length: 8,
        size: 3,
        perm: Permission::Read,
        is_amo: false,
    };
    let (resp, _) = iopmp.check(&req, &mut mem);
    assert_eq!(resp.status, Status::Error);
    assert_eq!(iopmp.error_capture().etype, ErrorType::NotHitAnyRule);
}

#[test]
fn entryoffset_is_read_only() {
    init_logger();
    let mut iopmp = Iopmp::reset(baseline()).unwrap();
    iopmp.mmio_write(ENTRYOFFSET_OFFSET, 0x9999, 4);
    assert_eq!(iopmp.mmio_read(ENTRYOFFSET_OFFSET, 4), 0x2000);
}
