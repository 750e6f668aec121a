//! The MMIO read path (spec.md §4.3). An invalid access returns 0 rather
//! than signaling a fault — the core has no channel to report register
//! access errors back to the host (spec.md §7).

use tock_registers::interfaces::{Readable, Writeable};

use crate::config::*;
use crate::iopmp::Iopmp;
use crate::regs;

/// Reads `num_bytes` (4 or 8) at `offset`. Destructive where the register
/// itself is destructive (`ERR_MFR`, spec.md §4.3) — this is the one MMIO
/// operation in this crate that is not a pure function of its inputs.
pub fn mmio_read(iopmp: &mut Iopmp, offset: u64, num_bytes: u8) -> u64 {
    if num_bytes != 4 && num_bytes != 8 {
        return 0;
    }
    if num_bytes > REG_INTF_BUS_WIDTH {
        return 0;
    }
    if offset % num_bytes as u64 != 0 {
        return 0;
    }

    let lo = read_word(iopmp, offset) as u64;
    if num_bytes == 8 {
        let hi = read_word(iopmp, offset + 4) as u64;
        lo | (hi << 32)
    } else {
        lo
    }
}

fn read_word(iopmp: &mut Iopmp, offset: u64) -> u32 {
    match offset {
        VERSION_OFFSET => iopmp.version.get(),
        IMPLEMENTATION_OFFSET => iopmp.implementation,
        HWCFG0_OFFSET => iopmp.hwcfg0.get(),
        HWCFG1_OFFSET => iopmp.hwcfg1.get(),
        HWCFG2_OFFSET => iopmp.hwcfg2.get(),
        HWCFG3_OFFSET => iopmp.hwcfg3.get(),
        ENTRYOFFSET_OFFSET => iopmp.cfg.entryoffset as u32,
        MDSTALL_OFFSET => iopmp.mdstall.get(),
        MDSTALLH_OFFSET => iopmp.mdstallh,
        RRIDSCP_OFFSET => iopmp.rridscp.get(),
        MDLCK_OFFSET => iopmp.mdlck.get(),
        MDLCKH_OFFSET => iopmp.mdlckh,
        MDCFGLCK_OFFSET => iopmp.mdcfglck.get(),
        ENTRYLCK_OFFSET => iopmp.entrylck.get(),
        ERR_CFG_OFFSET => iopmp.err_cfg.get(),

        ERR_INFO_OFFSET => {
            if !iopmp.cfg.imp_error_capture {
                return 0;
            }
            let ec = &iopmp.error_capture;
            let reg = regs::reg::<regs::ERR_INFO::Register>();
            reg.write(
                regs::ERR_INFO::V.val(ec.v as u32)
                    + regs::ERR_INFO::TTYPE.val(ec.ttype as u32)
                    + regs::ERR_INFO::MSI_WERR.val(ec.msi_werr as u32)
                    + regs::ERR_INFO::ETYPE.val(ec.etype.bits() as u32)
                    + regs::ERR_INFO::SVC.val(ec.svc as u32),
            );
            reg.get()
        }

        ERR_REQADDR_OFFSET => {
            if !iopmp.cfg.imp_error_capture {
                return 0;
            }
            (iopmp.error_capture.req_addr_shifted & 0xFFFF_FFFF) as u32
        }
        ERR_REQADDRH_OFFSET => {
            if !iopmp.cfg.imp_error_capture || !iopmp.cfg.addrh_en {
                return 0;
            }
            (iopmp.error_capture.req_addr_shifted >> 32) as u32
        }
        ERR_REQID_OFFSET => {
            if !iopmp.cfg.imp_error_capture {
                return 0;
            }
            let ec = &iopmp.error_capture;
            let reg = regs::reg::<regs::ERR_REQID::Register>();
            reg.write(regs::ERR_REQID::RRID.val(ec.req_rrid as u32) + regs::ERR_REQID::EID.val(ec.req_eid as u32));
            reg.get()
        }

        ERR_MFR_OFFSET => {
            if !iopmp.cfg.mfr_en {
                return 0;
            }
            let reg = regs::reg::<regs::ERR_MFR::Register>();
            match iopmp.error_capture.mfr_read() {
                Some((bitmap, window)) => {
                    reg.write(
                        regs::ERR_MFR::SVW.val(bitmap as u32)
                            + regs::ERR_MFR::SVI.val(window as u32)
                            + regs::ERR_MFR::SVS.val(1),
                    );
                }
                None => reg.set(0),
            }
            reg.get()
        }

        ERR_MSIADDR_OFFSET => {
            if !iopmp.cfg.imp_msi {
                return 0;
            }
            iopmp.err_msiaddr
        }
        ERR_MSIADDRH_OFFSET => {
            if !iopmp.cfg.imp_msi || !iopmp.cfg.addrh_en {
                return 0;
            }
            iopmp.err_msiaddrh
        }

        off if (ERR_USER0_OFFSET..ERR_USER0_OFFSET + ERR_USER_STRIDE * ERR_USER_COUNT).contains(&off) => {
            let n = ((off - ERR_USER0_OFFSET) / ERR_USER_STRIDE) as usize;
            iopmp.err_user[n]
        }

        off if iopmp.cfg.mdcfg_fmt == 0
            && (MDCFG_TABLE_BASE_OFFSET..MDCFG_TABLE_BASE_OFFSET + 4 * iopmp.cfg.md_num as u64).contains(&off) =>
        {
            let index = ((off - MDCFG_TABLE_BASE_OFFSET) / 4) as usize;
            iopmp.mdcfg.get(index) as u32
        }

        off if (SRCMD_TABLE_BASE_OFFSET..SRCMD_TABLE_BASE_OFFSET + SRCMD_REG_STRIDE * iopmp.cfg.rrid_num as u64)
            .contains(&off) =>
        {
            read_srcmd(iopmp, off)
        }

        off if (iopmp.cfg.entryoffset..iopmp.cfg.entryoffset + ENTRY_REG_STRIDE * iopmp.cfg.entry_num as u64)
            .contains(&off) =>
        {
            read_entry(iopmp, off)
        }

        _ => 0,
    }
}

fn read_srcmd(iopmp: &Iopmp, offset: u64) -> u32 {
    let local = offset - SRCMD_TABLE_BASE_OFFSET;
    let row = (local / SRCMD_REG_STRIDE) as usize;
    let sub = local % SRCMD_REG_STRIDE;

    match iopmp.cfg.srcmd_fmt {
        0 => {
            let Some(r) = iopmp.srcmd.baseline_row(row) else { return 0 };
            let (md_lo, md_hi) = split_md(r.md);
            let (r_lo, r_hi) = split_md(r.r);
            let (w_lo, w_hi) = split_md(r.w);
            match sub {
                0 => (md_lo << 1) | (r.l as u32),
                4 => md_hi,
                8 if iopmp.cfg.sps_en => r_lo,
                12 if iopmp.cfg.sps_en => r_hi,
                16 if iopmp.cfg.sps_en => w_lo,
                20 if iopmp.cfg.sps_en => w_hi,
                _ => 0,
            }
        }
        2 => {
            let Some(slot) = iopmp.srcmd.md_indexed_slot(row) else { return 0 };
            match sub {
                0 => slot.perm,
                4 => slot.permh,
                _ => 0,
            }
        }
        _ => 0,
    }
}

fn read_entry(iopmp: &Iopmp, offset: u64) -> u32 {
    let local = offset - iopmp.cfg.entryoffset;
    let index = (local / ENTRY_REG_STRIDE) as usize;
    let sub = local % ENTRY_REG_STRIDE;
    if index >= iopmp.entries.len() {
        return 0;
    }
    let e = iopmp.entries.get(index);
    match sub {
        0 => e.addr,
        4 => e.addrh,
        8 => {
            let reg = regs::reg::<regs::ENTRY_CFG::Register>();
            reg.write(
                regs::ENTRY_CFG::R.val(e.r as u32)
                    + regs::ENTRY_CFG::W.val(e.w as u32)
                    + regs::ENTRY_CFG::X.val(e.x as u32)
                    + regs::ENTRY_CFG::A.val(e.a.0)
                    + regs::ENTRY_CFG::SIRE.val(e.sire as u32)
                    + regs::ENTRY_CFG::SIWE.val(e.siwe as u32)
                    + regs::ENTRY_CFG::SIXE.val(e.sixe as u32)
                    + regs::ENTRY_CFG::SERE.val(e.sere as u32)
                    + regs::ENTRY_CFG::SEWE.val(e.sewe as u32)
                    + regs::ENTRY_CFG::SEXE.val(e.sexe as u32),
            );
            reg.get()
        }
        12 => e.user_cfg,
        _ => 0,
    }
}
