//! The MMIO write path (spec.md §4.2). Illegal accesses — bad width,
//! misalignment, an out-of-window offset, a locked field, a rejected
//! monotonicity update — are dropped silently; the host is expected to
//! read back WARL fields to discover non-commits (spec.md §7).

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::config::*;
use crate::entry::RawAddrMode;
use crate::iopmp::Iopmp;
use crate::regs::{self, AddrMode};

/// Writes `data` at `offset`. `num_bytes` must be 4 or 8; an 8-byte write
/// covers both `offset` and `offset + 4` as two independent 32-bit writes,
/// replicating the source's fallthrough between a register and its `*H`
/// companion (spec.md §9 Open Question) uniformly across every register
/// pair rather than special-casing the one place the source's guard looks
/// inverted.
pub fn mmio_write(iopmp: &mut Iopmp, offset: u64, data: u64, num_bytes: u8) {
    if num_bytes != 4 && num_bytes != 8 {
        return;
    }
    if num_bytes > REG_INTF_BUS_WIDTH {
        return;
    }
    if offset % num_bytes as u64 != 0 {
        return;
    }

    write_word(iopmp, offset, data as u32);
    if num_bytes == 8 {
        write_word(iopmp, offset + 4, (data >> 32) as u32);
    }
}

fn write_word(iopmp: &mut Iopmp, offset: u64, word: u32) {
    match offset {
        VERSION_OFFSET | IMPLEMENTATION_OFFSET | HWCFG1_OFFSET | ENTRYOFFSET_OFFSET => {}
        ERR_REQADDR_OFFSET | ERR_REQADDRH_OFFSET | ERR_REQID_OFFSET => {}

        HWCFG0_OFFSET => {
            let incoming = regs::reg::<regs::HWCFG0::Register>();
            incoming.set(word);
            if incoming.is_set(regs::HWCFG0::ENABLE) {
                iopmp.hwcfg0.modify(regs::HWCFG0::ENABLE::SET);
            }
        }

        HWCFG2_OFFSET => {
            if !iopmp.hwcfg0.is_set(regs::HWCFG0::HWCFG2_EN) {
                return;
            }
            let incoming = regs::reg::<regs::HWCFG2::Register>();
            incoming.set(word);
            let prog_was_set = iopmp.hwcfg2.is_set(regs::HWCFG2::PRIO_ENT_PROG);
            if prog_was_set && iopmp.hwcfg2.is_set(regs::HWCFG2::NON_PRIO_EN) {
                iopmp
                    .hwcfg2
                    .modify(regs::HWCFG2::PRIO_ENTRY.val(incoming.read(regs::HWCFG2::PRIO_ENTRY)));
            }
            if incoming.is_set(regs::HWCFG2::PRIO_ENT_PROG) {
                iopmp.hwcfg2.modify(regs::HWCFG2::PRIO_ENT_PROG::CLEAR);
            }
        }

        HWCFG3_OFFSET => {
            if !iopmp.hwcfg0.is_set(regs::HWCFG0::HWCFG3_EN) {
                return;
            }
            let incoming = regs::reg::<regs::HWCFG3::Register>();
            incoming.set(word);
            if iopmp.cfg.mdcfg_fmt == 2 && !iopmp.hwcfg0.is_set(regs::HWCFG0::ENABLE) {
                iopmp
                    .hwcfg3
                    .modify(regs::HWCFG3::MD_ENTRY_NUM.val(incoming.read(regs::HWCFG3::MD_ENTRY_NUM)));
            }
            let transl_prog = iopmp.hwcfg3.is_set(regs::HWCFG3::RRID_TRANSL_PROG);
            if transl_prog && iopmp.hwcfg3.is_set(regs::HWCFG3::RRID_TRANSL_EN) {
                iopmp
                    .hwcfg3
                    .modify(regs::HWCFG3::RRID_TRANSL.val(incoming.read(regs::HWCFG3::RRID_TRANSL)));
            }
            if incoming.is_set(regs::HWCFG3::RRID_TRANSL_PROG) {
                iopmp.hwcfg3.modify(regs::HWCFG3::RRID_TRANSL_PROG::CLEAR);
            }
        }

        MDSTALL_OFFSET => {
            if !iopmp.cfg.stall_en {
                return;
            }
            let was_zero = iopmp.mdstall.get() == 0;
            iopmp.mdstall.set(word & (1 | (md_mask(iopmp.cfg.md_num) << 1)));
            if word == 0 && was_zero {
                iopmp.stall.reset_buffer();
            }
            iopmp.rrid_stall_update();
        }

        MDSTALLH_OFFSET => {
            if !iopmp.cfg.stall_en {
                return;
            }
            iopmp.mdstallh = word & md_mask_high(iopmp.cfg.md_num);
            iopmp.rrid_stall_update();
        }

        RRIDSCP_OFFSET => {
            if !iopmp.cfg.imp_rridscp {
                return;
            }
            let incoming = regs::reg::<regs::RRIDSCP::Register>();
            incoming.set(word);
            let rrid = incoming.read(regs::RRIDSCP::RRID) as u16;
            let op = incoming.read(regs::RRIDSCP::OP_STAT);
            let stat = if rrid >= iopmp.cfg.rrid_num {
                3
            } else {
                match op {
                    0 => {
                        if iopmp.stall.is_stalled(rrid as usize) {
                            1
                        } else {
                            2
                        }
                    }
                    1 => {
                        iopmp.stall.set_stalled(rrid as usize, true);
                        1
                    }
                    2 => {
                        iopmp.stall.set_stalled(rrid as usize, false);
                        2
                    }
                    _ => 3,
                }
            };
            iopmp
                .rridscp
                .write(regs::RRIDSCP::RRID.val(rrid as u32) + regs::RRIDSCP::OP_STAT.val(stat));
        }

        MDLCK_OFFSET => {
            if !iopmp.cfg.imp_mdlck || iopmp.mdlck.is_set(regs::MDLCK::L) {
                return;
            }
            let incoming = word & (1 | (md_mask(iopmp.cfg.md_num) << 1));
            let combined = iopmp.mdlck.get() | incoming;
            iopmp.mdlck.set(combined);
        }

        MDLCKH_OFFSET => {
            if !iopmp.cfg.imp_mdlck || iopmp.mdlck.is_set(regs::MDLCK::L) || iopmp.cfg.md_num <= 31 {
                return;
            }
            iopmp.mdlckh |= word & md_mask_high(iopmp.cfg.md_num);
        }

        MDCFGLCK_OFFSET => {
            if iopmp.cfg.mdcfg_fmt != 0 || iopmp.mdcfglck.is_set(regs::MDCFGLCK::L) {
                return;
            }
            let incoming = regs::reg::<regs::MDCFGLCK::Register>();
            incoming.set(word);
            let new_f = incoming.read(regs::MDCFGLCK::F);
            if new_f > iopmp.mdcfglck.read(regs::MDCFGLCK::F) {
                iopmp.mdcfglck.modify(regs::MDCFGLCK::F.val(new_f));
            }
            if incoming.is_set(regs::MDCFGLCK::L) {
                iopmp.mdcfglck.modify(regs::MDCFGLCK::L::SET);
            }
        }

        ENTRYLCK_OFFSET => {
            if iopmp.entrylck.is_set(regs::ENTRYLCK::L) {
                return;
            }
            let incoming = regs::reg::<regs::ENTRYLCK::Register>();
            incoming.set(word);
            let new_f = incoming.read(regs::ENTRYLCK::F);
            if new_f > iopmp.entrylck.read(regs::ENTRYLCK::F) {
                iopmp.entrylck.modify(regs::ENTRYLCK::F.val(new_f));
            }
            if incoming.is_set(regs::ENTRYLCK::L) {
                iopmp.entrylck.modify(regs::ENTRYLCK::L::SET);
            }
        }

        ERR_CFG_OFFSET => {
            if iopmp.err_cfg.is_set(regs::ERR_CFG::L) {
                return;
            }
            let incoming = regs::reg::<regs::ERR_CFG::Register>();
            incoming.set(word);
            let mut next = regs::ERR_CFG::IE.val(incoming.read(regs::ERR_CFG::IE))
                + regs::ERR_CFG::RS.val(incoming.read(regs::ERR_CFG::RS))
                + regs::ERR_CFG::STALL_VIOLATION_EN.val(incoming.read(regs::ERR_CFG::STALL_VIOLATION_EN))
                + regs::ERR_CFG::L.val(incoming.read(regs::ERR_CFG::L));
            if iopmp.cfg.imp_msi {
                next += regs::ERR_CFG::MSI_EN.val(incoming.read(regs::ERR_CFG::MSI_EN))
                    + regs::ERR_CFG::MSIDATA.val(incoming.read(regs::ERR_CFG::MSIDATA));
            }
            iopmp.err_cfg.write(next);
        }

        ERR_INFO_OFFSET => {
            if !iopmp.cfg.imp_error_capture {
                return;
            }
            let incoming = regs::reg::<regs::ERR_INFO::Register>();
            incoming.set(word);
            if incoming.is_set(regs::ERR_INFO::V) {
                iopmp.error_capture.clear_v();
            }
            if incoming.is_set(regs::ERR_INFO::MSI_WERR) {
                iopmp.error_capture.clear_msi_werr();
            }
        }

        ERR_MFR_OFFSET => {
            if !iopmp.cfg.mfr_en {
                return;
            }
            let incoming = regs::reg::<regs::ERR_MFR::Register>();
            incoming.set(word);
            iopmp.error_capture.set_svi(incoming.read(regs::ERR_MFR::SVI) as usize);
        }

        ERR_MSIADDR_OFFSET => {
            if !iopmp.cfg.imp_msi || iopmp.err_cfg.is_set(regs::ERR_CFG::L) {
                return;
            }
            iopmp.err_msiaddr = word;
        }

        ERR_MSIADDRH_OFFSET => {
            if !iopmp.cfg.imp_msi || iopmp.err_cfg.is_set(regs::ERR_CFG::L) || !iopmp.cfg.addrh_en {
                return;
            }
            iopmp.err_msiaddrh = word;
        }

        off if (ERR_USER0_OFFSET..ERR_USER0_OFFSET + ERR_USER_STRIDE * ERR_USER_COUNT).contains(&off) => {
            let n = ((off - ERR_USER0_OFFSET) / ERR_USER_STRIDE) as usize;
            iopmp.err_user[n] = word;
        }

        off if iopmp.cfg.mdcfg_fmt == 0
            && (MDCFG_TABLE_BASE_OFFSET..MDCFG_TABLE_BASE_OFFSET + 4 * iopmp.cfg.md_num as u64).contains(&off) =>
        {
            let index = ((off - MDCFG_TABLE_BASE_OFFSET) / 4) as usize;
            if (index as u16) < iopmp.mdcfglck.read(regs::MDCFGLCK::F) as u16 {
                return;
            }
            iopmp.mdcfg.write(index, (word & 0xFFFF) as u16, iopmp.cfg.entry_num);
        }

        off if (SRCMD_TABLE_BASE_OFFSET..SRCMD_TABLE_BASE_OFFSET + SRCMD_REG_STRIDE * iopmp.cfg.rrid_num as u64)
            .contains(&off) =>
        {
            write_srcmd(iopmp, off, word);
        }

        off if (iopmp.cfg.entryoffset..iopmp.cfg.entryoffset + ENTRY_REG_STRIDE * iopmp.cfg.entry_num as u64)
            .contains(&off) =>
        {
            write_entry(iopmp, off, word);
        }

        _ => {}
    }
}

fn write_srcmd(iopmp: &mut Iopmp, offset: u64, word: u32) {
    let local = offset - SRCMD_TABLE_BASE_OFFSET;
    let row = (local / SRCMD_REG_STRIDE) as usize;
    let sub = local % SRCMD_REG_STRIDE;

    match iopmp.cfg.srcmd_fmt {
        0 => {
            let mdlck_low = iopmp.mdlck.read(regs::MDLCK::MD);
            let mdlck_high = iopmp.mdlckh;
            let Some(r) = iopmp.srcmd.baseline_row_mut(row) else { return };
            match sub {
                0 => {
                    if r.l {
                        return;
                    }
                    let incoming_md = ((word >> 1) & 0x7FFF_FFFF) & md_mask(iopmp.cfg.md_num);
                    let (cur_low, cur_high) = split_md(r.md);
                    let new_low = (incoming_md & !mdlck_low) | (cur_low & mdlck_low);
                    r.md = combine_md(new_low, cur_high);
                    if word & 1 != 0 {
                        r.l = true;
                    }
                }
                4 => {
                    if r.l {
                        return;
                    }
                    let incoming_md = word & md_mask_high(iopmp.cfg.md_num);
                    let (cur_low, cur_high) = split_md(r.md);
                    let new_high = (incoming_md & !mdlck_high) | (cur_high & mdlck_high);
                    r.md = combine_md(cur_low, new_high);
                }
                8 => {
                    if r.l || !iopmp.cfg.sps_en {
                        return;
                    }
                    let (_, hi) = split_md(r.r);
                    r.r = combine_md(word, hi);
                }
                12 => {
                    if r.l || !iopmp.cfg.sps_en {
                        return;
                    }
                    let (lo, _) = split_md(r.r);
                    r.r = combine_md(lo, word);
                }
                16 => {
                    if r.l || !iopmp.cfg.sps_en {
                        return;
                    }
                    let (_, hi) = split_md(r.w);
                    r.w = combine_md(word, hi);
                }
                20 => {
                    if r.l || !iopmp.cfg.sps_en {
                        return;
                    }
                    let (lo, _) = split_md(r.w);
                    r.w = combine_md(lo, word);
                }
                _ => {}
            }
        }
        2 => {
            let md = row;
            let locked = if md < 31 {
                (iopmp.mdlck.read(regs::MDLCK::MD) >> md) & 1 != 0
            } else {
                (iopmp.mdlckh >> (md - 31)) & 1 != 0
            };
            if locked {
                return;
            }
            let Some(slot) = iopmp.srcmd.md_indexed_slot_mut(md) else { return };
            match sub {
                0 => slot.perm = word,
                4 => slot.permh = word,
                _ => {}
            }
        }
        _ => {}
    }
}

fn write_entry(iopmp: &mut Iopmp, offset: u64, word: u32) {
    let local = offset - iopmp.cfg.entryoffset;
    let index = (local / ENTRY_REG_STRIDE) as usize;
    let sub = local % ENTRY_REG_STRIDE;
    if index < iopmp.entrylck.read(regs::ENTRYLCK::F) as usize {
        return;
    }
    let Some(e) = (index < iopmp.entries.len()).then(|| iopmp.entries.get_mut(index)) else {
        return;
    };
    match sub {
        0 => e.addr = word,
        4 => {
            if iopmp.cfg.addrh_en {
                e.addrh = word;
            }
        }
        8 => {
            let incoming = regs::reg::<regs::ENTRY_CFG::Register>();
            incoming.set(word);
            e.r = incoming.is_set(regs::ENTRY_CFG::R);
            e.w = incoming.is_set(regs::ENTRY_CFG::W);
            e.x = incoming.is_set(regs::ENTRY_CFG::X);
            let proposed = AddrMode::from_bits(incoming.read(regs::ENTRY_CFG::A));
            if proposed != AddrMode::Tor || iopmp.cfg.tor_en {
                e.a = RawAddrMode(proposed.bits());
            }
            if iopmp.cfg.peis {
                e.sire = incoming.is_set(regs::ENTRY_CFG::SIRE);
                e.siwe = incoming.is_set(regs::ENTRY_CFG::SIWE);
                e.sixe = incoming.is_set(regs::ENTRY_CFG::SIXE);
            }
            if iopmp.cfg.pees {
                e.sere = incoming.is_set(regs::ENTRY_CFG::SERE);
                e.sewe = incoming.is_set(regs::ENTRY_CFG::SEWE);
                e.sexe = incoming.is_set(regs::ENTRY_CFG::SEXE);
            }
        }
        12 => e.user_cfg = word,
        _ => {}
    }
}
