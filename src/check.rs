//! The transaction-check engine (spec.md §4.5): the operation a bus
//! fabric invokes once per initiator transaction.

use tock_registers::interfaces::Readable;

use crate::entry::MatchExtent;
use crate::iopmp::Iopmp;
use crate::mem::MemoryPort;
use crate::regs::{ERR_CFG, HWCFG3};
use crate::types::{ErrorType, Interrupt, Permission, Status, TransactionRequest, TransactionResponse, USER_SENTINEL};

/// The classification a sweep (priority or non-priority) settles on before
/// post-classification overrides and error capture run.
struct Verdict {
    success: bool,
    etype: ErrorType,
    entry_idx: Option<usize>,
}

pub fn check(
    iopmp: &mut Iopmp,
    req: &TransactionRequest,
    mem: &mut dyn MemoryPort,
) -> (TransactionResponse, Option<Interrupt>) {
    if req.rrid >= iopmp.cfg.rrid_num {
        let verdict = Verdict {
            success: false,
            etype: ErrorType::UnknownRrid,
            entry_idx: None,
        };
        return finish(iopmp, req, verdict, mem);
    }

    if iopmp.cfg.stall_en && iopmp.stall.is_stalled(req.rrid as usize) {
        if iopmp.stall.try_park() {
            return (
                TransactionResponse {
                    rrid: req.rrid,
                    rrid_transl: req.rrid,
                    status: Status::Success,
                    user: 0,
                    rrid_stalled: true,
                },
                None,
            );
        }
        if iopmp.err_cfg.is_set(ERR_CFG::STALL_VIOLATION_EN) {
            let verdict = Verdict {
                success: false,
                etype: ErrorType::StalledTransaction,
                entry_idx: None,
            };
            return finish(iopmp, req, verdict, mem);
        }
        // No room to park and violations aren't reported: the initiator is
        // told to retry as if parked, since nothing else can be signaled.
        return (
            TransactionResponse {
                rrid: req.rrid,
                rrid_transl: req.rrid,
                status: Status::Success,
                user: 0,
                rrid_stalled: true,
            },
            None,
        );
    }

    let candidates = candidate_entries(iopmp, req.rrid);
    let prio_entry = iopmp.hwcfg2_prio_entry();

    let mut verdict: Option<Verdict> = None;

    for &(idx, md) in candidates.iter().filter(|&&(idx, _)| idx < prio_entry as usize) {
        let entry = iopmp.entries.get(idx);
        let extent = entry.match_extent(iopmp.entries.prev_addr_words(idx), req.addr, req.size);
        match extent {
            MatchExtent::Full => {
                let allowed = entry.permission_allows(req.perm) && direction_allowed(iopmp, md, req.rrid, req.perm);
                verdict = Some(if allowed {
                    Verdict { success: true, etype: ErrorType::EntryMatch, entry_idx: Some(idx) }
                } else {
                    Verdict { success: false, etype: ErrorType::illegal_for(req.perm), entry_idx: Some(idx) }
                });
                break;
            }
            MatchExtent::Partial => {
                verdict = Some(Verdict {
                    success: false,
                    etype: ErrorType::PartialHitOnPriority,
                    entry_idx: Some(idx),
                });
                break;
            }
            MatchExtent::None => {}
        }
    }

    if verdict.is_none() {
        for &(idx, md) in candidates.iter().filter(|&&(idx, _)| idx >= prio_entry as usize) {
            let entry = iopmp.entries.get(idx);
            let extent = entry.match_extent(iopmp.entries.prev_addr_words(idx), req.addr, req.size);
            if extent == MatchExtent::Full {
                let allowed = entry.permission_allows(req.perm) && direction_allowed(iopmp, md, req.rrid, req.perm);
                verdict = Some(if allowed {
                    Verdict { success: true, etype: ErrorType::EntryMatch, entry_idx: Some(idx) }
                } else {
                    Verdict { success: false, etype: ErrorType::illegal_for(req.perm), entry_idx: Some(idx) }
                });
                break;
            }
        }
    }

    let mut verdict = verdict.unwrap_or(Verdict {
        success: false,
        etype: ErrorType::NotHitAnyRule,
        entry_idx: None,
    });

    if verdict.success && iopmp.cfg.chk_x && iopmp.cfg.no_x && req.perm == Permission::InstrFetch {
        verdict = Verdict {
            success: false,
            etype: ErrorType::IllegalInstrFetch,
            entry_idx: verdict.entry_idx,
        };
    }

    finish(iopmp, req, verdict, mem)
}

fn finish(
    iopmp: &mut Iopmp,
    req: &TransactionRequest,
    verdict: Verdict,
    mem: &mut dyn MemoryPort,
) -> (TransactionResponse, Option<Interrupt>) {
    if verdict.success {
        let rrid_transl = if iopmp.hwcfg3.is_set(HWCFG3::RRID_TRANSL_EN) {
            iopmp.hwcfg3.read(HWCFG3::RRID_TRANSL) as u16
        } else {
            req.rrid
        };
        return (
            TransactionResponse {
                rrid: req.rrid,
                rrid_transl,
                status: Status::Success,
                user: 0,
                rrid_stalled: false,
            },
            None,
        );
    }

    let ie = iopmp.err_cfg.is_set(ERR_CFG::IE);
    let rs = iopmp.err_cfg.is_set(ERR_CFG::RS);
    let interrupt_suppressed = !ie || entry_bit(iopmp, verdict.entry_idx, req.perm, Suppress::Interrupt);
    let response_suppressed = rs && entry_bit(iopmp, verdict.entry_idx, req.perm, Suppress::Response);

    log::debug!("rrid={} perm={:?} violation={}", req.rrid, req.perm, verdict.etype);

    if iopmp.cfg.imp_error_capture {
        iopmp.error_capture.record_violation(
            req.rrid,
            req.perm,
            verdict.etype,
            req.addr,
            verdict.entry_idx,
            iopmp.cfg.imp_err_reqid_eid,
            iopmp.cfg.mfr_en,
        );
    }

    let interrupt = if interrupt_suppressed {
        None
    } else {
        Some(Interrupt { rrid: req.rrid, etype: verdict.etype })
    };

    if interrupt.is_some() && iopmp.cfg.imp_msi && iopmp.err_cfg.is_set(ERR_CFG::MSI_EN) {
        let addr = (iopmp.err_msiaddr as u64) | ((iopmp.err_msiaddrh as u64) << 32);
        let msidata = iopmp.err_cfg.read(ERR_CFG::MSIDATA) as u64;
        if mem.write_memory(addr, 4, msidata).is_err() {
            log::error!("MSI write to {addr:#x} bus-faulted");
            if iopmp.cfg.imp_error_capture {
                iopmp.error_capture.msi_werr = true;
            }
        }
    }

    let (status, user) = if response_suppressed {
        (Status::Success, USER_SENTINEL)
    } else {
        (Status::Error, 0)
    };

    (
        TransactionResponse {
            rrid: req.rrid,
            rrid_transl: req.rrid,
            status,
            user,
            rrid_stalled: false,
        },
        interrupt,
    )
}

enum Suppress {
    Interrupt,
    Response,
}

/// Looks up the matching entry's per-direction suppression bit, or `false`
/// when there is no matching entry (unknown-RRID / stalled / no-hit
/// classifications carry no per-entry context).
fn entry_bit(iopmp: &Iopmp, entry_idx: Option<usize>, perm: Permission, which: Suppress) -> bool {
    let Some(idx) = entry_idx else { return false };
    let e = iopmp.entries.get(idx);
    match which {
        Suppress::Interrupt => match perm {
            Permission::Read => e.sire,
            Permission::Write => e.siwe,
            Permission::InstrFetch => e.sixe,
        },
        Suppress::Response => match perm {
            Permission::Read => e.sere,
            Permission::Write => e.sewe,
            Permission::InstrFetch => e.sexe,
        },
    }
}

/// The per-MD, per-direction override consulted alongside an entry's own
/// `r/w/x` bits (spec.md §4.4): `SRCMD_R/_W` under format 0 with
/// `sps_en=1`, or the `SRCMD_PERM{,H}` pair under format 2.
fn direction_allowed(iopmp: &Iopmp, md: usize, rrid: u16, perm: Permission) -> bool {
    match iopmp.cfg.srcmd_fmt {
        0 => {
            if !iopmp.cfg.sps_en {
                return true;
            }
            let Some(row) = iopmp.srcmd.baseline_row(rrid as usize) else { return true };
            match perm {
                Permission::Read => (row.r >> md) & 1 != 0,
                Permission::Write => (row.w >> md) & 1 != 0,
                Permission::InstrFetch => true,
            }
        }
        2 => {
            let Some(slot) = iopmp.srcmd.md_indexed_slot(md) else { return true };
            match perm {
                Permission::Read => slot.read_allows(rrid),
                Permission::Write => slot.write_allows(rrid),
                Permission::InstrFetch => true,
            }
        }
        _ => true,
    }
}

/// The entries a given RRID may consult, in global index order, paired
/// with the MD each was reached through (spec.md §4.5 steps 3-4).
fn candidate_entries(iopmp: &Iopmp, rrid: u16) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    match iopmp.cfg.srcmd_fmt {
        2 => {
            for md in 0..iopmp.cfg.md_num as usize {
                let Some(slot) = iopmp.srcmd.md_indexed_slot(md) else { continue };
                if slot.read_allows(rrid) || slot.write_allows(rrid) {
                    for idx in md_entry_range(iopmp, md) {
                        if idx < iopmp.entries.len() {
                            out.push((idx, md));
                        }
                    }
                }
            }
        }
        _ => {
            let mds = iopmp.srcmd.mds_for_rrid(rrid as usize).unwrap_or(0);
            for md in 0..iopmp.cfg.md_num as usize {
                if (mds >> md) & 1 != 0 {
                    for idx in md_entry_range(iopmp, md) {
                        if idx < iopmp.entries.len() {
                            out.push((idx, md));
                        }
                    }
                }
            }
        }
    }
    out.sort_by_key(|&(idx, _)| idx);
    out
}

fn md_entry_range(iopmp: &Iopmp, md: usize) -> core::ops::Range<usize> {
    if iopmp.cfg.mdcfg_fmt == 0 {
        iopmp.mdcfg.range_for(md)
    } else {
        let span = iopmp.cfg.md_entry_num as usize + 1;
        (md * span)..((md + 1) * span)
    }
}

impl Iopmp {
    fn hwcfg2_prio_entry(&self) -> u16 {
        use crate::regs::HWCFG2;
        self.hwcfg2.read(HWCFG2::PRIO_ENTRY) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;
    use crate::entry::RawAddrMode;
    use crate::mem::MockMemory;
    use crate::regs::AddrMode;

    fn test_config() -> ConfigSnapshot {
        ConfigSnapshot {
            vendor: 0,
            specver: 1,
            impid: 0,
            md_num: 4,
            rrid_num: 4,
            entry_num: 8,
            enable: true,
            addrh_en: false,
            tor_en: true,
            prio_entry: 2,
            prio_ent_prog: false,
            non_prio_en: false,
            chk_x: false,
            peis: false,
            pees: false,
            sps_en: false,
            stall_en: false,
            mfr_en: false,
            mdcfg_fmt: 1,
            srcmd_fmt: 1,
            md_entry_num: 1,
            no_x: false,
            no_w: false,
            rrid_transl_en: false,
            rrid_transl_prog: false,
            rrid_transl: 0,
            entryoffset: 0x2000,
            imp_mdlck: false,
            imp_error_capture: true,
            imp_err_reqid_eid: false,
            imp_rridscp: false,
            imp_msi: false,
        }
    }

    /// `non_prio_en=false` must still let entries at/after `prio_entry`
    /// participate in the sweep; it only gates whether `HWCFG2.prio_entry`
    /// is programmable, never whether non-priority entries are consulted.
    /// A gated sweep would wrongly fall through to `NOT_HIT_ANY_RULE` here
    /// even though entry 3 fully matches and grants the access.
    #[test]
    fn non_priority_sweep_runs_even_when_non_prio_en_is_false() {
        let mut iopmp = Iopmp::reset(test_config()).unwrap();
        assert_eq!(iopmp.hwcfg2_prio_entry(), 2);

        // mdcfg_fmt=1, md_entry_num=1 -> each MD owns a 2-entry span;
        // exclusive srcmd format maps rrid 1 to MD 1, i.e. entries [2, 4).
        let e = iopmp.entries.get_mut(3);
        e.addr = 364 >> 2;
        e.a = RawAddrMode(AddrMode::Na4.bits());
        e.r = true;

        let mut mem = MockMemory::new(0x1000);
        let req = TransactionRequest {
            rrid: 1,
            addr: 364,
            length: 4,
            size: 2,
            perm: Permission::Read,
            is_amo: false,
        };
        let (resp, _) = check(&mut iopmp, &req, &mut mem);
        assert_eq!(resp.status, Status::Success);
    }
}
