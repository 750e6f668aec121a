//! The top-level instance: owns every piece of mutable state and exposes
//! the three operations a host or bus fabric can perform on it (spec.md §2).

use tock_registers::interfaces::{Readable, ReadWriteable, Writeable};

use crate::config::{num_svw, ConfigSnapshot};
use crate::entry::EntryTable;
use crate::error::ResetError;
use crate::error_capture::ErrorCapture;
use crate::mdcfg::MdcfgTable;
use crate::regs::{self, HWCFG0, HWCFG1, HWCFG2, HWCFG3, MDLCK, VERSION};
use crate::srcmd::SrcmdTable;
use crate::stall::StallState;

/// A single IOPMP unit (spec.md §2, §5). No module-level singletons: every
/// instance is a plain owned value the caller creates, resets, and drives.
pub struct Iopmp {
    pub(crate) cfg: ConfigSnapshot,

    pub(crate) version: regs::Reg<VERSION::Register>,
    pub(crate) implementation: u32,
    pub(crate) hwcfg0: regs::Reg<HWCFG0::Register>,
    pub(crate) hwcfg1: regs::Reg<HWCFG1::Register>,
    pub(crate) hwcfg2: regs::Reg<HWCFG2::Register>,
    pub(crate) hwcfg3: regs::Reg<HWCFG3::Register>,

    pub(crate) mdstall: regs::Reg<regs::MDSTALL::Register>,
    pub(crate) mdstallh: u32,
    pub(crate) rridscp: regs::Reg<regs::RRIDSCP::Register>,
    pub(crate) mdlck: regs::Reg<MDLCK::Register>,
    pub(crate) mdlckh: u32,
    pub(crate) mdcfglck: regs::Reg<regs::MDCFGLCK::Register>,
    pub(crate) entrylck: regs::Reg<regs::ENTRYLCK::Register>,
    pub(crate) err_cfg: regs::Reg<regs::ERR_CFG::Register>,
    pub(crate) err_msiaddr: u32,
    pub(crate) err_msiaddrh: u32,
    pub(crate) err_user: [u32; 8],

    pub(crate) mdcfg: MdcfgTable,
    pub(crate) srcmd: SrcmdTable,
    pub(crate) entries: EntryTable,
    pub(crate) stall: StallState,
    pub(crate) error_capture: ErrorCapture,
}

impl Iopmp {
    /// Validates `cfg` (spec.md §4.1) and, only on success, replaces all
    /// mutable state with a freshly derived reset image. A rejected
    /// configuration leaves `self` untouched when `self` already existed;
    /// callers constructing a fresh instance should treat `Err` as fatal.
    pub fn reset(cfg: ConfigSnapshot) -> Result<Self, ResetError> {
        if let Err(e) = cfg.validate() {
            log::error!("reset rejected: {e}");
            return Err(e);
        }
        log::debug!(
            "resetting iopmp: md_num={} rrid_num={} entry_num={} mdcfg_fmt={} srcmd_fmt={}",
            cfg.md_num,
            cfg.rrid_num,
            cfg.entry_num,
            cfg.mdcfg_fmt,
            cfg.srcmd_fmt
        );

        let version = regs::reg::<VERSION::Register>();
        version.write(VERSION::SPECVER.val(cfg.specver as u32) + VERSION::VENDOR.val(cfg.vendor));

        let hwcfg0 = regs::reg::<HWCFG0::Register>();
        hwcfg0.write(
            HWCFG0::ENABLE.val(cfg.enable as u32)
                + HWCFG0::HWCFG2_EN.val(1)
                + HWCFG0::HWCFG3_EN.val(1)
                + HWCFG0::MD_NUM.val(cfg.md_num as u32)
                + HWCFG0::ADDRH_EN.val(cfg.addrh_en as u32)
                + HWCFG0::TOR_EN.val(cfg.tor_en as u32),
        );

        let hwcfg1 = regs::reg::<HWCFG1::Register>();
        hwcfg1.write(HWCFG1::RRID_NUM.val(cfg.rrid_num as u32) + HWCFG1::ENTRY_NUM.val(cfg.entry_num));

        let hwcfg2 = regs::reg::<HWCFG2::Register>();
        hwcfg2.write(
            HWCFG2::NON_PRIO_EN.val(cfg.non_prio_en as u32)
                + HWCFG2::CHK_X.val(cfg.chk_x as u32)
                + HWCFG2::PEIS.val(cfg.peis as u32)
                + HWCFG2::PEES.val(cfg.pees as u32)
                + HWCFG2::SPS_EN.val(cfg.sps_en as u32)
                + HWCFG2::STALL_EN.val(cfg.stall_en as u32)
                + HWCFG2::MFR_EN.val(cfg.mfr_en as u32),
        );
        // prio_entry/prio_ent_prog stay at their reset-zero value unless
        // non-priority sweeping is enabled (iopmp_reg.c:105-109); the field
        // is meaningless otherwise.
        if cfg.non_prio_en {
            hwcfg2.modify(
                HWCFG2::PRIO_ENTRY.val(cfg.prio_entry as u32) + HWCFG2::PRIO_ENT_PROG.val(cfg.prio_ent_prog as u32),
            );
        }

        let hwcfg3 = regs::reg::<HWCFG3::Register>();
        hwcfg3.write(
            HWCFG3::MDCFG_FMT.val(cfg.mdcfg_fmt as u32)
                + HWCFG3::SRCMD_FMT.val(cfg.srcmd_fmt as u32)
                + HWCFG3::MD_ENTRY_NUM.val(cfg.md_entry_num as u32)
                + HWCFG3::NO_X.val(cfg.no_x as u32)
                + HWCFG3::NO_W.val(cfg.no_w as u32)
                + HWCFG3::RRID_TRANSL_EN.val(cfg.rrid_transl_en as u32)
                + HWCFG3::RRID_TRANSL_PROG.val(cfg.rrid_transl_prog as u32)
                + HWCFG3::RRID_TRANSL.val(cfg.rrid_transl as u32),
        );

        let mdlck = regs::reg::<MDLCK::Register>();
        if !cfg.imp_mdlck {
            // Unlockable MDs are treated as permanently locked (spec.md §4.1).
            mdlck.write(MDLCK::L.val(1));
        }

        Ok(Self {
            cfg,
            version,
            implementation: cfg.impid,
            hwcfg0,
            hwcfg1,
            hwcfg2,
            hwcfg3,
            mdstall: regs::reg(),
            mdstallh: 0,
            rridscp: regs::reg(),
            mdlck,
            mdlckh: 0,
            mdcfglck: regs::reg(),
            entrylck: regs::reg(),
            err_cfg: regs::reg(),
            err_msiaddr: 0,
            err_msiaddrh: 0,
            err_user: [0; 8],
            mdcfg: MdcfgTable::new(cfg.md_num as usize),
            srcmd: SrcmdTable::new(cfg.srcmd_fmt, cfg.rrid_num as usize, cfg.md_num as usize),
            entries: EntryTable::new(cfg.entry_num as usize),
            stall: StallState::new(cfg.rrid_num as usize),
            error_capture: ErrorCapture::new(num_svw(cfg.rrid_num).max(1), cfg.imp_err_reqid_eid),
        })
    }

    pub fn config(&self) -> &ConfigSnapshot {
        &self.cfg
    }

    pub fn error_capture(&self) -> &ErrorCapture {
        &self.error_capture
    }

    pub fn mmio_read(&mut self, offset: u64, num_bytes: u8) -> u64 {
        crate::mmio::read::mmio_read(self, offset, num_bytes)
    }

    pub fn mmio_write(&mut self, offset: u64, data: u64, num_bytes: u8) {
        crate::mmio::write::mmio_write(self, offset, data, num_bytes)
    }

    /// Runs a transaction through the check engine (spec.md §4.5), emitting
    /// an MSI through `mem` on an unsuppressed violation (spec.md §4.7).
    pub fn check(
        &mut self,
        req: &crate::types::TransactionRequest,
        mem: &mut dyn crate::mem::MemoryPort,
    ) -> (crate::types::TransactionResponse, Option<crate::types::Interrupt>) {
        crate::check::check(self, req, mem)
    }

    /// Recomputes `rrid_stall[]` from the current `{MDSTALLH:MDSTALL}`
    /// bitmap (spec.md §4.6), invoked whenever a write touches either half.
    pub(crate) fn rrid_stall_update(&mut self) {
        let exempt = self.mdstall.is_set(regs::MDSTALL::EXEMPT);
        let stall_by_md = crate::config::combine_md(self.mdstall.read(regs::MDSTALL::MD), self.mdstallh);
        self.stall.update(&self.srcmd, self.cfg.srcmd_fmt, self.cfg.md_num, stall_by_md, exempt);
    }
}
