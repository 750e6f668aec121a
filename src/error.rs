//! Typed errors for the two surfaces of the core that actually fail:
//! configuration-time reset rejection, and MSI bus faults (spec.md §7).

/// Why [`crate::Iopmp::reset`](crate::iopmp::Iopmp::reset) refused a
/// [`crate::config::ConfigSnapshot`]. One variant per rule in spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResetError {
    #[error("md_num, rrid_num and entry_num must all be non-zero")]
    ZeroCount,
    #[error("md_num must be <= 63, got {0}")]
    TooManyMds(u8),
    #[error("mdcfg_fmt and srcmd_fmt must be in 0..=2")]
    BadTableFormat,
    #[error("sps_en requires srcmd_fmt == 0")]
    SpsRequiresSrcmdFmt0,
    #[error("mfr_en requires imp_error_capture")]
    MfrRequiresErrorCapture,
    #[error("imp_err_reqid_eid requires imp_error_capture")]
    ReqidEidRequiresErrorCapture,
    #[error("no_x requires chk_x")]
    NoXRequiresChkX,
    #[error("mdcfg_fmt == 0 requires md_entry_num == 0")]
    MdEntryNumMustBeZero,
    #[error("srcmd_fmt == 1 requires rrid_num == md_num")]
    ExclusiveFormatMismatch,
    #[error("srcmd_fmt == 2 supports at most 32 rrids, got {0}")]
    TooManyRridsForMdIndexed(u16),
    #[error("imp_rridscp requires stall_en")]
    RridscpRequiresStall,
    #[error("entryoffset must sit beyond the SRCMD table")]
    EntryOffsetOverlapsSrcmd,
}

/// Outcome of a write through [`crate::mem::MemoryPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bus error at address {addr:#x}")]
pub struct BusError {
    pub addr: u64,
}
