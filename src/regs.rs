//! Bit-packed register definitions (spec.md §6), in the teacher's idiom:
//! `tock_registers::register_bitfields!` field layouts, but over
//! `InMemoryRegister` storage rather than a raw MMIO pointer, because this
//! crate itself *is* the peripheral rather than a driver mapping one
//! (SPEC_FULL.md §3). The "raw word" reads used to assemble `ERR_MFR`
//! preserve the exact bit layout specified here (spec.md §9).

use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

register_bitfields! [u32,
    pub VERSION [
        SPECVER OFFSET(24) NUMBITS(8) [],
        VENDOR OFFSET(0) NUMBITS(24) [],
    ],
    pub HWCFG0 [
        ENABLE OFFSET(0) NUMBITS(1) [],
        HWCFG2_EN OFFSET(1) NUMBITS(1) [],
        HWCFG3_EN OFFSET(2) NUMBITS(1) [],
        MD_NUM OFFSET(24) NUMBITS(6) [],
        ADDRH_EN OFFSET(30) NUMBITS(1) [],
        TOR_EN OFFSET(31) NUMBITS(1) [],
    ],
    pub HWCFG1 [
        RRID_NUM OFFSET(0) NUMBITS(16) [],
        ENTRY_NUM OFFSET(16) NUMBITS(16) [],
    ],
    pub HWCFG2 [
        PRIO_ENTRY OFFSET(0) NUMBITS(16) [],
        PRIO_ENT_PROG OFFSET(16) NUMBITS(1) [],
        NON_PRIO_EN OFFSET(17) NUMBITS(1) [],
        CHK_X OFFSET(26) NUMBITS(1) [],
        PEIS OFFSET(27) NUMBITS(1) [],
        PEES OFFSET(28) NUMBITS(1) [],
        SPS_EN OFFSET(29) NUMBITS(1) [],
        STALL_EN OFFSET(30) NUMBITS(1) [],
        MFR_EN OFFSET(31) NUMBITS(1) [],
    ],
    pub HWCFG3 [
        MDCFG_FMT OFFSET(0) NUMBITS(2) [],
        SRCMD_FMT OFFSET(2) NUMBITS(2) [],
        MD_ENTRY_NUM OFFSET(4) NUMBITS(8) [],
        NO_X OFFSET(12) NUMBITS(1) [],
        NO_W OFFSET(13) NUMBITS(1) [],
        RRID_TRANSL_EN OFFSET(14) NUMBITS(1) [],
        RRID_TRANSL_PROG OFFSET(15) NUMBITS(1) [],
        RRID_TRANSL OFFSET(16) NUMBITS(16) [],
    ],
    pub MDSTALL [
        EXEMPT OFFSET(0) NUMBITS(1) [],
        MD OFFSET(1) NUMBITS(31) [],
    ],
    pub RRIDSCP [
        RRID OFFSET(0) NUMBITS(16) [],
        OP_STAT OFFSET(30) NUMBITS(2) [],
    ],
    pub MDLCK [
        L OFFSET(0) NUMBITS(1) [],
        MD OFFSET(1) NUMBITS(31) [],
    ],
    pub MDCFGLCK [
        L OFFSET(0) NUMBITS(1) [],
        F OFFSET(1) NUMBITS(7) [],
    ],
    pub ENTRYLCK [
        L OFFSET(0) NUMBITS(1) [],
        F OFFSET(1) NUMBITS(16) [],
    ],
    pub ERR_CFG [
        L OFFSET(0) NUMBITS(1) [],
        IE OFFSET(1) NUMBITS(1) [],
        RS OFFSET(2) NUMBITS(1) [],
        MSI_EN OFFSET(3) NUMBITS(1) [],
        STALL_VIOLATION_EN OFFSET(4) NUMBITS(1) [],
        MSIDATA OFFSET(8) NUMBITS(11) [],
    ],
    pub ERR_INFO [
        V OFFSET(0) NUMBITS(1) [],
        TTYPE OFFSET(1) NUMBITS(2) [],
        MSI_WERR OFFSET(3) NUMBITS(1) [],
        ETYPE OFFSET(4) NUMBITS(4) [],
        SVC OFFSET(8) NUMBITS(1) [],
    ],
    pub ERR_REQID [
        RRID OFFSET(0) NUMBITS(16) [],
        EID OFFSET(16) NUMBITS(16) [],
    ],
    pub ERR_MFR [
        SVW OFFSET(0) NUMBITS(16) [],
        SVI OFFSET(16) NUMBITS(12) [],
        SVS OFFSET(31) NUMBITS(1) [],
    ],
    pub MDCFG [
        T OFFSET(0) NUMBITS(16) [],
    ],
    pub SRCMD_EN [
        L OFFSET(0) NUMBITS(1) [],
        MD OFFSET(1) NUMBITS(31) [],
    ],
    pub SRCMD_PERM [
        // two permission bits (R, W) per rrid bit-position, packed 16-wide.
        PERM OFFSET(0) NUMBITS(32) [],
    ],
    pub ENTRY_ADDR [
        ADDR OFFSET(0) NUMBITS(32) [],
    ],
    pub ENTRY_CFG [
        R OFFSET(0) NUMBITS(1) [],
        W OFFSET(1) NUMBITS(1) [],
        X OFFSET(2) NUMBITS(1) [],
        A OFFSET(3) NUMBITS(2) [
            Off = 0,
            Tor = 1,
            Na4 = 2,
            Napot = 3,
        ],
        SIRE OFFSET(5) NUMBITS(1) [],
        SIWE OFFSET(6) NUMBITS(1) [],
        SIXE OFFSET(7) NUMBITS(1) [],
        SERE OFFSET(8) NUMBITS(1) [],
        SEWE OFFSET(9) NUMBITS(1) [],
        SEXE OFFSET(10) NUMBITS(1) [],
    ],
];

/// Address-matching mode, decoded from `ENTRY_CFG.A` (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Off,
    Tor,
    Na4,
    Napot,
}

impl AddrMode {
    pub fn from_bits(bits: u32) -> AddrMode {
        match bits & 0b11 {
            0 => AddrMode::Off,
            1 => AddrMode::Tor,
            2 => AddrMode::Na4,
            _ => AddrMode::Napot,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            AddrMode::Off => 0,
            AddrMode::Tor => 1,
            AddrMode::Na4 => 2,
            AddrMode::Napot => 3,
        }
    }
}

/// Owned local mirror of a hardware register: behaves like
/// `tock_registers`' MMIO wrappers (`get`/`set`/`modify`/`is_set`) without
/// pointing at real memory, since the IOPMP instance itself holds the
/// state that a real peripheral would expose over MMIO.
pub type Reg<R> = InMemoryRegister<u32, R>;

pub(crate) fn reg<R: tock_registers::RegisterLongName>() -> Reg<R> {
    InMemoryRegister::new(0)
}
