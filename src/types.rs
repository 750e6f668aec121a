//! Shared enums and the transaction request/response shapes (spec.md §6).

use core::fmt;

/// Sentinel written to [`TransactionResponse::user`] when error-response
/// suppression downgrades a violation into a success (spec.md GLOSSARY).
pub const USER_SENTINEL: u8 = 0x80;

/// Access kind carried by a transaction, matching `ERR_INFO.ttype` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    InstrFetch,
}

impl Permission {
    pub(crate) fn ttype_bits(self) -> u8 {
        match self {
            Permission::Read => 0,
            Permission::Write => 1,
            Permission::InstrFetch => 2,
        }
    }
}

/// Coarse allow/deny outcome of a transaction check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

/// `ERR_INFO.etype` encoding (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    EntryMatch = 0,
    IllegalReadAccess = 1,
    IllegalWriteAccess = 2,
    IllegalInstrFetch = 3,
    PartialHitOnPriority = 4,
    NotHitAnyRule = 5,
    UnknownRrid = 6,
    StalledTransaction = 7,
}

impl ErrorType {
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Maps a denied-permission outcome to its `ILLEGAL_*` variant.
    pub(crate) fn illegal_for(perm: Permission) -> ErrorType {
        match perm {
            Permission::Read => ErrorType::IllegalReadAccess,
            Permission::Write => ErrorType::IllegalWriteAccess,
            Permission::InstrFetch => ErrorType::IllegalInstrFetch,
        }
    }
}

/// A transaction arriving at the check engine (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct TransactionRequest {
    pub rrid: u16,
    pub addr: u64,
    pub length: u32,
    /// log2 of the transfer size, e.g. 3 for an 8-byte access.
    pub size: u8,
    pub perm: Permission,
    pub is_amo: bool,
}

/// The check engine's verdict for a [`TransactionRequest`] (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct TransactionResponse {
    pub rrid: u16,
    pub rrid_transl: u16,
    pub status: Status,
    pub user: u8,
    pub rrid_stalled: bool,
}

/// Side-effect signal raised alongside a [`TransactionResponse`] on a
/// violation whose interrupt is not suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub rrid: u16,
    pub etype: ErrorType,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::EntryMatch => "ENTRY_MATCH",
            ErrorType::IllegalReadAccess => "ILLEGAL_READ_ACCESS",
            ErrorType::IllegalWriteAccess => "ILLEGAL_WRITE_ACCESS",
            ErrorType::IllegalInstrFetch => "ILLEGAL_INSTR_FETCH",
            ErrorType::PartialHitOnPriority => "PARTIAL_HIT_ON_PRIORITY",
            ErrorType::NotHitAnyRule => "NOT_HIT_ANY_RULE",
            ErrorType::UnknownRrid => "UNKNOWN_RRID",
            ErrorType::StalledTransaction => "STALLED_TRANSACTION",
        };
        f.write_str(name)
    }
}
