//! The entry table and the NA4/NAPOT/TOR/OFF address-matching and
//! permission decoder (spec.md §3, §4.4).

use crate::regs::AddrMode;
use crate::types::Permission;

/// How much of a transaction's address range an entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchExtent {
    None,
    Partial,
    Full,
}

/// One 16-byte record of the entry table (spec.md §3): `{ADDR, ADDRH, CFG,
/// USER_CFG}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entry {
    pub addr: u32,
    pub addrh: u32,
    pub r: bool,
    pub w: bool,
    pub x: bool,
    pub a: RawAddrMode,
    pub sire: bool,
    pub siwe: bool,
    pub sixe: bool,
    pub sere: bool,
    pub sewe: bool,
    pub sexe: bool,
    pub user_cfg: u32,
}

/// `Entry::a` stored as raw bits so `Default` is trivial; converted to
/// [`AddrMode`] at decode time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawAddrMode(pub u32);

impl RawAddrMode {
    pub fn mode(self) -> AddrMode {
        AddrMode::from_bits(self.0)
    }
}

impl Entry {
    /// The byte-granular address range this entry covers, or `None` for
    /// `OFF`/malformed `NAPOT`. `prev_addr` is the physically preceding
    /// entry's raw `ADDR` field (0 for entry 0), needed for `TOR` decoding.
    fn range(&self, prev_addr_words: u64) -> Option<(u64, u64)> {
        let addr_words = ((self.addrh as u64) << 32) | self.addr as u64;
        match self.a.mode() {
            AddrMode::Off => None,
            AddrMode::Na4 => {
                let base = addr_words << 2;
                Some((base, base + 4))
            }
            AddrMode::Tor => {
                let base = prev_addr_words << 2;
                let top = addr_words << 2;
                if top < base {
                    None
                } else {
                    Some((base, top))
                }
            }
            AddrMode::Napot => {
                // The lowest zero bit of `addr_words` picks the power-of-two
                // range size; an all-ones value matches the maximal range.
                let trailing_ones = (!addr_words).trailing_zeros();
                if trailing_ones >= 61 {
                    // range_words would be >= 2^62 words (>= 2^64 bytes):
                    // treat as covering the whole address space.
                    return Some((0, u64::MAX));
                }
                let range_words: u64 = 1u64 << (trailing_ones + 1);
                let base_words = addr_words & !(range_words - 1);
                let base = base_words << 2;
                let size = range_words << 2;
                Some((base, base + size))
            }
        }
    }

    /// Computes match extent against `[addr, addr + (1 << size_log2))`.
    pub fn match_extent(&self, prev_addr_words: u64, addr: u64, size_log2: u8) -> MatchExtent {
        let (start, end) = match self.range(prev_addr_words) {
            Some(r) => r,
            None => return MatchExtent::None,
        };
        let txn_len = 1u64 << size_log2;
        let txn_end = addr + txn_len;

        if txn_end <= start || addr >= end {
            MatchExtent::None
        } else if addr >= start && txn_end <= end {
            MatchExtent::Full
        } else {
            MatchExtent::Partial
        }
    }

    pub fn permission_allows(&self, perm: Permission) -> bool {
        match perm {
            Permission::Read => self.r,
            Permission::Write => self.w,
            Permission::InstrFetch => self.x,
        }
    }
}

/// The `entry_num`-long entry array placed in memory at `entryoffset`
/// (spec.md §3). Arena + index traversal per the Design Notes (spec.md §9,
/// SPEC_FULL.md §3) rather than pointer back-links, since MD ownership of
/// entries shifts whenever MDCFG is reprogrammed.
#[derive(Debug, Clone)]
pub struct EntryTable {
    entries: Vec<Entry>,
}

impl EntryTable {
    pub fn new(entry_num: usize) -> Self {
        Self {
            entries: vec![Entry::default(); entry_num],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Entry {
        &self.entries[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Entry {
        &mut self.entries[idx]
    }

    /// The combined `{ADDRH:ADDR}` word of the entry physically preceding
    /// `idx` (0 for entry 0), used for `TOR` range resolution (spec.md
    /// §4.4).
    pub fn prev_addr_words(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            let prev = &self.entries[idx - 1];
            ((prev.addrh as u64) << 32) | prev.addr as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mode: AddrMode, addr: u32, perms: (bool, bool, bool)) -> Entry {
        Entry {
            addr,
            a: RawAddrMode(mode.bits()),
            r: perms.0,
            w: perms.1,
            x: perms.2,
            ..Entry::default()
        }
    }

    #[test]
    fn na4_exact_match() {
        let e = entry(AddrMode::Na4, 90, (true, false, false));
        assert_eq!(e.match_extent(0, 90 << 2, 2), MatchExtent::Full);
    }

    #[test]
    fn na4_partial_overlap() {
        let e = entry(AddrMode::Na4, 90, (true, false, false));
        // 8-byte access starting inside the 4-byte NA4 range overlaps but
        // isn't contained.
        assert_eq!(e.match_extent(0, 90 << 2, 3), MatchExtent::Partial);
    }

    #[test]
    fn napot_full_match_s2() {
        // ADDR=90 encodes the NAPOT range [360, 368): binary ...1011010,
        // lowest zero bit at position 0 -> range size 2 words = 8 bytes.
        let e = entry(AddrMode::Napot, 90, (true, false, false));
        assert_eq!(e.match_extent(0, 360, 3), MatchExtent::Full);
    }

    #[test]
    fn tor_partial_hit_s3() {
        // Entry 1 ADDR = 368>>2, range [0, 368). An 8-byte access at 364
        // straddles the boundary.
        let e = entry(AddrMode::Tor, 368 >> 2, (true, false, false));
        assert_eq!(e.match_extent(0, 364, 3), MatchExtent::Partial);
    }

    #[test]
    fn off_never_matches() {
        let e = entry(AddrMode::Off, 1234, (true, true, true));
        assert_eq!(e.match_extent(0, 0, 0), MatchExtent::None);
    }
}
