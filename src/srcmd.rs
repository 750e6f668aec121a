//! The SRCMD table (spec.md §3): one of three shapes selected by
//! `srcmd_fmt`, mapping each RRID to the MDs it may consult.

/// Format-0 ("baseline") row: one per RRID, exposing `SRCMD_EN/_ENH`
/// membership plus the optional `SRCMD_R/_W` per-direction overrides
/// (`sps_en`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Fmt0Row {
    pub l: bool,
    /// MD membership bitmap, bit *i* set iff this RRID may consult MD *i*.
    pub md: u64,
    /// `SPS` read-direction override bitmap (only meaningful if `sps_en`).
    pub r: u64,
    /// `SPS` write-direction override bitmap (only meaningful if `sps_en`).
    pub w: u64,
}

/// Format-2 ("MD-indexed") slot: one per MD, holding the (R, W) permission
/// pair for every RRID bit-position up to 32.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fmt2Slot {
    /// 2 bits per RRID (R at `2*rrid`, W at `2*rrid+1`) for RRIDs 0..15.
    pub perm: u32,
    /// Same packing for RRIDs 16..31.
    pub permh: u32,
}

impl Fmt2Slot {
    fn bit_index(rrid: u16) -> (bool, u32) {
        if rrid < 16 {
            (false, (rrid as u32) * 2)
        } else {
            (true, ((rrid - 16) as u32) * 2)
        }
    }

    pub fn read_allows(&self, rrid: u16) -> bool {
        let (high, bit) = Self::bit_index(rrid);
        let word = if high { self.permh } else { self.perm };
        (word >> bit) & 1 != 0
    }

    pub fn write_allows(&self, rrid: u16) -> bool {
        let (high, bit) = Self::bit_index(rrid);
        let word = if high { self.permh } else { self.perm };
        (word >> (bit + 1)) & 1 != 0
    }
}

/// The SRCMD table, shaped by `srcmd_fmt` (spec.md §3).
#[derive(Debug, Clone)]
pub enum SrcmdTable {
    /// Format 0: `rrid_num` rows, each with membership + optional SPS.
    Baseline { rows: Vec<Fmt0Row> },
    /// Format 1: no physical table; RRID *i* is implicitly in MD *i* only.
    Exclusive,
    /// Format 2: `md_num` slots, each a permission pair per RRID.
    MdIndexed { slots: Vec<Fmt2Slot> },
}

impl SrcmdTable {
    pub fn new(srcmd_fmt: u8, rrid_num: usize, md_num: usize) -> SrcmdTable {
        match srcmd_fmt {
            0 => SrcmdTable::Baseline {
                rows: vec![Fmt0Row::default(); rrid_num],
            },
            1 => SrcmdTable::Exclusive,
            _ => SrcmdTable::MdIndexed {
                slots: vec![Fmt2Slot::default(); md_num],
            },
        }
    }

    pub fn baseline_row(&self, rrid: usize) -> Option<&Fmt0Row> {
        match self {
            SrcmdTable::Baseline { rows } => Some(&rows[rrid]),
            _ => None,
        }
    }

    pub fn baseline_row_mut(&mut self, rrid: usize) -> Option<&mut Fmt0Row> {
        match self {
            SrcmdTable::Baseline { rows } => Some(&mut rows[rrid]),
            _ => None,
        }
    }

    pub fn md_indexed_slot(&self, md: usize) -> Option<&Fmt2Slot> {
        match self {
            SrcmdTable::MdIndexed { slots } => Some(&slots[md]),
            _ => None,
        }
    }

    pub fn md_indexed_slot_mut(&mut self, md: usize) -> Option<&mut Fmt2Slot> {
        match self {
            SrcmdTable::MdIndexed { slots } => Some(&mut slots[md]),
            _ => None,
        }
    }

    /// The MD membership bitmap the check engine uses to expand an RRID
    /// into candidate MDs (spec.md §4.5 step 3), for formats 0 and 1.
    /// Format 2 has no single bitmap — see [`SrcmdTable::md_indexed_slot`].
    pub fn mds_for_rrid(&self, rrid: usize) -> Option<u64> {
        match self {
            SrcmdTable::Baseline { rows } => Some(rows[rrid].md),
            SrcmdTable::Exclusive => Some(1u64 << rrid),
            SrcmdTable::MdIndexed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_format_maps_rrid_to_itself() {
        let t = SrcmdTable::new(1, 4, 4);
        assert_eq!(t.mds_for_rrid(2), Some(1 << 2));
    }

    #[test]
    fn fmt2_slot_reads_independent_rrid_bits() {
        let mut slot = Fmt2Slot::default();
        slot.perm = 0b11 << 4; // rrid 2: R and W both set
        assert!(slot.read_allows(2));
        assert!(slot.write_allows(2));
        assert!(!slot.read_allows(1));
    }

    #[test]
    fn fmt2_slot_high_half_covers_rrid_16_to_31() {
        let mut slot = Fmt2Slot::default();
        slot.permh = 0b01; // rrid 16: R only
        assert!(slot.read_allows(16));
        assert!(!slot.write_allows(16));
    }
}
