//! Stall bitmap and the bounded in-flight transaction buffer (spec.md §3,
//! §4.6, §9). The `RRIDSCP` register's op dispatch lives in
//! [`crate::mmio::write`] since it's a thin wrapper over the same bitmap.

use crate::config::STALL_BUF_DEPTH;
use crate::srcmd::SrcmdTable;
use std::collections::VecDeque;

/// Per-RRID stall state plus the bounded FIFO of transactions parked while
/// their RRID is stalled (spec.md §3). A depth of 0 flips the policy from
/// "park" to "fault" (spec.md §9) — modeled as a capacity parameter on the
/// queue rather than a compile-time branch.
#[derive(Debug, Clone)]
pub struct StallState {
    rrid_stall: Vec<bool>,
    buf: VecDeque<()>,
    capacity: usize,
}

impl StallState {
    pub fn new(rrid_num: usize) -> Self {
        Self {
            rrid_stall: vec![false; rrid_num],
            buf: VecDeque::with_capacity(STALL_BUF_DEPTH),
            capacity: STALL_BUF_DEPTH,
        }
    }

    pub fn is_stalled(&self, rrid: usize) -> bool {
        self.rrid_stall[rrid]
    }

    pub fn set_stalled(&mut self, rrid: usize, stalled: bool) {
        self.rrid_stall[rrid] = stalled;
    }

    /// Rebuilds `rrid_stall[]` from the combined `{MDSTALLH:MDSTALL}.md`
    /// bitmap, per `srcmd_fmt` (spec.md §4.6). Grounded in
    /// `examples/original_source/iopmp_ref_model/src/iopmp_reg.c`'s
    /// `rrid_stall_update`, which ANDs (not unions) the per-RRID MD set
    /// against the stalled-MD mask — the CORE DATA MODEL section's
    /// set-notation reads `∪` but the reference implementation's actual
    /// behavior, which this crate follows, is set intersection.
    pub fn update(&mut self, srcmd: &SrcmdTable, srcmd_fmt: u8, md_num: u8, stall_by_md: u64, exempt: bool) {
        for i in 0..self.rrid_stall.len() {
            let hit = match srcmd_fmt {
                0 | 1 => srcmd
                    .mds_for_rrid(i)
                    .map(|mds| (mds & stall_by_md) != 0)
                    .unwrap_or(false),
                _ => {
                    let all_mds_mask = if md_num >= 63 { u64::MAX } else { (1u64 << md_num) - 1 };
                    (all_mds_mask & stall_by_md) != 0
                }
            };
            self.rrid_stall[i] = exempt ^ hit;
        }
    }

    /// Attempts to park a transaction. Returns `true` if it was accepted
    /// into the bounded buffer (so the caller reports
    /// `SUCCESS`-with-`rrid_stalled`), `false` if the buffer is full or has
    /// zero capacity (so the caller faults the transaction, spec.md §4.5
    /// step 2).
    pub fn try_park(&mut self) -> bool {
        if self.buf.len() < self.capacity {
            self.buf.push_back(());
            true
        } else {
            false
        }
    }

    /// Drains one parked transaction, as the host would when resuming
    /// after clearing `MDSTALL`.
    pub fn drain_one(&mut self) -> bool {
        self.buf.pop_front().is_some()
    }

    pub fn reset_buffer(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_format_stall_uses_bit_position() {
        let srcmd = SrcmdTable::new(1, 4, 4);
        let mut s = StallState::new(4);
        s.update(&srcmd, 1, 4, 0b0100, false);
        assert!(!s.is_stalled(0));
        assert!(s.is_stalled(2));
    }

    #[test]
    fn exempt_inverts_the_stall_decision() {
        let srcmd = SrcmdTable::new(1, 4, 4);
        let mut s = StallState::new(4);
        s.update(&srcmd, 1, 4, 0b0100, true);
        assert!(s.is_stalled(0));
        assert!(!s.is_stalled(2));
    }

    #[test]
    fn buffer_rejects_beyond_capacity() {
        let mut s = StallState::new(1);
        s.capacity = 2;
        assert!(s.try_park());
        assert!(s.try_park());
        assert!(!s.try_park());
    }

    #[test]
    fn zero_capacity_always_faults() {
        let mut s = StallState::new(1);
        s.capacity = 0;
        assert!(!s.try_park());
    }
}
