//! Primary error latch plus the MFR (Multi-Fault Record) subsequent-
//! violation array (spec.md §3, §4.7).

use crate::types::{ErrorType, Permission};

/// The primary error-capture record (`ERR_INFO`/`ERR_REQADDR{,H}`/
/// `ERR_REQID`) plus the MFR windows (spec.md §3). Active only when
/// `imp_error_capture == true`; callers are responsible for that gate.
#[derive(Debug, Clone)]
pub struct ErrorCapture {
    pub v: bool,
    pub ttype: u8,
    pub etype: ErrorType,
    pub msi_werr: bool,
    pub svc: bool,
    pub req_addr_shifted: u64, // addr >> 2, up to 64 bits (split into lo/hi on read)
    pub req_rrid: u16,
    pub req_eid: u16,

    svw: Vec<u16>,
    svi: usize,
}

impl ErrorCapture {
    pub fn new(num_svw: usize, imp_err_reqid_eid: bool) -> Self {
        Self {
            v: false,
            ttype: 0,
            etype: ErrorType::EntryMatch,
            msi_werr: false,
            svc: false,
            req_addr_shifted: 0,
            req_rrid: 0,
            req_eid: if imp_err_reqid_eid { 0 } else { 0xFFFF },
            svw: vec![0; num_svw],
            svi: 0,
        }
    }

    /// Latches a violation into the primary slot if free, else (when
    /// `mfr_en`) accumulates it into the MFR window for `rrid` (spec.md
    /// §4.7). Idempotent under `v == 1` without `mfr_en`, matching
    /// testable property 9 (spec.md §8).
    pub fn record_violation(
        &mut self,
        rrid: u16,
        perm: Permission,
        etype: ErrorType,
        addr: u64,
        entry_idx: Option<usize>,
        imp_err_reqid_eid: bool,
        mfr_en: bool,
    ) {
        if !self.v {
            self.v = true;
            self.ttype = perm.ttype_bits();
            self.etype = etype;
            self.msi_werr = false;
            self.req_addr_shifted = addr >> 2;
            self.req_rrid = rrid;
            self.req_eid = if imp_err_reqid_eid {
                entry_idx.map(|i| i as u16).unwrap_or(0xFFFF)
            } else {
                0xFFFF
            };
        } else if mfr_en {
            self.svc = true;
            let window = rrid as usize / 16;
            let bit = rrid % 16;
            if window < self.svw.len() {
                self.svw[window] |= 1 << bit;
            }
        }
    }

    pub fn clear_v(&mut self) {
        self.v = false;
    }

    pub fn clear_msi_werr(&mut self) {
        self.msi_werr = false;
    }

    pub fn set_svi(&mut self, svi: usize) {
        self.svi = svi % self.svw.len().max(1);
    }

    pub fn svi(&self) -> usize {
        self.svi
    }

    /// Destructive scan (spec.md §4.3): sweeps `svw[]` starting at `svi`
    /// for the first non-empty window, returns its bitmap and index, clears
    /// the source slot, and recomputes `svc`. Must not be split into a pure
    /// query (spec.md §9) — the mutation and the result are one operation.
    pub fn mfr_read(&mut self) -> Option<(u16, usize)> {
        if !self.svc {
            return None;
        }
        let n = self.svw.len();
        let mut found = None;
        for step in 0..n {
            let idx = (self.svi + step) % n;
            if self.svw[idx] != 0 {
                found = Some((self.svw[idx], idx));
                self.svw[idx] = 0;
                self.svi = idx;
                break;
            }
        }
        self.svc = self.svw.iter().any(|&w| w != 0);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_violation_latches_primary() {
        let mut ec = ErrorCapture::new(4, true);
        ec.record_violation(2, Permission::Read, ErrorType::NotHitAnyRule, 364, Some(7), true, true);
        assert!(ec.v);
        assert_eq!(ec.req_rrid, 2);
        assert_eq!(ec.req_eid, 7);
        assert_eq!(ec.req_addr_shifted, 364 >> 2);
    }

    #[test]
    fn subsequent_violation_accumulates_into_mfr_when_v_is_set() {
        let mut ec = ErrorCapture::new(4, true); // NUM_SVW=4 => 64 rrids
        ec.record_violation(2, Permission::Read, ErrorType::NotHitAnyRule, 0, None, true, true);
        ec.record_violation(4, Permission::Write, ErrorType::NotHitAnyRule, 0, None, true, true);
        ec.record_violation(6, Permission::Write, ErrorType::NotHitAnyRule, 0, None, true, true);
        assert!(ec.svc);
        let (bitmap, window) = ec.mfr_read().unwrap();
        assert_eq!(window, 0);
        assert_eq!(bitmap, (1 << 4) | (1 << 6));
    }

    #[test]
    fn mfr_read_is_destructive_scenario_s6() {
        let mut ec = ErrorCapture::new(4, true);
        ec.record_violation(2, Permission::Read, ErrorType::NotHitAnyRule, 0, None, true, true);
        ec.record_violation(4, Permission::Write, ErrorType::NotHitAnyRule, 0, None, true, true);
        ec.record_violation(6, Permission::Write, ErrorType::NotHitAnyRule, 0, None, true, true);
        ec.record_violation(20, Permission::Write, ErrorType::NotHitAnyRule, 0, None, true, true);

        let (w0, i0) = ec.mfr_read().unwrap();
        assert_eq!(i0, 0);
        assert_eq!(w0, (1 << 4) | (1 << 6));

        let (w1, i1) = ec.mfr_read().unwrap();
        assert_eq!(i1, 1);
        assert_eq!(w1, 1 << (20 - 16));

        assert!(ec.mfr_read().is_none());
        assert!(!ec.svc);
    }

    #[test]
    fn no_primary_capture_once_v_is_set_without_mfr() {
        let mut ec = ErrorCapture::new(4, true);
        ec.record_violation(2, Permission::Read, ErrorType::NotHitAnyRule, 100, None, true, false);
        ec.record_violation(5, Permission::Write, ErrorType::NotHitAnyRule, 200, None, true, false);
        assert_eq!(ec.req_rrid, 2);
        assert!(!ec.svc);
    }
}
