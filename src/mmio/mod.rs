//! MMIO dispatch: the register-file configuration surface (spec.md §4.2,
//! §4.3). Split from [`crate::iopmp::Iopmp`]'s core state into its own
//! module since the per-register policy table is the single largest piece
//! of this crate.

pub mod read;
pub mod write;
