//! A reference model of a RISC-V IOPMP (I/O Physical Memory Protection)
//! unit: a register-file configuration engine plus the transaction-check
//! engine a bus fabric consults before letting a DMA-capable initiator
//! touch memory.
//!
//! [`Iopmp::reset`] builds an instance from a [`ConfigSnapshot`];
//! [`Iopmp::mmio_read`]/[`Iopmp::mmio_write`] drive its register file;
//! [`Iopmp::check`] is the per-transaction decision function.

pub mod check;
pub mod config;
pub mod entry;
pub mod error;
pub mod error_capture;
pub mod iopmp;
pub mod mdcfg;
pub mod mem;
pub mod mmio;
pub mod regs;
pub mod srcmd;
pub mod stall;
pub mod types;

pub use config::ConfigSnapshot;
pub use error::{BusError, ResetError};
pub use iopmp::Iopmp;
pub use mem::{MemoryPort, MockMemory};
pub use types::{ErrorType, Interrupt, Permission, Status, TransactionRequest, TransactionResponse};
