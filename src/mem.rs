//! The external memory port (spec.md §3, §5): the only side channel the
//! check engine touches, used exclusively for MSI emission.

use crate::error::BusError;

/// Synchronous read/write port into host memory. A real system wires this
/// to the bus fabric; tests wire it to [`MockMemory`].
pub trait MemoryPort {
    fn read_memory(&mut self, addr: u64, size: u8) -> Result<u64, BusError>;
    fn write_memory(&mut self, addr: u64, size: u8, data: u64) -> Result<(), BusError>;
}

/// A flat byte-addressable memory mock with one injectable fault address,
/// mirroring `examples/original_source/iopmp_ref_model/verif/test_utils.c`'s
/// `create_memory`/`read_memory`/`write_memory` plus its `bus_error` global.
pub struct MockMemory {
    bytes: Vec<u8>,
    /// Any access whose address equals this (when `Some`) returns
    /// [`BusError`], matching the original's `bus_error` sentinel address.
    pub bus_error_addr: Option<u64>,
}

impl MockMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
            bus_error_addr: None,
        }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> &[u8] {
        &self.bytes[addr as usize..addr as usize + len]
    }
}

impl MemoryPort for MockMemory {
    fn read_memory(&mut self, addr: u64, size: u8) -> Result<u64, BusError> {
        if Some(addr) == self.bus_error_addr {
            return Err(BusError { addr });
        }
        let len = size as usize;
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(&self.bytes[addr as usize..addr as usize + len]);
        Ok(u64::from_le_bytes(buf))
    }

    fn write_memory(&mut self, addr: u64, size: u8, data: u64) -> Result<(), BusError> {
        if Some(addr) == self.bus_error_addr {
            return Err(BusError { addr });
        }
        let len = size as usize;
        let buf = data.to_le_bytes();
        self.bytes[addr as usize..addr as usize + len].copy_from_slice(&buf[..len]);
        Ok(())
    }
}
