//! Host linear-memory contract.

use anyhow::{Result, bail};

/// Typed reads and writes against the embedder's linear memory. The adapter
/// owns the endianness choice and may trap on invalid addresses; a trap is
/// an `Err` that aborts the current script invocation.
pub trait MemoryAccess {
    fn read_u8(&self, addr: u64) -> Result<u8>;
    fn read_u16(&self, addr: u64) -> Result<u16>;
    fn read_u32(&self, addr: u64) -> Result<u32>;
    fn read_u64(&self, addr: u64) -> Result<u64>;

    fn write_u8(&mut self, addr: u64, value: u8) -> Result<()>;
    fn write_u16(&mut self, addr: u64, value: u16) -> Result<()>;
    fn write_u32(&mut self, addr: u64, value: u32) -> Result<()>;
    fn write_u64(&mut self, addr: u64, value: u64) -> Result<()>;
}

/// Bounds-checked byte-buffer memory, the reference adapter used by tests
/// and benches. Endianness is fixed at construction.
#[derive(Debug, Clone)]
pub struct SliceMemory {
    bytes: Vec<u8>,
    big_endian: bool,
}

impl SliceMemory {
    pub fn little_endian(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            big_endian: false,
        }
    }

    pub fn big_endian(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            big_endian: true,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            big_endian: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn span(&self, addr: u64, len: usize) -> Result<usize> {
        let start = addr as usize;
        if addr > usize::MAX as u64 || start.checked_add(len).is_none_or(|end| end > self.bytes.len()) {
            bail!(
                "memory access out of bounds: {:#x} len {} (size {:#x})",
                addr,
                len,
                self.bytes.len()
            );
        }
        Ok(start)
    }
}

macro_rules! slice_memory_rw {
    ($read:ident, $write:ident, $t:ty) => {
        fn $read(&self, addr: u64) -> Result<$t> {
            const LEN: usize = std::mem::size_of::<$t>();
            let start = self.span(addr, LEN)?;
            let raw: [u8; LEN] = self.bytes[start..start + LEN].try_into().unwrap();
            Ok(if self.big_endian {
                <$t>::from_be_bytes(raw)
            } else {
                <$t>::from_le_bytes(raw)
            })
        }

        fn $write(&mut self, addr: u64, value: $t) -> Result<()> {
            const LEN: usize = std::mem::size_of::<$t>();
            let start = self.span(addr, LEN)?;
            let raw = if self.big_endian {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            };
            self.bytes[start..start + LEN].copy_from_slice(&raw);
            Ok(())
        }
    };
}

impl MemoryAccess for SliceMemory {
    slice_memory_rw!(read_u8, write_u8, u8);
    slice_memory_rw!(read_u16, write_u16, u16);
    slice_memory_rw!(read_u32, write_u32, u32);
    slice_memory_rw!(read_u64, write_u64, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness_is_owned_by_the_adapter() {
        let mut le = SliceMemory::little_endian(8);
        le.write_u32(0, 0x1122_3344).unwrap();
        assert_eq!(le.bytes()[..4], [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(le.read_u32(0).unwrap(), 0x1122_3344);
        assert_eq!(le.read_u16(0).unwrap(), 0x3344);

        let mut be = SliceMemory::big_endian(8);
        be.write_u32(0, 0x1122_3344).unwrap();
        assert_eq!(be.bytes()[..4], [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(be.read_u16(2).unwrap(), 0x3344);
    }

    #[test]
    fn out_of_bounds_access_traps() {
        let mut mem = SliceMemory::little_endian(4);
        assert!(mem.read_u32(0).is_ok());
        assert!(mem.read_u32(1).is_err());
        assert!(mem.read_u8(4).is_err());
        assert!(mem.write_u64(0, 1).is_err());
        assert!(mem.read_u8(u64::MAX).is_err());
    }
}
