//! FAT Table — decodes individual allocation-table entries and walks
//! cluster chains.
//!
//! Only the first (primary) copy of the table is ever consulted; mirror
//! consistency is out of scope. Entry decoding is grounded on
//! `original_source/fat12.py`, `fat16.py`, and `fat32.py`'s respective
//! `_get` methods.

use crate::boot_sector::{Geometry, Variant};
use crate::byte_source::ByteSource;
use crate::Error;

/// Read access to one FAT copy: entry lookup and chain iteration.
pub struct FatTable<'s, S> {
    source: &'s S,
    variant: Variant,
    fats_offset: u64,
    /// Total entry count, derived from the table's byte size so an
    /// out-of-range index can be rejected up front.
    entry_count: u32,
}

impl<'s, S: ByteSource> FatTable<'s, S> {
    pub fn new(source: &'s S, geometry: &Geometry) -> Self {
        let entry_count = match geometry.variant {
            Variant::Fat12 => (geometry.fat_size as u64 * 2 / 3) as u32,
            Variant::Fat16 => geometry.fat_size / 2,
            Variant::Fat32 => geometry.fat_size / 4,
        };
        Self {
            source,
            variant: geometry.variant,
            fats_offset: geometry.fats_offset,
            entry_count,
        }
    }

    fn validate_index(&self, index: u32) -> Result<(), Error<S::Error>> {
        if index >= self.entry_count {
            log::warn!("FAT index {index} out of bounds ({} entries)", self.entry_count);
            return Err(Error::FatIndexOutOfBounds);
        }
        Ok(())
    }

    /// Read the raw value of entry `index`, masked to each variant's
    /// meaningful bit width (FAT32 entries carry 4 reserved high bits that
    /// must be cleared before comparing against the end-of-chain range).
    pub fn get(&self, index: u32) -> Result<u32, Error<S::Error>> {
        self.validate_index(index)?;

        match self.variant {
            Variant::Fat12 => {
                // Two 12-bit entries are packed into three bytes. Read those
                // three bytes and pick the nibble-aligned half.
                let byte_off = (index as u64 * 3) / 2;
                let bytes = self
                    .source
                    .read(2, byte_off, self.fats_offset)
                    .map_err(Error::Io)?;
                let word = u16::from_le_bytes([bytes[0], bytes[1]]);
                let value = if index % 2 == 0 {
                    word & 0x0FFF
                } else {
                    word >> 4
                };
                Ok(value as u32)
            }
            Variant::Fat16 => {
                let byte_off = index as u64 * 2;
                let value = self
                    .source
                    .unpack_u16(byte_off, self.fats_offset)
                    .map_err(Error::Io)?;
                Ok(value as u32)
            }
            Variant::Fat32 => {
                let byte_off = index as u64 * 4;
                let value = self
                    .source
                    .unpack_u32(byte_off, self.fats_offset)
                    .map_err(Error::Io)?;
                Ok(value & 0x0FFF_FFFF)
            }
        }
    }

    /// Whether `value` (as returned by [`FatTable::get`]) marks the end of a
    /// chain: a value outside the variant's valid in-chain range, which
    /// covers both the end-of-chain markers and the bad-cluster sentinel.
    pub fn is_end(&self, value: u32) -> bool {
        let (min, max) = self.variant.entry_range();
        value < min || value > max
    }

    /// Lazily walk the chain starting at `start_cluster`.
    pub fn chain(&self, start_cluster: u32) -> ChainIter<'_, 's, S> {
        ChainIter {
            table: self,
            next: Some(start_cluster),
            steps: 0,
        }
    }
}

/// Iterator over the cluster indices of a chain, in order.
///
/// Stops at the first end-of-chain marker. Yields [`Error::ChainTooLong`] if
/// the chain exceeds the table's own entry count, which can only happen if
/// the table is corrupt and the chain cycles — no legitimate chain can
/// visit more clusters than the volume has entries for.
pub struct ChainIter<'t, 's, S> {
    table: &'t FatTable<'s, S>,
    next: Option<u32>,
    steps: u32,
}

impl<'t, 's, S: ByteSource> Iterator for ChainIter<'t, 's, S> {
    type Item = Result<u32, Error<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if self.steps >= self.table.entry_count {
            self.next = None;
            return Some(Err(Error::ChainTooLong));
        }
        self.steps += 1;

        let value = match self.table.get(current) {
            Ok(v) => v,
            Err(e) => {
                self.next = None;
                return Some(Err(e));
            }
        };

        self.next = if self.table.is_end(value) {
            None
        } else {
            Some(value)
        };

        Some(Ok(current))
    }
}
