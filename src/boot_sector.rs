//! Boot Sector Parser — decodes the 512-byte boot sector of a FAT12, FAT16,
//! or FAT32 volume into a single, variant-independent [`Geometry`].
//!
//! Variant selection is explicit: the caller constructs a [`Reader`](crate::reader::Reader)
//! for a chosen [`Variant`] and this module never tries to guess. The field
//! offsets below are grounded on `original_source/signatures.py`'s
//! `(offset, size, name, unpack_str)` tuples — FAT12 and FAT16 share a
//! layout, FAT32 only differs from offset 0x24 onward.

use crate::byte_source::ByteSource;
use crate::{read_le_u16, read_le_u32, Error};

const BOOT_SECTOR_SIZE: usize = 512;
const BOOT_SIGNATURE: u16 = 0xAA55;

/// Which FAT dialect a volume is being mounted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Fat12,
    Fat16,
    Fat32,
}

impl Variant {
    /// `(MIN, MAX)` of valid in-chain FAT values; anything outside this
    /// range (including the end-of-chain and bad-cluster sentinels) is
    /// treated as "end" by [`crate::fat::FatTable`].
    pub fn entry_range(self) -> (u32, u32) {
        match self {
            Variant::Fat12 => (0x002, 0xFEF),
            Variant::Fat16 => (0x0002, 0xFFEF),
            Variant::Fat32 => (0x0000_0002, 0x0FFF_FFEF),
        }
    }

    /// Width in bytes of one on-disk FAT entry slot (FAT12 packs two
    /// entries into three bytes and is handled specially by
    /// [`crate::fat::FatTable::get`]).
    pub fn entry_width_bits(self) -> u32 {
        match self {
            Variant::Fat12 => 12,
            Variant::Fat16 => 16,
            Variant::Fat32 => 28,
        }
    }

    pub fn has_fixed_root(self) -> bool {
        !matches!(self, Variant::Fat32)
    }
}

/// Derived geometry common to all three variants, plus the fields that are
/// only meaningful for one family (see §3 of the specification this crate
/// implements).
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub variant: Variant,

    pub sector_size: u32,
    pub sectors_per_cluster: u32,
    pub cluster_size: u32,

    pub reserved_sectors: u32,
    pub fat_count: u32,
    pub sectors_per_fat: u32,
    pub fat_size: u32,
    pub fats_offset: u64,

    /// Byte offset of cluster index 2, the first data cluster.
    pub data_offset: u64,

    /// FAT12/16 only: size of the fixed root directory region.
    pub max_root_entries: u16,
    pub root_size: u32,
    pub root_dir_offset: u64,

    /// FAT32 only: starting cluster of the (chained) root directory.
    pub root_cluster: u32,
}

impl Geometry {
    /// Byte offset of the first sector of `cluster` (cluster indices 0 and
    /// 1 are reserved, so the first data cluster is 2).
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.data_offset + (cluster as u64 - 2) * self.cluster_size as u64
    }
}

fn is_power_of_two(v: u32) -> bool {
    v != 0 && v & (v - 1) == 0
}

/// Read and validate the boot sector, producing a [`Geometry`] for `variant`.
///
/// Fails with [`Error::BadBootSector`] if the `0xAA55` signature is absent,
/// `BytesPerSector`/`SectorsPerCluster` are zero or not a power of two,
/// `FATCopies == 0`, or (FAT32 only) `RootCluster < 2` or the 32-bit
/// sectors-per-FAT field is zero.
pub fn parse<S: ByteSource>(
    source: &S,
    variant: Variant,
) -> Result<Geometry, Error<S::Error>> {
    let sector = source
        .read(BOOT_SECTOR_SIZE, 0, 0)
        .map_err(Error::Io)?;

    let boot_signature = read_le_u16(&sector[0x1FE..0x200]);
    if boot_signature != BOOT_SIGNATURE {
        log::warn!("boot sector signature {boot_signature:#06x} != 0xAA55");
        return Err(Error::BadBootSector);
    }

    let sector_size = read_le_u16(&sector[0x0B..0x0D]) as u32;
    if !is_power_of_two(sector_size) {
        log::warn!("bytes-per-sector {sector_size} is not a power of two");
        return Err(Error::BadBootSector);
    }

    let sectors_per_cluster = sector[0x0D] as u32;
    if !is_power_of_two(sectors_per_cluster) {
        log::warn!("sectors-per-cluster {sectors_per_cluster} is not a power of two");
        return Err(Error::BadBootSector);
    }

    let reserved_sectors = read_le_u16(&sector[0x0E..0x10]) as u32;
    let fat_count = sector[0x10] as u32;
    if fat_count == 0 {
        log::warn!("FATCopies is zero");
        return Err(Error::BadBootSector);
    }

    let max_root_entries = read_le_u16(&sector[0x11..0x13]);
    let cluster_size = sector_size * sectors_per_cluster;
    let fats_offset = reserved_sectors as u64 * sector_size as u64;

    match variant {
        Variant::Fat12 | Variant::Fat16 => {
            let sectors_per_fat = read_le_u16(&sector[0x16..0x18]) as u32;
            let fat_size = sectors_per_fat * sector_size;
            let root_dir_offset = fats_offset + fat_count as u64 * fat_size as u64;
            let root_size = max_root_entries as u32 * crate::DIRENT_SIZE as u32;
            let data_offset = root_dir_offset + root_size as u64;

            Ok(Geometry {
                variant,
                sector_size,
                sectors_per_cluster,
                cluster_size,
                reserved_sectors,
                fat_count,
                sectors_per_fat,
                fat_size,
                fats_offset,
                data_offset,
                max_root_entries,
                root_size,
                root_dir_offset,
                root_cluster: 0,
            })
        }
        Variant::Fat32 => {
            let sectors_per_fat = read_le_u32(&sector[0x24..0x28]);
            if sectors_per_fat < 1 {
                log::warn!("FAT32 SectorsPerFAT_32 is zero");
                return Err(Error::BadBootSector);
            }
            let root_cluster = read_le_u32(&sector[0x2C..0x30]);
            if root_cluster < 2 {
                log::warn!("FAT32 RootCluster {root_cluster} < 2");
                return Err(Error::BadBootSector);
            }

            let fat_size = sectors_per_fat * sector_size;
            let data_offset = fats_offset + fat_count as u64 * fat_size as u64;

            Ok(Geometry {
                variant,
                sector_size,
                sectors_per_cluster,
                cluster_size,
                reserved_sectors,
                fat_count,
                sectors_per_fat,
                fat_size,
                fats_offset,
                data_offset,
                max_root_entries: 0,
                root_size: 0,
                root_dir_offset: 0,
                root_cluster,
            })
        }
    }
}
