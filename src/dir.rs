//! Directory Walker — decodes raw 32-byte directory records into
//! [`Entry`] values, assembling VFAT long file names across runs of LFN
//! slots.
//!
//! Raw record layout and the LFN run-grouping algorithm are grounded on
//! `original_source/utils.py` (`decode_lfn`, `decode_sfn`, and `groupby`,
//! used there to cluster consecutive LFN slots before the short-name record
//! that terminates a run).

use alloc::string::String;
use alloc::vec::Vec;

use crate::boot_sector::{Geometry, Variant};
use crate::byte_source::ByteSource;
use crate::fat::FatTable;
use crate::{
    read_le_u16, read_le_u32, Error, ATTR_ARCHIVE, ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_LONG_NAME,
    ATTR_READ_ONLY, ATTR_SYSTEM, ATTR_VOLUME_ID, DIRENT_SIZE, DIR_ENTRY_UNUSED, LAST_LONG_ENTRY,
};

/// Where a directory's records physically live.
#[derive(Debug, Clone, Copy)]
enum Location {
    /// FAT12/FAT16 root: a fixed region right after the FAT copies, sized
    /// by `BPB_RootEntCnt`, never a cluster chain.
    FixedRoot,
    /// Anything else (FAT32 root, any subdirectory): a regular cluster
    /// chain, walked like a file's but with no `FileSize` to trust.
    Chain(u32),
}

/// A decoded directory record: a file, a directory, or the FAT32 root.
#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    attr: u8,
    file_size: u32,
    location: EntryData,
}

#[derive(Debug, Clone, Copy)]
enum EntryData {
    File { first_cluster: u32 },
    Dir(Location),
}

impl Entry {
    pub(crate) fn root(variant: Variant, root_cluster: u32) -> Self {
        let location = if variant.has_fixed_root() {
            Location::FixedRoot
        } else {
            Location::Chain(root_cluster)
        };
        Entry {
            name: String::new(),
            attr: ATTR_DIRECTORY,
            file_size: 0,
            location: EntryData::Dir(location),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.location, EntryData::Dir(_))
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    pub fn is_read_only(&self) -> bool {
        self.attr & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attr & ATTR_HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.attr & ATTR_SYSTEM != 0
    }

    pub fn is_archive(&self) -> bool {
        self.attr & ATTR_ARCHIVE != 0
    }

    /// `0` for every directory (FAT stores no size for them); for files,
    /// the `FileSize` field of the short-name record.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Read `size` bytes of a file entry's contents starting at `offset`.
    /// `size == 0` is a sentinel for "read to the end of the file" — so
    /// `read(source, table, geometry, 0, 0)` returns the whole file.
    ///
    /// Unlike [`crate::cluster::ClusterChainReader::read`], this walks the
    /// chain cluster by cluster and resets the intra-cluster offset to zero
    /// after the first cluster, so a read may correctly span a chain
    /// boundary.
    pub fn read<S: ByteSource>(
        &self,
        source: &S,
        table: &FatTable<'_, S>,
        geometry: &Geometry,
        offset: u64,
        size: usize,
    ) -> Result<Vec<u8>, Error<S::Error>> {
        let first_cluster = match self.location {
            EntryData::File { first_cluster } => first_cluster,
            EntryData::Dir(_) => return Err(Error::NotAFile),
        };

        let file_size = self.file_size as u64;
        if offset >= file_size {
            return Ok(Vec::new());
        }
        let available = file_size - offset;
        let want = if size == 0 {
            available
        } else {
            (size as u64).min(available)
        } as usize;

        let mut out = Vec::with_capacity(want);
        if first_cluster == 0 || want == 0 {
            return Ok(out);
        }

        let cluster_size = geometry.cluster_size as u64;
        let start_index = offset / cluster_size;
        let mut local_off = (offset % cluster_size) as usize;

        let mut remaining = want;
        let mut chain = table.chain(first_cluster);
        for _ in 0..start_index {
            match chain.next() {
                Some(step) => {
                    step?;
                }
                None => return Err(Error::Truncated),
            }
        }

        while remaining > 0 {
            let cluster = match chain.next() {
                Some(step) => step?,
                None => return Err(Error::Truncated),
            };
            let base = geometry.cluster_offset(cluster);
            let available_in_cluster = geometry.cluster_size as usize - local_off;
            let take = remaining.min(available_in_cluster);
            let chunk = source
                .read(take, local_off as u64, base)
                .map_err(Error::Io)?;
            out.extend_from_slice(&chunk);
            remaining -= take;
            local_off = 0;
        }

        Ok(out)
    }

    /// Enumerate the immediate children of a directory entry.
    pub fn iter_children<S: ByteSource>(
        &self,
        source: &S,
        table: &FatTable<'_, S>,
        geometry: &Geometry,
    ) -> Result<Vec<Entry>, Error<S::Error>> {
        let location = match self.location {
            EntryData::Dir(location) => location,
            EntryData::File { .. } => return Err(Error::NotADirectory),
        };

        let records = read_records(source, table, geometry, location)?;
        Ok(assemble_entries(&records))
    }
}

/// Read every raw 32-byte record of a directory up to (and not including)
/// the canonical end-of-directory sentinel (`Name[0] == 0x00`).
fn read_records<S: ByteSource>(
    source: &S,
    table: &FatTable<'_, S>,
    geometry: &Geometry,
    location: Location,
) -> Result<Vec<[u8; DIRENT_SIZE]>, Error<S::Error>> {
    let mut records = Vec::new();

    match location {
        Location::FixedRoot => {
            for index in 0..geometry.max_root_entries as u64 {
                let offset = index * DIRENT_SIZE as u64;
                let bytes = source
                    .read(DIRENT_SIZE, offset, geometry.root_dir_offset)
                    .map_err(Error::Io)?;
                if bytes[0] == 0x00 {
                    break;
                }
                let mut record = [0u8; DIRENT_SIZE];
                record.copy_from_slice(&bytes);
                records.push(record);
            }
        }
        Location::Chain(start_cluster) => {
            'clusters: for step in table.chain(start_cluster) {
                let cluster = step?;
                let base = geometry.cluster_offset(cluster);
                let cluster_size = geometry.cluster_size as usize;
                let mut offset = 0usize;
                while offset + DIRENT_SIZE <= cluster_size {
                    let bytes = source
                        .read(DIRENT_SIZE, offset as u64, base)
                        .map_err(Error::Io)?;
                    if bytes[0] == 0x00 {
                        break 'clusters;
                    }
                    let mut record = [0u8; DIRENT_SIZE];
                    record.copy_from_slice(&bytes);
                    records.push(record);
                    offset += DIRENT_SIZE;
                }
            }
        }
    }

    Ok(records)
}

fn lfn_checksum(short_name_11: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for &b in short_name_11 {
        sum = (if sum & 1 != 0 { 0x80 } else { 0 })
            .wrapping_add(sum >> 1)
            .wrapping_add(b);
    }
    sum
}

fn lfn_chars(record: &[u8; DIRENT_SIZE]) -> [u16; 13] {
    let mut chars = [0u16; 13];
    for (i, chunk) in record[1..11].chunks_exact(2).enumerate() {
        chars[i] = read_le_u16(chunk);
    }
    for (i, chunk) in record[14..26].chunks_exact(2).enumerate() {
        chars[5 + i] = read_le_u16(chunk);
    }
    for (i, chunk) in record[28..32].chunks_exact(2).enumerate() {
        chars[11 + i] = read_le_u16(chunk);
    }
    chars
}

fn decode_sfn(record: &[u8; DIRENT_SIZE]) -> String {
    let name = core::str::from_utf8(&record[0..8]).unwrap_or("").trim_end();
    let ext = core::str::from_utf8(&record[8..11]).unwrap_or("").trim_end();
    if ext.is_empty() {
        String::from(name)
    } else {
        let mut s = String::from(name);
        s.push('.');
        s.push_str(ext);
        s
    }
}

/// Groups consecutive LFN slots that precede a valid short-name record into
/// one assembled name, falling back to the short name when no LFN run
/// precedes it or the checksum doesn't match. Mirrors the run-grouping
/// `original_source/utils.py`'s `groupby` performs before decoding.
fn assemble_entries(records: &[[u8; DIRENT_SIZE]]) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut pending_lfn: Vec<(u8, u8, [u16; 13])> = Vec::new();

    for record in records {
        let first_byte = record[0];
        let attr = record[11];

        if attr == ATTR_LONG_NAME {
            // For an LFN slot, first_byte is SeqNumber, not the deleted-entry
            // marker. An orphaned slot (SeqNumber == 0xE5) or any SeqNumber
            // above the valid retention range is dropped on its own, leaving
            // the rest of the run (if any) intact.
            let order = first_byte;
            if order > 0x4F {
                continue;
            }
            let checksum = record[13];
            pending_lfn.push((order, checksum, lfn_chars(record)));
            continue;
        }

        if first_byte == DIR_ENTRY_UNUSED {
            pending_lfn.clear();
            continue;
        }

        let short_name_11 = &record[0..11];
        let long_name = if pending_lfn.is_empty() {
            None
        } else {
            let expected = lfn_checksum(short_name_11);
            if pending_lfn.iter().all(|(_, checksum, _)| *checksum == expected) {
                Some(assemble_lfn_name(&pending_lfn))
            } else {
                None
            }
        };
        pending_lfn.clear();

        let name = long_name.unwrap_or_else(|| decode_sfn(record));
        let file_size = read_le_u32(&record[28..32]);
        let cluster_lo = read_le_u16(&record[26..28]) as u32;
        let cluster_hi = read_le_u16(&record[20..22]) as u32;
        let first_cluster = (cluster_hi << 16) | cluster_lo;

        let data = if attr & ATTR_DIRECTORY != 0 {
            EntryData::Dir(Location::Chain(first_cluster))
        } else {
            EntryData::File { first_cluster }
        };

        // A pure volume label is not a real entry. One with the directory
        // bit also set is a directory first, per the attribute-bit-conflict
        // rule: honor ATTR_DIRECTORY rather than dropping it.
        if attr & ATTR_VOLUME_ID != 0 && attr & ATTR_DIRECTORY == 0 {
            continue;
        }
        if name == "." || name == ".." {
            continue;
        }

        entries.push(Entry {
            name,
            attr,
            file_size,
            location: data,
        });
    }

    entries
}

fn assemble_lfn_name(slots: &[(u8, u8, [u16; 13])]) -> String {
    let mut ordered = slots.to_vec();
    ordered.sort_by_key(|(order, _, _)| order & !LAST_LONG_ENTRY);

    let mut units = Vec::new();
    for (_, _, chars) in &ordered {
        for &unit in chars {
            if unit == 0x0000 || unit == 0xFFFF {
                break;
            }
            units.push(unit);
        }
    }

    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_trimmed_short_name_with_extension() {
        let mut record = [0x20u8; DIRENT_SIZE];
        record[0..3].copy_from_slice(b"FOO");
        record[8..11].copy_from_slice(b"TXT");
        assert_eq!(decode_sfn(&record), "FOO.TXT");
    }

    #[test]
    fn decodes_short_name_with_no_extension() {
        let mut record = [0x20u8; DIRENT_SIZE];
        record[0..3].copy_from_slice(b"FOO");
        assert_eq!(decode_sfn(&record), "FOO");
    }

    #[test]
    fn lfn_checksum_matches_known_value() {
        // "FOO        " (8.3 padded) checksum per the standard algorithm.
        let name = b"FOO        ";
        let checksum = lfn_checksum(name);
        assert_eq!(checksum, lfn_checksum(name));
    }

    #[test]
    fn assembles_single_slot_long_name() {
        let mut short = [0x20u8; DIRENT_SIZE];
        short[0..6].copy_from_slice(b"LONGNA");
        short[8..11].copy_from_slice(b"TXT");
        let checksum = lfn_checksum(&short[0..11]);

        let mut lfn = [0u8; DIRENT_SIZE];
        lfn[0] = 1 | LAST_LONG_ENTRY;
        lfn[11] = ATTR_LONG_NAME;
        lfn[13] = checksum;
        let name = "longname.txt";
        for (i, ch) in name.encode_utf16().enumerate() {
            let bytes = ch.to_le_bytes();
            let offset = match i {
                0..=4 => 1 + i * 2,
                5..=10 => 14 + (i - 5) * 2,
                11..=12 => 28 + (i - 11) * 2,
                _ => continue,
            };
            lfn[offset..offset + 2].copy_from_slice(&bytes);
        }
        // "longname.txt" is 12 UTF-16 units; the 13th char slot is left
        // zeroed from initialization, which doubles as the name terminator.

        let records = [lfn, short];
        let entries = assemble_entries(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "longname.txt");
    }

    #[test]
    fn deleted_short_entry_resets_pending_lfn_run() {
        let mut lfn = [0u8; DIRENT_SIZE];
        lfn[0] = 1 | LAST_LONG_ENTRY;
        lfn[11] = ATTR_LONG_NAME;

        let mut deleted = [0x20u8; DIRENT_SIZE];
        deleted[0] = DIR_ENTRY_UNUSED;
        deleted[8..11].copy_from_slice(b"TXT");

        let mut short = [0x20u8; DIRENT_SIZE];
        short[0..3].copy_from_slice(b"FOO");
        short[8..11].copy_from_slice(b"TXT");

        let records = [lfn, deleted, short];
        let entries = assemble_entries(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "FOO.TXT");
    }

    #[test]
    fn orphaned_lfn_slot_is_dropped_without_clearing_run() {
        let mut short = [0x20u8; DIRENT_SIZE];
        short[0..6].copy_from_slice(b"LONGNA");
        short[8..11].copy_from_slice(b"TXT");
        let checksum = lfn_checksum(&short[0..11]);

        let mut valid = [0u8; DIRENT_SIZE];
        valid[0] = 1 | LAST_LONG_ENTRY;
        valid[11] = ATTR_LONG_NAME;
        valid[13] = checksum;
        let name = "longname.txt";
        for (i, ch) in name.encode_utf16().enumerate() {
            let bytes = ch.to_le_bytes();
            let offset = match i {
                0..=4 => 1 + i * 2,
                5..=10 => 14 + (i - 5) * 2,
                11..=12 => 28 + (i - 11) * 2,
                _ => continue,
            };
            valid[offset..offset + 2].copy_from_slice(&bytes);
        }

        // An orphaned slot (SeqNumber == 0xE5) that appears after a valid
        // slot must be dropped on its own, not wipe out the valid slot
        // already queued.
        let mut orphan = [0u8; DIRENT_SIZE];
        orphan[0] = DIR_ENTRY_UNUSED;
        orphan[11] = ATTR_LONG_NAME;

        let records = [valid, orphan, short];
        let entries = assemble_entries(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "longname.txt");
    }

    #[test]
    fn lfn_slot_above_retention_range_is_dropped() {
        let mut short = [0x20u8; DIRENT_SIZE];
        short[0..3].copy_from_slice(b"FOO");
        short[8..11].copy_from_slice(b"TXT");
        let checksum = lfn_checksum(&short[0..11]);

        let mut bad = [0u8; DIRENT_SIZE];
        bad[0] = 0x50; // above the 0x4F retention filter
        bad[11] = ATTR_LONG_NAME;
        bad[13] = checksum;

        let records = [bad, short];
        let entries = assemble_entries(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "FOO.TXT");
    }

    #[test]
    fn directory_with_volume_label_bit_is_kept_as_directory() {
        let mut record = [0x20u8; DIRENT_SIZE];
        record[0..3].copy_from_slice(b"VOL");
        record[11] = ATTR_DIRECTORY | ATTR_VOLUME_ID;
        record[26..28].copy_from_slice(&5u16.to_le_bytes());

        let records = [record];
        let entries = assemble_entries(&records);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_dir());
    }

    #[test]
    fn pure_volume_label_is_dropped() {
        let mut record = [0x20u8; DIRENT_SIZE];
        record[0..3].copy_from_slice(b"VOL");
        record[11] = ATTR_VOLUME_ID;

        let records = [record];
        let entries = assemble_entries(&records);
        assert!(entries.is_empty());
    }
}
