//! Top-level entry point: mount a volume and walk it.
//!
//! [`Reader`] owns the injected [`ByteSource`] and the [`Geometry`] decoded
//! from its boot sector at [`Reader::open`] time. It hands out a fresh
//! [`FatTable`] borrowing that source on every call rather than storing one,
//! which keeps the struct free of self-referential lifetimes.

use alloc::vec::Vec;

use crate::boot_sector::{self, Geometry, Variant};
use crate::byte_source::ByteSource;
use crate::dir::Entry;
use crate::fat::FatTable;
use crate::Error;

pub struct Reader<S> {
    source: S,
    geometry: Geometry,
}

impl<S: ByteSource> Reader<S> {
    /// Mount `source` as `variant`. Variant selection is the caller's
    /// responsibility; this never probes the image to guess.
    pub fn open(source: S, variant: Variant) -> Result<Self, Error<S::Error>> {
        let geometry = boot_sector::parse(&source, variant)?;
        log::info!(
            "mounted {:?}: {} bytes/sector, {} bytes/cluster",
            geometry.variant,
            geometry.sector_size,
            geometry.cluster_size
        );
        Ok(Self { source, geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The root directory entry. Has no name and no parent record; reading
    /// its children walks the fixed root region (FAT12/FAT16) or the root
    /// cluster chain (FAT32).
    pub fn root(&self) -> Entry {
        Entry::root(self.geometry.variant, self.geometry.root_cluster)
    }

    /// Read `size` bytes of a file entry starting at `offset`; `size == 0`
    /// reads to the end of the file.
    pub fn read(&self, entry: &Entry, offset: u64, size: usize) -> Result<Vec<u8>, Error<S::Error>> {
        let table = FatTable::new(&self.source, &self.geometry);
        entry.read(&self.source, &table, &self.geometry, offset, size)
    }

    /// List a directory entry's immediate children.
    pub fn children(&self, entry: &Entry) -> Result<Vec<Entry>, Error<S::Error>> {
        let table = FatTable::new(&self.source, &self.geometry);
        entry.iter_children(&self.source, &table, &self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::SliceSource;
    use crate::DIRENT_SIZE;
    use alloc::vec;

    fn fat16_image_with_one_file(contents: &[u8]) -> Vec<u8> {
        let sector_size = 512u16;
        let mut image = vec![0u8; 512];
        image[0x0B..0x0D].copy_from_slice(&sector_size.to_le_bytes());
        image[0x0D] = 1; // 1 sector/cluster
        image[0x0E..0x10].copy_from_slice(&1u16.to_le_bytes());
        image[0x10] = 1; // 1 FAT copy
        image[0x11..0x13].copy_from_slice(&16u16.to_le_bytes());
        image[0x16..0x18].copy_from_slice(&1u16.to_le_bytes());
        image[0x1FE..0x200].copy_from_slice(&0xAA55u16.to_le_bytes());

        let mut fat_region = vec![0u8; 512];
        fat_region[4..6].copy_from_slice(&0xFFFFu16.to_le_bytes()); // cluster 2 -> EOC
        image.extend_from_slice(&fat_region);

        let mut root = vec![0u8; 16 * DIRENT_SIZE];
        root[0..8].copy_from_slice(b"HELLO   ");
        root[8..11].copy_from_slice(b"TXT");
        root[11] = 0; // ATTR_ARCHIVE-less plain file
        root[26..28].copy_from_slice(&2u16.to_le_bytes()); // first cluster 2
        root[28..32].copy_from_slice(&(contents.len() as u32).to_le_bytes());
        image.extend_from_slice(&root);

        let mut data = contents.to_vec();
        data.resize(512, 0);
        image.extend_from_slice(&data);

        image
    }

    #[test]
    fn root_lists_single_file_and_reads_its_contents() {
        let image = fat16_image_with_one_file(b"hi there");
        let source = SliceSource::new(image);
        let reader = Reader::open(source, Variant::Fat16).unwrap();

        let root = reader.root();
        let children = reader.children(&root).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "HELLO.TXT");
        assert!(children[0].is_file());

        let contents = reader.read(&children[0], 0, 0).unwrap();
        assert_eq!(contents, b"hi there");

        let partial = reader.read(&children[0], 3, 2).unwrap();
        assert_eq!(partial, b"th");
    }

    #[test]
    fn reading_a_directory_entry_fails() {
        let image = fat16_image_with_one_file(b"x");
        let source = SliceSource::new(image);
        let reader = Reader::open(source, Variant::Fat16).unwrap();
        let root = reader.root();
        assert_eq!(reader.read(&root, 0, 0), Err(Error::NotAFile));
    }
}
