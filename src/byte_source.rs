//! The Byte Source: a positioned-read capability over whatever medium backs
//! a volume (a disk image file, a raw block device, an in-memory buffer).
//!
//! This is deliberately the one seam the core decode pipeline does not own —
//! callers inject an implementation. [`SliceSource`] covers the common case
//! of an already-loaded image; the `std` feature additionally provides
//! [`FileSource`] over a `std::fs::File`.

use alloc::vec;
use alloc::vec::Vec;

/// Positioned-read contract consumed by every layer above this one.
///
/// `read` must return exactly `size` bytes at absolute position
/// `base_ptr + rel_ptr`, or fail. Implementations must be safe to call
/// concurrently from a single thread: the position is logically
/// non-destructive, so an implementation backed by a seekable stream must
/// save and restore its own cursor around each call.
pub trait ByteSource {
    type Error;

    fn read(&self, size: usize, rel_ptr: u64, base_ptr: u64) -> Result<Vec<u8>, Self::Error>;

    /// Convenience combining [`ByteSource::read`] with little-endian `u8` decoding.
    fn unpack_u8(&self, rel_ptr: u64, base_ptr: u64) -> Result<u8, Self::Error> {
        let bytes = self.read(1, rel_ptr, base_ptr)?;
        Ok(bytes[0])
    }

    /// Convenience combining [`ByteSource::read`] with little-endian `u16` decoding.
    fn unpack_u16(&self, rel_ptr: u64, base_ptr: u64) -> Result<u16, Self::Error> {
        let bytes = self.read(2, rel_ptr, base_ptr)?;
        Ok(crate::read_le_u16(&bytes))
    }

    /// Convenience combining [`ByteSource::read`] with little-endian `u32` decoding.
    fn unpack_u32(&self, rel_ptr: u64, base_ptr: u64) -> Result<u32, Self::Error> {
        let bytes = self.read(4, rel_ptr, base_ptr)?;
        Ok(crate::read_le_u32(&bytes))
    }
}

/// An in-memory byte source, e.g. a fully loaded disk image or test fixture.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Vec<u8>,
}

/// [`SliceSource::read`] past the end of the backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange;

impl SliceSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for SliceSource {
    type Error = OutOfRange;

    fn read(&self, size: usize, rel_ptr: u64, base_ptr: u64) -> Result<Vec<u8>, Self::Error> {
        let offset = (base_ptr + rel_ptr) as usize;
        let end = offset.checked_add(size).ok_or(OutOfRange)?;
        if end > self.data.len() {
            return Err(OutOfRange);
        }
        let mut buf = vec![0u8; size];
        buf.copy_from_slice(&self.data[offset..end]);
        Ok(buf)
    }
}

#[cfg(feature = "std")]
mod file_source {
    use super::*;
    use spin::Mutex;
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};

    /// A `std::fs::File`-backed byte source.
    ///
    /// `read` is exposed as `&self` per the [`ByteSource`] contract, so the
    /// file handle (and its cursor) lives behind a [`Mutex`]; each call
    /// saves the cursor, seeks, reads, and restores the cursor, so that a
    /// single `FileSource` can be shared across concurrent readers within
    /// one thread without its positioned reads interfering with each other.
    pub struct FileSource {
        file: Mutex<File>,
    }

    impl FileSource {
        pub fn new(file: File) -> Self {
            Self {
                file: Mutex::new(file),
            }
        }

        pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
            Ok(Self::new(File::open(path)?))
        }
    }

    impl ByteSource for FileSource {
        type Error = std::io::Error;

        fn read(&self, size: usize, rel_ptr: u64, base_ptr: u64) -> Result<Vec<u8>, Self::Error> {
            let mut file = self.file.lock();
            let saved = file.stream_position()?;
            let result = (|| {
                file.seek(SeekFrom::Start(base_ptr + rel_ptr))?;
                let mut buf = vec![0u8; size];
                file.read_exact(&mut buf)?;
                Ok(buf)
            })();
            file.seek(SeekFrom::Start(saved))?;
            result
        }
    }
}

#[cfg(feature = "std")]
pub use file_source::FileSource;
