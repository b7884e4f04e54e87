#![no_std]
//! A read-only reader for the FAT family of filesystems (FAT12, FAT16, FAT32).
//!
//! The crate is layered bottom-up: a [`byte_source::ByteSource`] supplies
//! positioned reads over whatever medium backs the volume; [`boot_sector`]
//! decodes the boot sector into a variant-independent
//! [`boot_sector::Geometry`]; [`fat`] walks the allocation table; [`cluster`]
//! turns a cluster chain into a virtual byte stream; [`dir`] decodes
//! directory records (including VFAT long file names) into [`dir::Entry`]
//! values. [`reader::Reader`] ties the stack together behind `open`/`root`.
//!
//! Variant selection is explicit — callers pick FAT12, FAT16, or FAT32 up
//! front. There is no auto-detection, no write support, and nothing is
//! cached: every read goes back to the injected byte source.

extern crate alloc;

pub mod boot_sector;
pub mod byte_source;
pub mod cluster;
pub mod dir;
pub mod fat;
pub mod reader;

pub use boot_sector::{Geometry, Variant};
pub use byte_source::ByteSource;
pub use dir::Entry;
pub use fat::FatTable;
pub use reader::Reader;

use core::fmt;

/// 32-byte raw directory record size, common to every FAT variant.
pub const DIRENT_SIZE: usize = 32;

/// Attribute bits of `DOSPerms` / `DIR_Attr`.
pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
/// `DOSPerms == 0x0F` marks an LFN slot overlaying the same 32 bytes.
pub const ATTR_LONG_NAME: u8 = 0x0F;

/// Marks a deleted short-name record, or a stray LFN slot.
pub const DIR_ENTRY_UNUSED: u8 = 0xE5;
/// Bit of an LFN `SeqNumber` marking the physically-last slot.
pub const LAST_LONG_ENTRY: u8 = 0x40;

/// Every error this crate can report. Generic over the byte source's own
/// error type, which is carried verbatim in [`Error::Io`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Boot sector signature mismatch, or impossible geometry at mount time.
    BadBootSector,
    /// A FAT entry was requested past the end of the table.
    FatIndexOutOfBounds,
    /// Chain iteration exceeded the safety cap; the volume likely has a cycle.
    ChainTooLong,
    /// `read` was called on a directory entry.
    NotAFile,
    /// Child iteration was requested on a file entry.
    NotADirectory,
    /// The underlying byte source returned fewer bytes than requested.
    Truncated,
    /// The underlying byte source failed.
    Io(E),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadBootSector => {
                write!(f, "boot sector is malformed or has impossible geometry")
            }
            Error::FatIndexOutOfBounds => write!(f, "FAT entry index is out of bounds"),
            Error::ChainTooLong => {
                write!(f, "cluster chain exceeded the safety cap (suspected cycle)")
            }
            Error::NotAFile => write!(f, "entry is a directory, not a file"),
            Error::NotADirectory => write!(f, "entry is a file, not a directory"),
            Error::Truncated => write!(f, "underlying byte source returned a short read"),
            Error::Io(e) => write!(f, "byte source error: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

pub(crate) fn read_le_u16(input: &[u8]) -> u16 {
    u16::from_le_bytes([input[0], input[1]])
}

pub(crate) fn read_le_u32(input: &[u8]) -> u32 {
    u32::from_le_bytes([input[0], input[1], input[2], input[3]])
}
