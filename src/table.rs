//! Fixed-capacity file table.
//! Each slot is addressed by its index; lookups are linear scans over the used slots.

use core::ops::Range;

use alloc::vec;
use alloc::vec::Vec;

use crate::path::is_within;
use crate::structs::{DiskEntry, FileEntry};
use crate::{Result, ENTRY_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTable {
    entries: Vec<FileEntry>,
}

impl FileTable {
    /// Creates a table of `capacity` free slots.
    pub fn new(capacity: u32) -> Self {
        Self {
            entries: vec![FileEntry::default(); capacity as usize],
        }
    }

    /// Rebuilds exactly `capacity` entries from the flat on-disk layout.
    /// `bytes` must hold at least `capacity * ENTRY_SIZE` bytes.
    /// Fails with `InvalidSuperBlock` on a used record whose name is not UTF-8.
    pub fn from_bytes(bytes: &[u8], capacity: u32) -> Result<Self> {
        let entries = bytes
            .chunks_exact(ENTRY_SIZE)
            .take(capacity as usize)
            .map(|chunk| {
                let raw: DiskEntry = unsafe {
                    core::ptr::read_unaligned(chunk.as_ptr() as *const DiskEntry)
                };
                FileEntry::try_from(&raw)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Serializes the table into `buf`, which must hold `capacity * ENTRY_SIZE` bytes.
    pub fn write_bytes(&self, buf: &mut [u8]) {
        for (entry, chunk) in self.entries.iter().zip(buf.chunks_exact_mut(ENTRY_SIZE)) {
            let raw = DiskEntry::from(entry);
            unsafe {
                core::ptr::write_unaligned(chunk.as_mut_ptr() as *mut DiskEntry, raw);
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut FileEntry> {
        self.entries.get_mut(index)
    }

    /// Finds the used slot whose identity equals `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.used && e.name == name)
    }

    /// First slot not in use.
    pub fn free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.used)
    }

    pub fn used(&self) -> impl Iterator<Item = (usize, &FileEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.used)
    }

    pub fn used_count(&self) -> usize {
        self.entries.iter().filter(|e| e.used).count()
    }

    /// Occupied data ranges of every used entry except `exclude`.
    pub fn extents(&self, exclude: Option<usize>) -> impl Iterator<Item = Range<u32>> + '_ {
        self.used()
            .filter(move |(i, _)| Some(*i) != exclude)
            .filter_map(|(_, e)| e.extent())
    }

    /// Whether any used entry lives under directory `dir`.
    pub fn has_children(&self, dir: &str) -> bool {
        self.used().any(|(_, e)| is_within(&e.name, dir))
    }
}
