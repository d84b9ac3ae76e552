use core::mem::size_of;
use core::ops::Range;

use alloc::string::String;

use crate::config::*;
use crate::{Error, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,            // Magic number to identify the filesystem
    pub version: u32,          // On-disk format version
    pub num_files: u32,        // Number of used file table entries
    pub capacity: u32,         // Number of slots in the file table
    pub block_size: u32,       // Fixed to BLOCK_SIZE
    pub total_blocks: u32,     // Total number of blocks in the volume
    pub file_table_block: u32, // Block number where the file table starts
    pub data_block: u32,       // Block number where data blocks start

    pub reserved: [u8; 480],
}

const _: () = assert!(size_of::<SuperBlock>() == BLOCK_SIZE);

impl SuperBlock {
    /// Lays out a fresh volume of `total_blocks` blocks with `capacity` table slots.
    pub fn new(capacity: u32, total_blocks: u32) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidSuperBlock);
        }
        let table_blocks = table_blocks_for(capacity);
        let superblock = Self {
            magic: MAGIC,
            version: VERSION,
            num_files: 0,
            capacity,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            file_table_block: FILE_TABLE_START,
            data_block: FILE_TABLE_START + table_blocks,
            reserved: [0; 480],
        };
        superblock.validate()?;
        Ok(superblock)
    }

    /// Checks the layout invariants: `data_block > file_table_block >= 1`,
    /// the table fits in front of the data region, and `total_blocks > data_block`.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC || self.version != VERSION {
            return Err(Error::InvalidSuperBlock);
        }
        if self.block_size != BLOCK_SIZE as u32 || self.capacity == 0 {
            return Err(Error::InvalidSuperBlock);
        }
        if self.file_table_block < 1 {
            return Err(Error::InvalidSuperBlock);
        }
        let table_end = self
            .file_table_block
            .checked_add(self.table_blocks())
            .ok_or(Error::InvalidSuperBlock)?;
        if self.data_block < table_end || self.total_blocks <= self.data_block {
            return Err(Error::InvalidSuperBlock);
        }
        Ok(())
    }

    /// Number of blocks reserved for the file table.
    pub fn table_blocks(&self) -> u32 {
        table_blocks_for(self.capacity)
    }

    /// Number of blocks in the data region.
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks - self.data_block
    }
}

fn table_blocks_for(capacity: u32) -> u32 {
    blocks_for(capacity as usize * ENTRY_SIZE) as u32
}

/// File table record as laid out on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DiskEntry {
    pub name: [u8; MAX_NAME_LEN], // Flattened path, null padded
    pub size: u32,
    pub start_block: u32, // Relative to data_block, NO_BLOCK if unallocated
    pub used: u8,
    pub is_directory: u8,
    pub reserved: [u8; 2],
}

const _: () = assert!(size_of::<DiskEntry>() == ENTRY_SIZE);

/// In-memory view of one file table slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u32,
    /// First data block, relative to the data region.
    pub start: Option<u32>,
    pub used: bool,
    pub is_dir: bool,
}

impl FileEntry {
    /// Number of data blocks the contents occupy.
    pub fn blocks(&self) -> u32 {
        blocks_for(self.size as usize) as u32
    }

    /// Occupied block range within the data region, if any.
    pub fn extent(&self) -> Option<Range<u32>> {
        match (self.used, self.start) {
            (true, Some(start)) => Some(start..start.saturating_add(self.blocks())),
            _ => None,
        }
    }

    /// Resets the slot so a later create can reuse it.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn trim_zero(name: &[u8]) -> &[u8] {
    let end = name.iter().position(|&c| c == 0).unwrap_or(name.len());
    &name[..end]
}

/// Used records must carry a UTF-8 name; rewriting it on the next sync
/// would silently change the identity.
impl TryFrom<&DiskEntry> for FileEntry {
    type Error = Error;

    fn try_from(raw: &DiskEntry) -> Result<Self> {
        if raw.used == 0 {
            return Ok(Self::default());
        }
        let name = core::str::from_utf8(trim_zero(&raw.name)).map_err(|_| Error::InvalidSuperBlock)?;
        Ok(Self {
            name: String::from(name),
            size: raw.size,
            start: (raw.start_block != NO_BLOCK).then_some(raw.start_block),
            used: true,
            is_dir: raw.is_directory != 0,
        })
    }
}

impl From<&FileEntry> for DiskEntry {
    fn from(entry: &FileEntry) -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        let bytes = entry.name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        name[..len].copy_from_slice(&bytes[..len]);
        Self {
            name,
            size: entry.size,
            start_block: entry.start.unwrap_or(NO_BLOCK),
            used: entry.used as u8,
            is_directory: entry.is_dir as u8,
            reserved: [0; 2],
        }
    }
}
