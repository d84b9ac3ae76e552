//! Vial is a tiny flat-table file system for bare-metal kernels.
//! No permissions, timestamps, journaling, or appends: every write replaces a
//! file's whole contents with one contiguous run of blocks.
//!
//! Vial's linear layout (512-byte blocks):
//! - Block 0: Superblock
//! - File Table: fixed number of 44-byte entries, starting at block 1
//! - Data Blocks: one contiguous run per file
//!
//! Vial's layers (from bottom to top):
//! 1. Block Device: synchronous sector I/O.              | User implemented, or RamDisk / AtaPio
//! 2. Superblock: formatting, loading and syncing the metadata.
//! 3. File Table / Path: flattened identities, directories emulated by prefixes.
//! 4. Allocator: first-fit contiguous runs derived from the table.
//! 5. FileSystem: the public operations, one handle per volume.
//!
//! Directories are emulated: `docs/note.txt` is a single entry whose identity
//! happens to start with the directory entry `docs`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod block_dev;
mod ram_disk;
pub mod ata;
mod structs;
mod superblock;
mod table;
mod path;
mod allocator;
mod fs;
mod error;

pub use block_dev::{BlockDevice, Sector};
pub use ram_disk::RamDisk;
pub use config::*;
pub use structs::*;
pub use superblock::*;
pub use table::FileTable;
pub use path::{child_name, leaf, parent, resolve};
pub use allocator::{allocate, free_blocks};
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
