pub const MAGIC: u32 = 0x426F746C; // "Botl" in ASCII
pub const VERSION: u32 = 1;

pub const BLOCK_SIZE: usize = 512;
pub const SUPERBLOCK_ID: u32 = 0; // Block ID for the superblock
pub const FILE_TABLE_START: u32 = 1; // File table always follows the superblock
pub const MAX_BLOCKS: u32 = 32768; // Upper bound on volume size, 16 MiB

pub const MAX_FILES: u32 = 128; // Default file table capacity
pub const MAX_NAME_LEN: usize = 32; // Stored identity length, null padded
pub const ENTRY_SIZE: usize = 44; // name + size + start + used + dir + reserved
pub const NO_BLOCK: u32 = 0xFFFF_FFFF; // On-disk sentinel for "no blocks allocated"

pub const ROOT_DIR: &str = "/";
pub const SEPARATOR: char = '/';
pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";

/// Number of blocks needed to hold `bytes`.
pub const fn blocks_for(bytes: usize) -> usize {
    (bytes + BLOCK_SIZE - 1) / BLOCK_SIZE
}

/// Options applied when a blank device is formatted.
/// A volume that is already formatted keeps the geometry in its superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Number of slots in the file table.
    pub capacity: u32,
    /// Volume size cap in blocks; the device size is used when smaller.
    pub max_blocks: u32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            capacity: MAX_FILES,
            max_blocks: MAX_BLOCKS,
        }
    }
}
