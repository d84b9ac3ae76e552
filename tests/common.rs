//! Common utilities for tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use vial::{BlockDevice, Error, FileSystem, FormatOptions, RamDisk, Result, Sector};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Formats a fresh RamDisk of `num_sectors` sectors.
/// The disk is returned alongside so tests can remount or inspect it.
pub fn fresh_fs(num_sectors: u32) -> (Arc<RamDisk>, FileSystem<RamDisk>) {
    fresh_fs_with(num_sectors, FormatOptions::default())
}

pub fn fresh_fs_with(num_sectors: u32, options: FormatOptions) -> (Arc<RamDisk>, FileSystem<RamDisk>) {
    let disk = Arc::new(RamDisk::new(num_sectors));
    let mut fs = FileSystem::with_options(Arc::clone(&disk), options);
    fs.init().unwrap();
    (disk, fs)
}

/// RamDisk that starts failing writes once its budget is spent.
pub struct FlakyDisk {
    inner: RamDisk,
    writes_left: AtomicU32,
    writes: AtomicU32,
}

impl FlakyDisk {
    pub fn new(num_sectors: u32) -> Self {
        Self {
            inner: RamDisk::new(num_sectors),
            writes_left: AtomicU32::new(u32::MAX),
            writes: AtomicU32::new(0),
        }
    }

    /// Allows `n` more successful writes, then fails every write.
    pub fn fail_after(&self, n: u32) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.writes_left.store(u32::MAX, Ordering::SeqCst);
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw_sector(&self, lba: u32) -> Sector {
        let mut buf = [0u8; vial::BLOCK_SIZE];
        self.inner.read_sector(lba, &mut buf).unwrap();
        buf
    }
}

impl BlockDevice for FlakyDisk {
    fn num_sectors(&self) -> u32 {
        self.inner.num_sectors()
    }

    fn read_sector(&self, lba: u32, buf: &mut Sector) -> Result<()> {
        self.inner.read_sector(lba, buf)
    }

    fn write_sector(&self, lba: u32, buf: &Sector) -> Result<()> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(Error::DiskIOError);
        }
        if left != u32::MAX {
            self.writes_left.store(left - 1, Ordering::SeqCst);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_sector(lba, buf)
    }
}
