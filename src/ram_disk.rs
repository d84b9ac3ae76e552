//! Memory-backed block device.

use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::block_dev::{BlockDevice, Sector};
use crate::{Error, Result, BLOCK_SIZE};

pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    num_sectors: u32,
}

impl RamDisk {
    /// Creates a zero-filled RamDisk with the specified number of sectors.
    pub fn new(num_sectors: u32) -> Self {
        RamDisk {
            inner: Mutex::new(vec![0u8; num_sectors as usize * BLOCK_SIZE]),
            num_sectors,
        }
    }

    /// Wraps an existing image. Trailing bytes that do not fill a sector are ignored.
    pub fn from_image(image: Vec<u8>) -> Self {
        let num_sectors = (image.len() / BLOCK_SIZE) as u32;
        RamDisk {
            inner: Mutex::new(image),
            num_sectors,
        }
    }

    /// Copies out the whole medium.
    pub fn image(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    fn range(&self, lba: u32) -> Result<core::ops::Range<usize>> {
        if lba >= self.num_sectors {
            return Err(Error::DiskIOError);
        }
        let start = lba as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for RamDisk {
    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn read_sector(&self, lba: u32, buf: &mut Sector) -> Result<()> {
        let range = self.range(lba)?;
        buf.copy_from_slice(&self.inner.lock()[range]);
        Ok(())
    }

    fn write_sector(&self, lba: u32, buf: &Sector) -> Result<()> {
        let range = self.range(lba)?;
        self.inner.lock()[range].copy_from_slice(buf);
        Ok(())
    }
}
