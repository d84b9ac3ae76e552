use crate::error::FsError;
use crate::config::BLOCK_SIZE;

/// One sector worth of bytes.
pub type Sector = [u8; BLOCK_SIZE];

/// Synchronous, single-sector storage primitive.
/// Every call blocks until the transfer has finished.
pub trait BlockDevice: Send + Sync {
    /// Returns the number of addressable sectors on the device.
    fn num_sectors(&self) -> u32;

    /// Reads the sector at `lba` into `buf`.
    fn read_sector(&self, lba: u32, buf: &mut Sector) -> Result<(), FsError>;

    /// Writes `buf` to the sector at `lba`.
    fn write_sector(&self, lba: u32, buf: &Sector) -> Result<(), FsError>;

    /// Flushes any data the device holds in volatile caches.
    fn flush(&self) -> Result<(), FsError> {
        Ok(())
    }
}
