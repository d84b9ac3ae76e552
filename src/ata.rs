//! ATA PIO driver for a single drive on an IDE channel.
//!
//! The register protocol lives in [`AtaPio`] and talks to the hardware through
//! the [`AtaBus`] trait, so the same code drives real I/O ports (see `PortBus`
//! behind the `ata` feature) or a simulated drive.
//!
//! Transfers are one sector per command, 28-bit LBA, master drive only.
//! Status polling spins without a bound unless a poll limit is configured,
//! in which case an unresponsive drive surfaces as `DiskIOError`.

use log::warn;
use spin::Mutex;

use crate::block_dev::{BlockDevice, Sector};
use crate::{Error, Result, BLOCK_SIZE};

pub const PRIMARY_IO_BASE: u16 = 0x1F0;

// Register offsets from the channel's I/O base.
pub const REG_DATA: u16 = 0;
pub const REG_ERROR: u16 = 1;
pub const REG_SECTOR_COUNT: u16 = 2;
pub const REG_LBA_LOW: u16 = 3;
pub const REG_LBA_MID: u16 = 4;
pub const REG_LBA_HIGH: u16 = 5;
pub const REG_DRIVE_HEAD: u16 = 6;
pub const REG_STATUS: u16 = 7; // Command register when written

pub const STATUS_ERR: u8 = 0x01;
pub const STATUS_DRQ: u8 = 0x08;
pub const STATUS_DF: u8 = 0x20;
pub const STATUS_BSY: u8 = 0x80;

pub const CMD_READ_SECTORS: u8 = 0x20;
pub const CMD_WRITE_SECTORS: u8 = 0x30;
pub const CMD_CACHE_FLUSH: u8 = 0xE7;

pub const DRIVE_MASTER_LBA: u8 = 0xE0;
const WORDS_PER_SECTOR: usize = BLOCK_SIZE / 2;
const LBA28_LIMIT: u32 = 1 << 28;

/// Register-level access to one ATA channel.
pub trait AtaBus: Send {
    /// Reads the 8-bit register at `reg` (offset from the I/O base).
    fn read_reg(&mut self, reg: u16) -> u8;

    /// Writes the 8-bit register at `reg` (offset from the I/O base).
    fn write_reg(&mut self, reg: u16, value: u8);

    /// Reads one word from the data register.
    fn read_data(&mut self) -> u16;

    /// Writes one word to the data register.
    fn write_data(&mut self, word: u16);
}

pub struct AtaPio<B: AtaBus> {
    bus: Mutex<B>,
    num_sectors: u32,
    poll_limit: Option<u32>,
}

impl<B: AtaBus> AtaPio<B> {
    /// Drives `bus` as a disk of `num_sectors` sectors, waiting on the status
    /// register for as long as the drive takes.
    pub fn new(bus: B, num_sectors: u32) -> Self {
        Self {
            bus: Mutex::new(bus),
            num_sectors: num_sectors.min(LBA28_LIMIT),
            poll_limit: None,
        }
    }

    /// Gives up with `DiskIOError` after `limit` status reads in one wait.
    pub fn with_poll_limit(mut self, limit: u32) -> Self {
        self.poll_limit = Some(limit);
        self
    }

    fn poll(&self, bus: &mut B, ready: impl Fn(u8) -> bool) -> Result<u8> {
        let mut spins: u32 = 0;
        loop {
            let status = bus.read_reg(REG_STATUS);
            if ready(status) {
                return Ok(status);
            }
            if let Some(limit) = self.poll_limit {
                spins += 1;
                if spins >= limit {
                    warn!("ata: drive not ready after {} polls, status {:#04x}", spins, status);
                    return Err(Error::DiskIOError);
                }
            }
            core::hint::spin_loop();
        }
    }

    fn wait_not_busy(&self, bus: &mut B) -> Result<u8> {
        self.poll(bus, |s| s & STATUS_BSY == 0)
    }

    fn wait_data_request(&self, bus: &mut B) -> Result<()> {
        let status = self.wait_not_busy(bus)?;
        check_status(bus, status)?;
        let status = self.poll(bus, |s| s & (STATUS_DRQ | STATUS_ERR | STATUS_DF) != 0)?;
        check_status(bus, status)
    }

    /// Programs the task file for a single-sector command at `lba`.
    fn issue(&self, bus: &mut B, lba: u32, command: u8) -> Result<()> {
        if lba >= self.num_sectors {
            return Err(Error::DiskIOError);
        }
        self.wait_not_busy(bus)?;
        bus.write_reg(REG_DRIVE_HEAD, DRIVE_MASTER_LBA | ((lba >> 24) & 0x0F) as u8);
        bus.write_reg(REG_SECTOR_COUNT, 1);
        bus.write_reg(REG_LBA_LOW, lba as u8);
        bus.write_reg(REG_LBA_MID, (lba >> 8) as u8);
        bus.write_reg(REG_LBA_HIGH, (lba >> 16) as u8);
        bus.write_reg(REG_STATUS, command);
        Ok(())
    }
}

fn check_status(bus: &mut impl AtaBus, status: u8) -> Result<()> {
    if status & (STATUS_ERR | STATUS_DF) != 0 {
        let error = bus.read_reg(REG_ERROR);
        warn!("ata: command failed, status {:#04x} error {:#04x}", status, error);
        return Err(Error::DiskIOError);
    }
    Ok(())
}

impl<B: AtaBus> BlockDevice for AtaPio<B> {
    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn read_sector(&self, lba: u32, buf: &mut Sector) -> Result<()> {
        let mut bus = self.bus.lock();
        self.issue(&mut bus, lba, CMD_READ_SECTORS)?;
        self.wait_data_request(&mut bus)?;
        for word in buf.chunks_exact_mut(2) {
            word.copy_from_slice(&bus.read_data().to_le_bytes());
        }
        Ok(())
    }

    fn write_sector(&self, lba: u32, buf: &Sector) -> Result<()> {
        let mut bus = self.bus.lock();
        self.issue(&mut bus, lba, CMD_WRITE_SECTORS)?;
        self.wait_data_request(&mut bus)?;
        for word in buf.chunks_exact(2) {
            bus.write_data(u16::from_le_bytes([word[0], word[1]]));
        }
        let status = self.wait_not_busy(&mut bus)?;
        check_status(&mut *bus, status)
    }

    fn flush(&self) -> Result<()> {
        let mut bus = self.bus.lock();
        self.wait_not_busy(&mut bus)?;
        bus.write_reg(REG_DRIVE_HEAD, DRIVE_MASTER_LBA);
        bus.write_reg(REG_STATUS, CMD_CACHE_FLUSH);
        let status = self.wait_not_busy(&mut bus)?;
        check_status(&mut *bus, status)
    }
}

#[cfg(all(feature = "ata", target_arch = "x86_64"))]
pub use port_bus::PortBus;

#[cfg(all(feature = "ata", target_arch = "x86_64"))]
mod port_bus {
    use x86_64::instructions::port::Port;

    use super::{AtaBus, PRIMARY_IO_BASE, REG_DATA};

    /// Port-mapped I/O access to an ATA channel.
    pub struct PortBus {
        base: u16,
    }

    impl PortBus {
        pub const fn primary() -> Self {
            Self { base: PRIMARY_IO_BASE }
        }

        pub const fn new(base: u16) -> Self {
            Self { base }
        }
    }

    // Port I/O on the channel's registers has no memory-safety impact;
    // the kernel owns the channel exclusively.
    impl AtaBus for PortBus {
        fn read_reg(&mut self, reg: u16) -> u8 {
            let mut port = Port::<u8>::new(self.base + reg);
            unsafe { port.read() }
        }

        fn write_reg(&mut self, reg: u16, value: u8) {
            let mut port = Port::<u8>::new(self.base + reg);
            unsafe { port.write(value) }
        }

        fn read_data(&mut self) -> u16 {
            let mut port = Port::<u16>::new(self.base + REG_DATA);
            unsafe { port.read() }
        }

        fn write_data(&mut self, word: u16) {
            let mut port = Port::<u16>::new(self.base + REG_DATA);
            unsafe { port.write(word) }
        }
    }
}
