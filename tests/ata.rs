#![allow(unused)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

mod common;

use vial::ata::*;
use vial::{BlockDevice, Error, FileSystem, BLOCK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transfer {
    Idle,
    Reading,
    Writing(u32),
}

/// Register-level model of a single ATA drive.
struct DriveState {
    sectors: HashMap<u32, [u8; BLOCK_SIZE]>,
    regs: [u8; 8],
    commands: Vec<u8>,
    selects: Vec<u8>,
    busy_polls: u32, // Status reads reporting BSY after each command
    pending_busy: u32,
    status_reads: u32,
    stuck: bool,
    fault: bool,
    buffer: Vec<u8>,
    cursor: usize,
    transfer: Transfer,
}

impl DriveState {
    fn new() -> Self {
        Self {
            sectors: HashMap::new(),
            regs: [0; 8],
            commands: Vec::new(),
            selects: Vec::new(),
            busy_polls: 3,
            pending_busy: 0,
            status_reads: 0,
            stuck: false,
            fault: false,
            buffer: Vec::new(),
            cursor: 0,
            transfer: Transfer::Idle,
        }
    }

    fn lba(&self) -> u32 {
        ((self.regs[REG_DRIVE_HEAD as usize] & 0x0F) as u32) << 24
            | (self.regs[REG_LBA_HIGH as usize] as u32) << 16
            | (self.regs[REG_LBA_MID as usize] as u32) << 8
            | self.regs[REG_LBA_LOW as usize] as u32
    }
}

#[derive(Clone)]
struct SimDrive(Arc<Mutex<DriveState>>);

impl SimDrive {
    fn new() -> Self {
        SimDrive(Arc::new(Mutex::new(DriveState::new())))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DriveState> {
        self.0.lock().unwrap()
    }
}

impl AtaBus for SimDrive {
    fn read_reg(&mut self, reg: u16) -> u8 {
        let mut s = self.state();
        match reg {
            REG_STATUS => {
                s.status_reads += 1;
                if s.stuck {
                    return STATUS_BSY;
                }
                if s.pending_busy > 0 {
                    s.pending_busy -= 1;
                    return STATUS_BSY;
                }
                if s.fault {
                    return 0x40 | STATUS_ERR;
                }
                match s.transfer {
                    Transfer::Idle => 0x40,
                    _ => 0x40 | STATUS_DRQ,
                }
            }
            REG_ERROR => 0x04,
            _ => s.regs[reg as usize],
        }
    }

    fn write_reg(&mut self, reg: u16, value: u8) {
        let mut s = self.state();
        if reg != REG_STATUS {
            if reg == REG_DRIVE_HEAD {
                s.selects.push(value);
            }
            s.regs[reg as usize] = value;
            return;
        }
        s.commands.push(value);
        s.pending_busy = s.busy_polls;
        match value {
            CMD_READ_SECTORS => {
                let lba = s.lba();
                let data = s.sectors.get(&lba).copied().unwrap_or([0; BLOCK_SIZE]);
                s.buffer = data.to_vec();
                s.cursor = 0;
                s.transfer = Transfer::Reading;
            }
            CMD_WRITE_SECTORS => {
                let lba = s.lba();
                s.buffer.clear();
                s.transfer = Transfer::Writing(lba);
            }
            _ => s.transfer = Transfer::Idle,
        }
    }

    fn read_data(&mut self) -> u16 {
        let mut s = self.state();
        assert_eq!(s.transfer, Transfer::Reading);
        let at = s.cursor;
        let word = u16::from_le_bytes([s.buffer[at], s.buffer[at + 1]]);
        s.cursor += 2;
        if s.cursor == BLOCK_SIZE {
            s.transfer = Transfer::Idle;
        }
        word
    }

    fn write_data(&mut self, word: u16) {
        let mut s = self.state();
        let Transfer::Writing(lba) = s.transfer else {
            panic!("data written outside a write command");
        };
        s.buffer.extend_from_slice(&word.to_le_bytes());
        if s.buffer.len() == BLOCK_SIZE {
            let mut sector = [0u8; BLOCK_SIZE];
            sector.copy_from_slice(&s.buffer);
            s.sectors.insert(lba, sector);
            s.transfer = Transfer::Idle;
            s.pending_busy = s.busy_polls;
        }
    }
}

#[test]
fn test_sector_round_trip() {
    let drive = SimDrive::new();
    let ata = AtaPio::new(drive.clone(), 1024);
    let mut sector = [0u8; BLOCK_SIZE];
    for (i, b) in sector.iter_mut().enumerate() {
        *b = i as u8 ^ 0x5A;
    }
    ata.write_sector(7, &sector).unwrap();
    let mut back = [0u8; BLOCK_SIZE];
    ata.read_sector(7, &mut back).unwrap();
    assert_eq!(back, sector);
    assert_eq!(drive.state().commands, vec![CMD_WRITE_SECTORS, CMD_READ_SECTORS]);
    assert_eq!(drive.state().regs[REG_SECTOR_COUNT as usize], 1);
}

#[test]
fn test_lba_encoding() {
    let drive = SimDrive::new();
    let ata = AtaPio::new(drive.clone(), u32::MAX);
    assert_eq!(ata.num_sectors(), 1 << 28);
    let mut buf = [0u8; BLOCK_SIZE];
    ata.read_sector(0x0123_4567, &mut buf).unwrap();
    let s = drive.state();
    assert_eq!(s.selects, vec![DRIVE_MASTER_LBA | 0x01]);
    assert_eq!(s.regs[REG_LBA_LOW as usize], 0x67);
    assert_eq!(s.regs[REG_LBA_MID as usize], 0x45);
    assert_eq!(s.regs[REG_LBA_HIGH as usize], 0x23);
}

#[test]
fn test_out_of_range() {
    let drive = SimDrive::new();
    let ata = AtaPio::new(drive.clone(), 16);
    let mut buf = [0u8; BLOCK_SIZE];
    assert_eq!(ata.read_sector(16, &mut buf), Err(Error::DiskIOError));
    assert_eq!(ata.write_sector(1 << 28, &buf), Err(Error::DiskIOError));
    assert!(drive.state().commands.is_empty());
}

#[test]
fn test_poll_limit() {
    let drive = SimDrive::new();
    drive.state().stuck = true;
    let ata = AtaPio::new(drive.clone(), 16).with_poll_limit(50);
    let mut buf = [0u8; BLOCK_SIZE];
    assert_eq!(ata.read_sector(0, &mut buf), Err(Error::DiskIOError));
    assert_eq!(drive.state().status_reads, 50);
}

#[test]
fn test_busy_drive_is_waited_for() {
    let drive = SimDrive::new();
    drive.state().busy_polls = 1000;
    let ata = AtaPio::new(drive.clone(), 16);
    ata.write_sector(3, &[0xC3; BLOCK_SIZE]).unwrap();
    assert!(drive.state().status_reads > 2000);
    assert_eq!(drive.state().sectors[&3], [0xC3; BLOCK_SIZE]);
}

#[test]
fn test_error_status() {
    let drive = SimDrive::new();
    drive.state().fault = true;
    let ata = AtaPio::new(drive.clone(), 16);
    let mut buf = [0u8; BLOCK_SIZE];
    assert_eq!(ata.read_sector(0, &mut buf), Err(Error::DiskIOError));
    assert_eq!(ata.flush(), Err(Error::DiskIOError));
}

#[test]
fn test_flush_command() {
    let drive = SimDrive::new();
    let ata = AtaPio::new(drive.clone(), 16);
    ata.flush().unwrap();
    assert_eq!(drive.state().commands, vec![CMD_CACHE_FLUSH]);
}

#[test]
fn test_filesystem_over_ata() {
    let drive = SimDrive::new();
    let ata = Arc::new(AtaPio::new(drive.clone(), 128));
    let mut fs = FileSystem::new(Arc::clone(&ata));
    fs.init().unwrap();
    fs.create_directory("docs").unwrap();
    fs.write("/docs/readme", b"on a simulated drive").unwrap();
    drop(fs);

    let mut fs = FileSystem::new(ata);
    fs.init().unwrap();
    assert_eq!(fs.read_to_vec("/docs/readme").unwrap(), b"on a simulated drive");
    let s = drive.state();
    assert!(s.commands.contains(&CMD_CACHE_FLUSH));
    log!("{} commands issued", s.commands.len());
}
