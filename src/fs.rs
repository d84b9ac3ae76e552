use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::allocator::{allocate, free_blocks};
use crate::block_dev::{BlockDevice, Sector};
use crate::config::*;
use crate::path::{child_name, leaf, parent, resolve};
use crate::superblock::{format, load_table, read_superblock, sync};
use crate::table::FileTable;
use crate::{Error, Result, SuperBlock};

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub name: String,
    pub is_dir: bool,
    pub size: u32,
}

/// Volume usage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub files: u32,
    pub capacity: u32,
    pub total_blocks: u32,
    pub data_blocks: u32,
    pub free_blocks: u32,
}

/// Metadata of a mounted volume.
#[derive(Debug)]
struct Volume {
    superblock: SuperBlock,
    table: FileTable,
}

impl Volume {
    fn sync(&self, device: &impl BlockDevice) -> Result<()> {
        sync(device, &self.superblock, &self.table)
    }

    /// Absolute sector of block `i` of a run starting at data offset `start`.
    fn data_sector(&self, start: u32, i: usize) -> Result<u32> {
        u32::try_from(i)
            .ok()
            .and_then(|i| start.checked_add(i))
            .filter(|&offset| offset < self.superblock.data_blocks())
            .and_then(|offset| self.superblock.data_block.checked_add(offset))
            .ok_or(Error::DiskIOError)
    }

    fn lookup(&self, identity: &str) -> Result<usize> {
        self.table.find(identity).ok_or(Error::NotFound)
    }

    fn create(&mut self, device: &impl BlockDevice, identity: String, is_dir: bool) -> Result<usize> {
        if self.table.find(&identity).is_some() {
            return Err(Error::AlreadyExists);
        }
        let index = self.table.free_slot().ok_or_else(|| {
            warn!("fs: file table full, cannot create {}", identity);
            Error::TableFull
        })?;
        let entry = self.table.get_mut(index).ok_or(Error::TableFull)?;
        entry.name = identity;
        entry.size = 0;
        entry.start = None;
        entry.used = true;
        entry.is_dir = is_dir;
        self.superblock.num_files += 1;
        self.sync(device)?;
        Ok(index)
    }

    /// Replaces the whole contents of slot `index` with `data`.
    /// The entry is only updated once every data block has been written.
    fn write(&mut self, device: &impl BlockDevice, index: usize, data: &[u8]) -> Result<()> {
        let size = u32::try_from(data.len()).map_err(|_| Error::NoSpace)?;
        if data.is_empty() {
            let entry = self.table.get_mut(index).ok_or(Error::NotFound)?;
            entry.size = 0;
            entry.start = None;
            return self.sync(device);
        }

        let needed = blocks_for(data.len()) as u32;
        let start = allocate(&self.table, self.superblock.data_blocks(), needed, Some(index))
            .inspect_err(|_| warn!("fs: no contiguous run of {} blocks", needed))?;

        let mut sector: Sector = [0; BLOCK_SIZE];
        for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            sector.fill(0);
            sector[..chunk.len()].copy_from_slice(chunk);
            device.write_sector(self.data_sector(start, i)?, &sector)?;
        }

        let entry = self.table.get_mut(index).ok_or(Error::NotFound)?;
        entry.size = size;
        entry.start = Some(start);
        self.sync(device)
    }

    fn read(&self, device: &impl BlockDevice, index: usize, buf: &mut [u8]) -> Result<usize> {
        let entry = self.table.get(index).ok_or(Error::NotFound)?;
        let size = entry.size as usize;
        if buf.len() < size {
            return Err(Error::BufferTooSmall);
        }
        let Some(start) = entry.start else {
            return Ok(0);
        };

        let mut sector: Sector = [0; BLOCK_SIZE];
        for (i, chunk) in buf[..size].chunks_mut(BLOCK_SIZE).enumerate() {
            device.read_sector(self.data_sector(start, i)?, &mut sector)?;
            chunk.copy_from_slice(&sector[..chunk.len()]);
        }
        Ok(size)
    }

    fn remove(&mut self, device: &impl BlockDevice, index: usize) -> Result<()> {
        let entry = self.table.get_mut(index).ok_or(Error::NotFound)?;
        debug!("fs: removing {}", entry.name);
        entry.clear();
        self.superblock.num_files = self.superblock.num_files.saturating_sub(1);
        self.sync(device)
    }
}

/// New entries may not end in `.`, `..` or an empty component.
fn check_leaf(identity: &str) -> Result<()> {
    match leaf(identity) {
        "" | DOT_NAME | DOTDOT_NAME => Err(Error::InvalidName),
        _ => Ok(()),
    }
}

/// A flat-table file system on top of a block device.
///
/// The handle starts uninitialized; every operation except [`FileSystem::init`]
/// and [`FileSystem::current_directory`] fails with `Uninitialized` until `init`
/// has succeeded. Every mutation is persisted before the call returns.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    options: FormatOptions,
    volume: Option<Volume>,
    cwd: String,
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn new(device: Arc<D>) -> Self {
        Self::with_options(device, FormatOptions::default())
    }

    /// Like [`FileSystem::new`], with the geometry used if the device needs formatting.
    pub fn with_options(device: Arc<D>, options: FormatOptions) -> Self {
        Self {
            device,
            options,
            volume: None,
            cwd: String::from(ROOT_DIR),
        }
    }

    /// Mounts the volume, formatting the device first if block 0 carries no
    /// valid magic. Fails if block 0 cannot be read.
    pub fn init(&mut self) -> Result<()> {
        let device = &*self.device;
        let volume = match read_superblock(device)? {
            Some(mut superblock) => {
                let table = load_table(device, &superblock)?;
                let used = table.used_count() as u32;
                if used != superblock.num_files {
                    warn!(
                        "fs: superblock records {} files, table holds {}",
                        superblock.num_files, used
                    );
                    superblock.num_files = used;
                }
                info!("fs: found existing filesystem, {} files", used);
                Volume { superblock, table }
            }
            None => {
                info!("fs: initializing fresh filesystem");
                let (superblock, table) = format(device, &self.options)?;
                Volume { superblock, table }
            }
        };
        self.volume = Some(volume);
        self.cwd = String::from(ROOT_DIR);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.volume.is_some()
    }

    fn volume(&self) -> Result<&Volume> {
        self.volume.as_ref().ok_or(Error::Uninitialized)
    }

    /// Resolves `name` against the current directory and finds its slot.
    fn locate(&self, name: &str) -> Result<(&Volume, usize)> {
        let volume = self.volume()?;
        let identity = resolve(name, &self.cwd)?;
        Ok((volume, volume.lookup(&identity)?))
    }

    /// Creates an empty file or directory.
    pub fn create(&mut self, name: &str, is_dir: bool) -> Result<()> {
        let volume = self.volume.as_mut().ok_or(Error::Uninitialized)?;
        let identity = resolve(name, &self.cwd)?;
        check_leaf(&identity)?;
        debug!("fs: create {} (dir: {})", identity, is_dir);
        volume.create(&*self.device, identity, is_dir)?;
        Ok(())
    }

    pub fn create_file(&mut self, name: &str) -> Result<()> {
        self.create(name, false)
    }

    pub fn create_directory(&mut self, name: &str) -> Result<()> {
        self.create(name, true)
    }

    /// Replaces the contents of `name` with `data`, creating the file if needed.
    /// Old blocks are released first, so a rewrite may land on them.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let volume = self.volume.as_mut().ok_or(Error::Uninitialized)?;
        let identity = resolve(name, &self.cwd)?;
        let index = match volume.table.find(&identity) {
            Some(index) => index,
            None => {
                check_leaf(&identity)?;
                volume.create(&*self.device, identity, false)?
            }
        };
        if volume.table.get(index).is_some_and(|e| e.is_dir) {
            return Err(Error::IsADirectory);
        }
        volume.write(&*self.device, index, data)
    }

    /// Copies the whole file into `buf` and returns the number of bytes copied.
    pub fn read(&self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let (volume, index) = self.locate(name)?;
        volume.read(&*self.device, index, buf)
    }

    pub fn read_to_vec(&self, name: &str) -> Result<Vec<u8>> {
        let (volume, index) = self.locate(name)?;
        let size = volume.table.get(index).map_or(0, |e| e.size as usize);
        let mut buf = vec![0u8; size];
        let len = volume.read(&*self.device, index, &mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Removes any entry, file or directory, without looking at its children.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let volume = self.volume.as_mut().ok_or(Error::Uninitialized)?;
        let identity = resolve(name, &self.cwd)?;
        let index = volume.lookup(&identity)?;
        volume.remove(&*self.device, index)
    }

    /// Removes an empty directory.
    pub fn delete_directory(&mut self, name: &str) -> Result<()> {
        let volume = self.volume.as_mut().ok_or(Error::Uninitialized)?;
        let identity = resolve(name, &self.cwd)?;
        let index = volume.lookup(&identity)?;
        if !volume.table.get(index).is_some_and(|e| e.is_dir) {
            return Err(Error::NotADirectory);
        }
        if volume.table.has_children(&identity) {
            return Err(Error::NotEmpty);
        }
        volume.remove(&*self.device, index)
    }

    pub fn is_directory(&self, name: &str) -> Result<bool> {
        let (volume, index) = self.locate(name)?;
        Ok(volume.table.get(index).is_some_and(|e| e.is_dir))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        match self.locate(name) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Size in bytes of the file's contents.
    pub fn size_of(&self, name: &str) -> Result<u32> {
        let (volume, index) = self.locate(name)?;
        Ok(volume.table.get(index).map_or(0, |e| e.size))
    }

    /// Entries shown for the current directory, in table order.
    pub fn list(&self) -> Result<Vec<DirRecord>> {
        let volume = self.volume()?;
        let records = volume
            .table
            .used()
            .filter_map(|(_, e)| {
                child_name(&e.name, &self.cwd).map(|name| DirRecord {
                    name: String::from(name),
                    is_dir: e.is_dir,
                    size: e.size,
                })
            })
            .collect();
        Ok(records)
    }

    /// `.` stays put, `/` goes to root, `..` goes to the parent directory.
    /// Anything else must resolve to an existing directory.
    pub fn change_directory(&mut self, name: &str) -> Result<()> {
        self.volume()?;
        match name {
            DOT_NAME => {}
            ROOT_DIR => self.cwd = String::from(ROOT_DIR),
            DOTDOT_NAME => self.cwd = String::from(parent(&self.cwd)),
            _ => {
                let dir = {
                    let (volume, index) = self.locate(name)?;
                    let entry = volume.table.get(index).ok_or(Error::NotFound)?;
                    if !entry.is_dir {
                        return Err(Error::NotADirectory);
                    }
                    entry.name.clone()
                };
                self.cwd = dir;
            }
        }
        Ok(())
    }

    /// `/` at root, otherwise the identity of the current directory.
    pub fn current_directory(&self) -> &str {
        &self.cwd
    }

    pub fn stat(&self) -> Result<FsStats> {
        let volume = self.volume()?;
        let sb = &volume.superblock;
        Ok(FsStats {
            files: sb.num_files,
            capacity: sb.capacity,
            total_blocks: sb.total_blocks,
            data_blocks: sb.data_blocks(),
            free_blocks: free_blocks(&volume.table, sb.data_blocks()),
        })
    }

    /// Writes superblock and file table back to the device.
    pub fn sync(&self) -> Result<()> {
        self.volume()?.sync(&*self.device)
    }

    pub fn superblock(&self) -> Result<&SuperBlock> {
        Ok(&self.volume()?.superblock)
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
