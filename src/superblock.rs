//! On-disk metadata: superblock at block 0 followed by the file table.

use alloc::vec;

use log::{debug, info, warn};

use crate::block_dev::{BlockDevice, Sector};
use crate::config::*;
use crate::table::FileTable;
use crate::{Error, Result, SuperBlock};

/// Reads block 0. Returns `None` when the magic does not match, i.e. the
/// device has never been formatted.
pub fn read_superblock<D: BlockDevice + ?Sized>(device: &D) -> Result<Option<SuperBlock>> {
    let mut buf: Sector = [0; BLOCK_SIZE];
    device.read_sector(SUPERBLOCK_ID, &mut buf)?;
    let superblock: SuperBlock = unsafe {
        core::ptr::read_unaligned(buf.as_ptr() as *const SuperBlock)
    };

    if superblock.magic != MAGIC {
        return Ok(None);
    }
    superblock.validate()?;
    if superblock.total_blocks > device.num_sectors() {
        warn!(
            "fs: superblock claims {} blocks, device has {}",
            superblock.total_blocks,
            device.num_sectors()
        );
        return Err(Error::InvalidSuperBlock);
    }
    Ok(Some(superblock))
}

pub fn write_superblock<D: BlockDevice + ?Sized>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf: Sector = [0; BLOCK_SIZE];
    unsafe {
        core::ptr::write_unaligned(buf.as_mut_ptr() as *mut SuperBlock, *superblock);
    }
    device.write_sector(SUPERBLOCK_ID, &buf)
}

/// Writes a fresh superblock and zero-fills the file table region.
pub fn format<D: BlockDevice + ?Sized>(device: &D, options: &FormatOptions) -> Result<(SuperBlock, FileTable)> {
    let total_blocks = device.num_sectors().min(options.max_blocks);
    let superblock = SuperBlock::new(options.capacity, total_blocks)?;
    info!(
        "fs: formatting {} blocks, {} table slots, data at block {}",
        superblock.total_blocks, superblock.capacity, superblock.data_block
    );

    write_superblock(device, &superblock)?;
    let zero: Sector = [0; BLOCK_SIZE];
    for block in superblock.file_table_block..superblock.data_block {
        device.write_sector(block, &zero)?;
    }
    device.flush()?;

    Ok((superblock, FileTable::new(superblock.capacity)))
}

/// Reads every file table block and rebuilds `capacity` entries.
pub fn load_table<D: BlockDevice + ?Sized>(device: &D, superblock: &SuperBlock) -> Result<FileTable> {
    let table_blocks = superblock.table_blocks();
    let mut bytes = vec![0u8; table_blocks as usize * BLOCK_SIZE];
    let mut buf: Sector = [0; BLOCK_SIZE];
    for (i, chunk) in bytes.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        device.read_sector(superblock.file_table_block + i as u32, &mut buf)?;
        chunk.copy_from_slice(&buf);
    }
    let table = FileTable::from_bytes(&bytes, superblock.capacity)?;

    // Every allocated run must lie inside the data region.
    for (_, entry) in table.used() {
        let Some(start) = entry.start else { continue };
        let end = start.checked_add(entry.blocks());
        if end.is_none_or(|end| end > superblock.data_blocks()) {
            warn!("fs: entry {} runs past the data region (start {})", entry.name, start);
            return Err(Error::InvalidSuperBlock);
        }
    }
    Ok(table)
}

/// Writes the table across its reserved blocks, in order.
pub fn store_table<D: BlockDevice + ?Sized>(device: &D, superblock: &SuperBlock, table: &FileTable) -> Result<()> {
    let table_blocks = superblock.table_blocks();
    let mut bytes = vec![0u8; table_blocks as usize * BLOCK_SIZE];
    table.write_bytes(&mut bytes);
    let mut buf: Sector = [0; BLOCK_SIZE];
    for (i, chunk) in bytes.chunks_exact(BLOCK_SIZE).enumerate() {
        buf.copy_from_slice(chunk);
        device.write_sector(superblock.file_table_block + i as u32, &buf)?;
    }
    Ok(())
}

/// Persists superblock then table, then flushes the device.
/// A failed write aborts immediately; sectors already written stay written.
pub fn sync<D: BlockDevice + ?Sized>(device: &D, superblock: &SuperBlock, table: &FileTable) -> Result<()> {
    debug!("fs: sync, {} files", superblock.num_files);
    let result = write_superblock(device, superblock)
        .and_then(|_| store_table(device, superblock, table))
        .and_then(|_| device.flush());
    if let Err(e) = result {
        warn!("fs: sync failed: {}", e);
    }
    result
}
