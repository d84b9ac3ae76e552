//! Contiguous first-fit block allocation.
//! Occupancy is derived from the file table on every call; there is no free bitmap.

use log::debug;

use crate::table::FileTable;
use crate::{Error, Result};

/// Finds the lowest offset in `[0, data_blocks)` where `needed` blocks fit
/// without touching any used entry's range. The slot `exclude` is treated as
/// free so a file being overwritten can reuse its own blocks.
/// Returns the start offset relative to the data region.
pub fn allocate(
    table: &FileTable,
    data_blocks: u32,
    needed: u32,
    exclude: Option<usize>,
) -> Result<u32> {
    if needed == 0 || needed > data_blocks {
        return Err(Error::NoSpace);
    }

    let mut start = 0;
    'candidate: while start <= data_blocks - needed {
        let end = start + needed;
        for extent in table.extents(exclude) {
            if start < extent.end && extent.start < end {
                // Any start before this extent's end would overlap it as well.
                start = extent.end;
                continue 'candidate;
            }
        }
        debug!("alloc: {} blocks at data offset {}", needed, start);
        return Ok(start);
    }

    Err(Error::NoSpace)
}

/// Blocks of the data region not covered by any used entry.
pub fn free_blocks(table: &FileTable, data_blocks: u32) -> u32 {
    let used: u32 = table.extents(None).map(|e| e.end - e.start).sum();
    data_blocks.saturating_sub(used)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(extents: &[(u32, u32)]) -> FileTable {
        let mut table = FileTable::new(8);
        for (i, &(start, size)) in extents.iter().enumerate() {
            let entry = table.get_mut(i).unwrap();
            entry.name = format!("f{}", i);
            entry.used = true;
            entry.start = Some(start);
            entry.size = size;
        }
        table
    }

    #[test]
    fn first_fit_lowest_offset() {
        let table = FileTable::new(8);
        assert_eq!(allocate(&table, 10, 3, None), Ok(0));

        // [0,2) and [4,5) used: a 2-block run fits at 2, a 3-block run at 5.
        let table = table_with(&[(0, 1024), (4, 512)]);
        assert_eq!(allocate(&table, 10, 2, None), Ok(2));
        assert_eq!(allocate(&table, 10, 3, None), Ok(5));
        assert_eq!(allocate(&table, 10, 6, None), Err(Error::NoSpace));
        assert_eq!(free_blocks(&table, 10), 7);
    }

    #[test]
    fn excluded_slot_is_reusable() {
        let table = table_with(&[(0, 2048)]);
        assert_eq!(allocate(&table, 4, 4, None), Err(Error::NoSpace));
        assert_eq!(allocate(&table, 4, 4, Some(0)), Ok(0));
    }

    #[test]
    fn zero_or_oversized_requests() {
        let table = FileTable::new(1);
        assert_eq!(allocate(&table, 4, 0, None), Err(Error::NoSpace));
        assert_eq!(allocate(&table, 4, 5, None), Err(Error::NoSpace));
        assert_eq!(allocate(&table, 4, 4, None), Ok(0));
    }
}
