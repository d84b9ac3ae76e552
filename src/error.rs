use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    TableFull,
    NoSpace,
    BufferTooSmall,
    InvalidName,
    InvalidSuperBlock,
    DiskIOError,
    Uninitialized,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "no such file or directory",
            FsError::AlreadyExists => "file already exists",
            FsError::NotADirectory => "not a directory",
            FsError::IsADirectory => "is a directory",
            FsError::NotEmpty => "directory not empty",
            FsError::TableFull => "file table full",
            FsError::NoSpace => "no contiguous space left on device",
            FsError::BufferTooSmall => "buffer too small",
            FsError::InvalidName => "invalid file name",
            FsError::InvalidSuperBlock => "invalid superblock",
            FsError::DiskIOError => "disk I/O error",
            FsError::Uninitialized => "file system not initialized",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
