use std::fmt;

use libc::c_int;

/// The closed set of failures a core operation can report.
///
/// Every operation returns success or exactly one of these kinds; nothing
/// panics across the operation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    IsDirectory,
    NotDirectory,
    NotEmpty,
    /// Operating on the root where that is disallowed, or a malformed name.
    Invalid,
    /// Creating an entry through something that is not a directory.
    Unsupported,
    /// Inode or block budget exhausted.
    NoSpace,
    /// Read offset past the end of the file.
    SeekBeyondEnd,
    /// Bad magic or digest while loading the superblock.
    InvalidSuperblock,
    /// The block store failed underneath us.
    Io,
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// Stable errno the FUSE bridge replies with.
    pub fn errno(self) -> c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::IsDirectory => libc::EISDIR,
            FsError::NotDirectory => libc::ENOTDIR,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::Invalid => libc::EINVAL,
            FsError::Unsupported => libc::ENXIO,
            FsError::NoSpace => libc::ENOSPC,
            FsError::SeekBeyondEnd => libc::ESPIPE,
            FsError::InvalidSuperblock => libc::EINVAL,
            FsError::Io => libc::EIO,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "no such entry",
            FsError::AlreadyExists => "entry already exists",
            FsError::IsDirectory => "is a directory",
            FsError::NotDirectory => "not a directory",
            FsError::NotEmpty => "directory not empty",
            FsError::Invalid => "invalid operation",
            FsError::Unsupported => "unsupported through this entry",
            FsError::NoSpace => "no space left in volume",
            FsError::SeekBeyondEnd => "offset past end of file",
            FsError::InvalidSuperblock => "invalid superblock",
            FsError::Io => "block store I/O error",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for FsError {}
