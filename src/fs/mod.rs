//! the flatfs core: superblock, namespace, allocation and byte-range I/O
mod alloc;
mod bridge;
mod dentry;
mod error;
mod filekind;
mod inode;
mod io;
mod ops;
mod resolver;
mod superblock;
mod volume;

pub use bridge::FuseBridge;
pub use dentry::{Dentry, DentryArena, DentryId};
pub use error::{FsError, Result};
pub use filekind::FileKind;
pub use inode::{BlockTable, Inode, InodeData};
pub use ops::{Attributes, FilesystemOps, Target};
pub use resolver::Resolution;
pub use superblock::SuperBlock;
pub use volume::Volume;

const FS_MAGIC: u32 = 0x464c_4653; // "FLFS"
/// Inode number of the root directory; matches `FUSE_ROOT_ID`.
pub const ROOT_INO: u64 = 1;
/// Fixed number of block slots in a file's block table.
pub const BLOCKS_PER_FILE: usize = 12;
/// On-image budget per namespace record.
pub const INODE_SIZE: u32 = 256;
/// Nominal on-image size of one directory entry, reported by `getattr`.
pub const DIR_ENTRY_SIZE: u64 = 64;
/// Longest accepted entry name, in bytes.
pub const MAX_NAME_LEN: usize = 60;
