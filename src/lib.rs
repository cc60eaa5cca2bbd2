//! flatfs is a small user-space filesystem with a flat, fixed-size block
//! table per file, mounted through `FUSE` from an image file.
//!
//! On-image layout:
//! - Superblock (block 0)
//! - Inode region (serialized namespace records)
//! - Data blocks
//!
//! Layers, bottom to top:
//! 1. Block store: abstraction over the backing device.        | `device`
//! 2. Superblock / allocation bookkeeping.                     | `fs`
//! 3. Dentry namespace + path resolver.                        | `fs`
//! 4. Byte-range I/O engine over per-file block tables.        | `fs`
//! 5. Path-based operation surface (`FilesystemOps`).          | `fs`
//! 6. FUSE bridge translating kernel requests onto layer 5.    | `fs`
pub mod cli_interface;
pub mod device;
mod fs;
pub mod mkfs;
pub mod mount;
pub mod utils;
pub use fs::*;
