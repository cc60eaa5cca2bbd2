//! sizing arithmetic for the on-image regions

use crate::INODE_SIZE;

/// bytes reserved for the inode region, one record slot per inode
pub const fn inode_region_bytes(inode_count: u64) -> u64 {
    inode_count * INODE_SIZE as u64
}

/// blocks spanned by the inode region
pub const fn inode_region_blocks(inode_count: u64, block_size: u32) -> u64 {
    let bytes = inode_region_bytes(inode_count);
    (bytes + block_size as u64 - 1) / block_size as u64
}

/// smallest image that holds a superblock, the inode region and one data
/// block
/// # Example
/// ```
/// use flatfs::utils::layout::min_image_bytes;
/// assert_eq!(min_image_bytes(16, 512), (1 + 8 + 1) * 512);
/// ```
pub const fn min_image_bytes(inode_count: u64, block_size: u32) -> u64 {
    (1 + inode_region_blocks(inode_count, block_size) + 1) * block_size as u64
}
