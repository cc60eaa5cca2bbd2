//! create a flatfs image
use std::path::Path;

use anyhow::anyhow;
use byte_unit::{Byte, ByteUnit};

use crate::device::ImageStore;
use crate::utils::layout;
use crate::Volume;

/// Create a new filesystem image, given the image path, its size, the
/// inode budget and the block size.
///
/// The image holds the superblock, an inode region sized from the inode
/// budget, and the data region; `size` must cover all three with at least
/// one data block.
pub fn mkfs<P>(
    image_file_path: P,
    file_size: u64,
    inode_count: u64,
    block_size: u32,
) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    if block_size < 512 || !block_size.is_power_of_two() {
        return Err(anyhow!(
            "block size must be a power of two of at least 512, not {block_size}"
        ));
    }
    if inode_count == 0 {
        return Err(anyhow!("inode count must be at least 1"));
    }

    let space_needed = layout::min_image_bytes(inode_count, block_size);
    if file_size < space_needed {
        return Err(anyhow!(format!(
            "File size must be at least {} for block size {} and inode count {}",
            Byte::from_bytes(space_needed as _).get_appropriate_unit(true),
            Byte::from_bytes(block_size as _).get_adjusted_unit(ByteUnit::B),
            inode_count
        )));
    }

    // use the `users` crate to report this program's uid and gid as the
    // volume owner
    let uid = users::get_effective_uid();
    let gid = users::get_effective_gid();

    let store = ImageStore::create(image_file_path, file_size, block_size)?;
    Volume::format(store, inode_count, uid, gid)?;
    Ok(())
}
