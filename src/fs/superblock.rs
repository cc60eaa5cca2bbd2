use serde::{Deserialize, Serialize};

use crate::utils::{
    digest, layout,
    traits::{DigestInSelf, SerializeAndDigest},
};

use super::{FsError, Result, FS_MAGIC};

/// The superblock of a flatfs volume.
///
/// Serialized into block 0 of the image. Exactly one instance exists per
/// mounted volume, owned by [Volume](super::Volume).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SuperBlock {
    /// magic number
    pub magic: u32,
    /// data block size
    pub block_size: u32,
    /// total blocks in the backing device
    pub block_count: u64,
    /// inode budget of this volume
    pub inode_count: u64,
    pub free_inodes: u64,
    pub free_blocks: u64,
    /// running total of data bytes consumed
    pub used_bytes: u64,
    /// blocks reserved for serialized namespace records
    pub inode_region_blocks: u64,
    pub uid: libc::uid_t,
    pub gid: libc::gid_t,
    /// to verify the integrity of this superblock
    /// with a fast secure hash function, like [blake3]
    pub digest: [u8; 32],
}

impl SuperBlock {
    pub fn new(inode_count: u64, block_size: u32, block_count: u64, uid: u32, gid: u32) -> Self {
        let inode_region_blocks = layout::inode_region_blocks(inode_count, block_size);
        let data_blocks = block_count.saturating_sub(1 + inode_region_blocks);
        let mut superblock = Self {
            magic: FS_MAGIC,
            block_size,
            block_count,
            inode_count,
            free_inodes: inode_count,
            free_blocks: data_blocks,
            used_bytes: 0,
            inode_region_blocks,
            uid,
            gid,
            digest: [0u8; 32],
        };
        superblock.digest();
        superblock
    }

    /// first block of the data region
    pub fn data_region_start(&self) -> u64 {
        1 + self.inode_region_blocks
    }

    /// bytes the data region can hold
    pub fn data_capacity(&self) -> u64 {
        self.block_count.saturating_sub(self.data_region_start()) * self.block_size as u64
    }

    /// Decode the superblock at the front of a raw image, checking magic
    /// and digest. Used both by the device layer (to learn the block size
    /// before any block-granular reads) and by mount.
    pub fn probe(bytes: &[u8]) -> Result<Self> {
        let (superblock, _) =
            <SuperBlock as SerializeAndDigest>::deserialize(bytes)
                .map_err(|_| FsError::InvalidSuperblock)?;
        if superblock.magic != FS_MAGIC || superblock.block_size == 0 {
            return Err(FsError::InvalidSuperblock);
        }
        Ok(superblock)
    }
}

impl DigestInSelf for SuperBlock {
    fn digest(&mut self) {
        self.digest = [0u8; 32];
        self.digest = digest::digest(self).unwrap_or([0u8; 32]);
    }

    fn verify_digest(&mut self) -> bool {
        // get digest from itself
        let digest = self.digest;
        // clear the digest from the struct
        self.digest = [0u8; 32];
        // recalculate
        let digest2 = digest::digest(self).unwrap_or([0u8; 32]);
        // store the newest digest back
        self.digest = digest2;
        digest == digest2
    }
}

impl SerializeAndDigest for SuperBlock {}
