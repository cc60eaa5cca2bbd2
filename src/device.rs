//! block-granular access to the backing storage

use std::fs::OpenOptions;
use std::path::Path;

use memmap2::MmapMut;

use crate::{FsError, Result, SuperBlock};

/// Abstraction over the device a volume lives on.
///
/// The core addresses storage exclusively through this trait, in units of
/// `block_size()` bytes. `buf` lengths must equal the block size.
pub trait BlockStore {
    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize;

    /// Returns the number of blocks in the device.
    fn block_count(&self) -> usize;

    /// Reads one block into `buf`.
    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes one block from `buf`.
    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()>;

    /// Pushes any buffered writes down to durable storage.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [BlockStore] backed by a memory-mapped image file.
#[derive(Debug)]
pub struct ImageStore {
    map: MmapMut,
    block_size: usize,
}

impl ImageStore {
    /// Create a fresh, zeroed image of `size` bytes (rounded down to whole
    /// blocks). Fails if the file already exists.
    pub fn create<P>(image_path: P, size: u64, block_size: u32) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path.as_ref())?;
        let blocks = size / block_size as u64;
        file.set_len(blocks * block_size as u64)?;

        // Safety: the mapping is private to this process and the file was
        // opened read-write just above.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            map,
            block_size: block_size as usize,
        })
    }

    /// Open an existing image. The block size is learned from the
    /// superblock at the front of the file.
    pub fn open<P>(image_path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;
        // Safety: as in `create`.
        let map = unsafe { MmapMut::map_mut(&file)? };
        let superblock = SuperBlock::probe(&map)?;
        Ok(Self {
            map,
            block_size: superblock.block_size as usize,
        })
    }

    fn range(&self, index: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let start = index * self.block_size;
        let end = start + len;
        if len != self.block_size || end > self.map.len() {
            return Err(FsError::Io);
        }
        Ok(start..end)
    }
}

impl BlockStore for ImageStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.map.len() / self.block_size
    }

    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(index, buf.len())?;
        buf.copy_from_slice(&self.map[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
        let range = self.range(index, buf.len())?;
        self.map[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.map.flush().map_err(|_| FsError::Io)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory store for the unit tests.
    pub(crate) struct MemStore {
        data: Vec<u8>,
        block_size: usize,
    }

    impl MemStore {
        pub(crate) fn new(block_size: usize, block_count: usize) -> Self {
            Self {
                data: vec![0u8; block_size * block_count],
                block_size,
            }
        }
    }

    impl BlockStore for MemStore {
        fn block_size(&self) -> usize {
            self.block_size
        }

        fn block_count(&self) -> usize {
            self.data.len() / self.block_size
        }

        fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
            let start = index * self.block_size;
            let end = start + buf.len();
            if buf.len() != self.block_size || end > self.data.len() {
                return Err(FsError::Io);
            }
            buf.copy_from_slice(&self.data[start..end]);
            Ok(())
        }

        fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
            let start = index * self.block_size;
            let end = start + buf.len();
            if buf.len() != self.block_size || end > self.data.len() {
                return Err(FsError::Io);
            }
            self.data[start..end].copy_from_slice(buf);
            Ok(())
        }
    }
}
