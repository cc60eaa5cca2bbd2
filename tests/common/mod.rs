use std::sync::{Arc, Mutex};

use flatfs::device::BlockStore;
use flatfs::{FsError, Result};

/// In-memory block device for the integration tests.
///
/// Cloning shares the backing buffer, so a test can keep a handle while a
/// volume owns another and re-mount from the same bytes later.
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    block_size: usize,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified geometry.
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        let inner = Arc::new(Mutex::new(vec![0u8; block_size * num_blocks]));
        RamDisk {
            inner,
            block_size,
            num_blocks,
        }
    }

    /// Overwrite raw bytes, for corruption tests.
    #[allow(dead_code)]
    pub fn clobber(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.inner.lock().unwrap();
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockStore for RamDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        if block_id >= self.num_blocks || buf.len() != self.block_size {
            return Err(FsError::Io);
        }
        let start = block_id * self.block_size;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + self.block_size]);
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks || buf.len() != self.block_size {
            return Err(FsError::Io);
        }
        let start = block_id * self.block_size;
        let mut data = self.inner.lock().unwrap();
        data[start..start + self.block_size].copy_from_slice(buf);
        Ok(())
    }
}

pub const BLOCK_SIZE: usize = 512;

/// A freshly formatted volume over a shared RamDisk.
#[allow(dead_code)]
pub fn fresh_volume() -> (flatfs::Volume<RamDisk>, RamDisk) {
    let rd = RamDisk::new(BLOCK_SIZE, 1024);
    let volume = flatfs::Volume::format(rd.clone(), 64, 0, 0).unwrap();
    (volume, rd)
}
