//! byte-range reads and writes over the fixed per-file block table

use crate::device::BlockStore;

use super::{FsError, Result, Volume, BLOCKS_PER_FILE};

/// Copy window of one block within a larger transfer: `skip` bytes into
/// the block, `len` bytes long. The first block starts mid-block when the
/// offset does, interior blocks span fully, and the final block ends at
/// the transfer tail unless that lands exactly on a block boundary.
fn block_window(
    index: usize,
    first: usize,
    last: usize,
    offset: u64,
    len: usize,
    block_size: usize,
    done: usize,
) -> (usize, usize) {
    let skip = if index == first {
        (offset % block_size as u64) as usize
    } else {
        0
    };
    let mut window = block_size - skip;
    if index == last {
        let tail = ((offset + len as u64) % block_size as u64) as usize;
        if tail > skip {
            window = tail - skip;
        }
    }
    if done + window > len {
        window = len - done;
    }
    (skip, window)
}

impl<S: BlockStore> Volume<S> {
    /// Write `data` at `offset`, materializing every block in range and
    /// extending the file size. Returns the bytes copied, which is short
    /// of `data.len()` only when the transfer hits the end of the block
    /// table. Blocks written before a mid-range allocation failure stay
    /// written.
    pub(crate) fn write_at(&mut self, ino: u64, data: &[u8], offset: u64) -> Result<usize> {
        let block_size = self.block_size();
        {
            let inode = self.inodes.get(&ino).ok_or(FsError::NotFound)?;
            if inode.is_dir() {
                return Err(FsError::IsDirectory);
            }
        }
        if data.is_empty() {
            return Ok(0);
        }

        let first = (offset / block_size as u64) as usize;
        let last = ((offset + data.len() as u64 - 1) / block_size as u64) as usize;
        if first >= BLOCKS_PER_FILE {
            return Err(FsError::NoSpace);
        }

        let mut written = 0usize;
        for index in first..=last.min(BLOCKS_PER_FILE - 1) {
            self.alloc_data_block(ino, index)?;
            let (skip, window) =
                block_window(index, first, last, offset, data.len(), block_size, written);
            let block = self
                .inodes
                .get_mut(&ino)
                .and_then(|inode| inode.table_mut())
                .and_then(|table| table.slot_mut(index))
                .ok_or(FsError::Io)?;
            block[skip..skip + window].copy_from_slice(&data[written..written + window]);
            written += window;
        }

        let inode = self.inodes.get_mut(&ino).ok_or(FsError::NotFound)?;
        inode.size = inode.size.max(offset + written as u64);
        Ok(written)
    }

    /// Read up to `size` bytes at `offset`. The same block windows as
    /// `write_at`; slots never written read as zeroes. The copy is not
    /// re-clipped to the logical size, so callers bound `size` by the
    /// file size themselves.
    pub(crate) fn read_at(&self, ino: u64, size: usize, offset: u64) -> Result<Vec<u8>> {
        let block_size = self.block_size();
        let inode = self.inodes.get(&ino).ok_or(FsError::NotFound)?;
        let table = inode.table().ok_or(FsError::IsDirectory)?;
        if offset > inode.size {
            return Err(FsError::SeekBeyondEnd);
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let first = (offset / block_size as u64) as usize;
        let last = ((offset + size as u64 - 1) / block_size as u64) as usize;
        let mut buf = vec![0u8; size];
        let mut read = 0usize;
        for index in first..=last.min(BLOCKS_PER_FILE - 1) {
            let (skip, window) = block_window(index, first, last, offset, size, block_size, read);
            if let Some(block) = table.slot(index) {
                buf[read..read + window].copy_from_slice(&block[skip..skip + window]);
            }
            read += window;
        }
        buf.truncate(read);
        Ok(buf)
    }

    /// Set the logical size. Shrinking keeps already-allocated blocks;
    /// they are reclaimed when the inode is dropped.
    pub(crate) fn truncate_to(&mut self, ino: u64, new_size: u64) -> Result<()> {
        let block_size = self.superblock.block_size as u64;
        let inode = self.inodes.get_mut(&ino).ok_or(FsError::NotFound)?;
        if inode.is_dir() {
            return Err(FsError::IsDirectory);
        }
        if new_size.div_ceil(block_size) > BLOCKS_PER_FILE as u64 {
            return Err(FsError::NoSpace);
        }
        inode.size = new_size;
        Ok(())
    }
}
