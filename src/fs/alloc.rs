//! inode, dentry and data block allocation against the superblock budgets

use crate::device::BlockStore;

use super::{Dentry, DentryId, FileKind, FsError, Inode, Result, Volume, BLOCKS_PER_FILE};

impl<S: BlockStore> Volume<S> {
    /// Claim the lowest free inode number. Ids start at 1; freed ids are
    /// reused but can never collide with a live one.
    fn alloc_ino(&mut self) -> Result<u64> {
        let index = self.ino_bitmap.first_zero().ok_or(FsError::NoSpace)?;
        self.ino_bitmap.set(index, true);
        self.superblock.free_inodes -= 1;
        Ok(index as u64 + 1)
    }

    fn release_ino(&mut self, ino: u64) {
        self.ino_bitmap.set((ino - 1) as usize, false);
        self.superblock.free_inodes += 1;
    }

    /// Create a fresh inode of `kind`: zero size, no children, every block
    /// slot unallocated.
    pub(crate) fn alloc_inode(&mut self, kind: FileKind) -> Result<u64> {
        let ino = self.alloc_ino()?;
        self.inodes.insert(ino, Inode::new(ino, kind));
        Ok(ino)
    }

    /// Hang a new dentry for `ino` under `parent`, which must name a
    /// directory.
    pub(crate) fn alloc_dentry(
        &mut self,
        parent: DentryId,
        name: &str,
        ino: u64,
        kind: FileKind,
    ) -> Result<DentryId> {
        let parent_ino = self.arena.get(parent).ok_or(FsError::NotFound)?.ino;
        let id = self.arena.insert(Dentry {
            name: name.to_string(),
            ino,
            kind,
            parent: Some(parent),
        });
        self.inodes
            .get_mut(&parent_ino)
            .and_then(|inode| inode.children_mut())
            .ok_or(FsError::NotDirectory)?
            .push(id);
        Ok(id)
    }

    /// Destroy an inode: a file gives back every allocated block, a
    /// directory must already be empty (callers enforce that). The inode
    /// number returns to the free pool.
    pub(crate) fn drop_inode(&mut self, ino: u64) -> Result<()> {
        let inode = self.inodes.remove(&ino).ok_or(FsError::NotFound)?;
        debug_assert_eq!(inode.child_count(), 0);
        if let Some(table) = inode.table() {
            let freed = table.allocated_count() as u64;
            self.superblock.used_bytes -= freed * self.superblock.block_size as u64;
            self.superblock.free_blocks += freed;
        }
        self.release_ino(ino);
        Ok(())
    }

    /// Detach a dentry from its parent and free the arena slot. The
    /// dentry's inode is untouched; callers drop it separately when
    /// appropriate.
    pub(crate) fn drop_dentry(&mut self, id: DentryId) -> Result<()> {
        let dentry = self.arena.remove(id).ok_or(FsError::NotFound)?;
        let parent = dentry.parent.ok_or(FsError::Invalid)?;
        let parent_ino = self.arena.get(parent).ok_or(FsError::NotFound)?.ino;
        self.inodes
            .get_mut(&parent_ino)
            .and_then(|inode| inode.children_mut())
            .ok_or(FsError::NotDirectory)?
            .retain(|child| *child != id);
        Ok(())
    }

    /// Materialize block `index` of a file, charging the usage budget.
    /// A live slot is a successful no-op.
    pub(crate) fn alloc_data_block(&mut self, ino: u64, index: usize) -> Result<()> {
        if index >= BLOCKS_PER_FILE {
            return Err(FsError::NoSpace);
        }
        let block_size = self.superblock.block_size as u64;
        let capacity = self.superblock.data_capacity();
        let table = self
            .inodes
            .get_mut(&ino)
            .ok_or(FsError::NotFound)?
            .table_mut()
            .ok_or(FsError::IsDirectory)?;
        if table.is_allocated(index) {
            return Ok(());
        }
        if self.superblock.used_bytes + block_size > capacity {
            return Err(FsError::NoSpace);
        }
        table.install(index, vec![0u8; block_size as usize].into_boxed_slice());
        self.superblock.used_bytes += block_size;
        self.superblock.free_blocks -= 1;
        Ok(())
    }
}
