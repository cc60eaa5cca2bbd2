//! the path-based operation surface the host bridge drives

use crate::device::BlockStore;

use super::resolver::leaf_name;
use super::{
    DentryId, FileKind, FsError, Result, Volume, DIR_ENTRY_SIZE, MAX_NAME_LEN,
};

/// What `getattr` reports about an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub ino: u64,
    pub kind: FileKind,
    pub size: u64,
    pub child_count: u64,
    pub is_root: bool,
}

/// Addressing for read/write: an open handle when the caller holds one,
/// otherwise a path to resolve.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Path(&'a str),
    Handle(u64),
}

/// The operation set of the filesystem, one method per host-visible call.
///
/// Every method returns success or exactly one [FsError]; the bridge maps
/// those onto errnos. Nothing here retries or rolls back: a multi-block
/// write that fails mid-loop leaves the earlier blocks written.
///
/// Calls are strictly serial. The volume does no internal locking, so a
/// host dispatching from several threads must put one lock around the
/// whole volume.
pub trait FilesystemOps {
    fn getattr(&self, path: &str) -> Result<Attributes>;
    /// Existence check only; no permission bits are modeled.
    fn check_access(&self, path: &str) -> Result<()>;
    fn mkdir(&mut self, path: &str) -> Result<()>;
    fn mknod(&mut self, path: &str, kind: FileKind) -> Result<()>;
    /// Name of the directory's child at position `index`, or `None` once
    /// past the end; callers iterate with increasing indices.
    fn read_entry(&self, path: &str, index: usize) -> Result<Option<String>>;
    fn unlink(&mut self, path: &str) -> Result<()>;
    fn rmdir(&mut self, path: &str) -> Result<()>;
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;
    fn truncate(&mut self, path: &str, new_size: u64) -> Result<()>;
    fn write(&mut self, target: Target<'_>, data: &[u8], offset: u64) -> Result<usize>;
    fn read(&self, target: Target<'_>, size: usize, offset: u64) -> Result<Vec<u8>>;
    fn open(&mut self, path: &str) -> Result<u64>;
    fn open_directory(&mut self, path: &str) -> Result<u64>;
    fn release(&mut self, handle: u64);
    /// Persist all in-memory state to the block store.
    fn sync(&mut self) -> Result<()>;
}

impl<S: BlockStore> Volume<S> {
    fn target_dentry(&self, target: Target<'_>) -> Result<DentryId> {
        match target {
            Target::Handle(handle) => self
                .handles
                .get(handle)
                .filter(|id| self.arena.get(*id).is_some())
                .ok_or(FsError::NotFound),
            Target::Path(path) => {
                let resolution = self.resolve(path);
                if resolution.found {
                    Ok(resolution.dentry)
                } else {
                    Err(FsError::NotFound)
                }
            }
        }
    }

    /// Shared precondition of `mkdir`/`mknod`: the leaf must be absent,
    /// its parent present and a directory. Returns the parent and the new
    /// entry's name.
    fn insertion_point<'p>(&self, path: &'p str) -> Result<(DentryId, &'p str)> {
        let resolution = self.resolve(path);
        if resolution.found {
            return Err(FsError::AlreadyExists);
        }
        let parent = self
            .arena
            .get(resolution.dentry)
            .ok_or(FsError::NotFound)?;
        if parent.kind != FileKind::Directory {
            return Err(FsError::Unsupported);
        }
        if resolution.unresolved > 1 {
            // a missing intermediate component is a dead path
            return Err(FsError::NotFound);
        }
        let name = leaf_name(path).ok_or(FsError::Invalid)?;
        if name.len() > MAX_NAME_LEN {
            return Err(FsError::Invalid);
        }
        Ok((resolution.dentry, name))
    }

    pub(crate) fn attributes_of(&self, id: DentryId) -> Result<Attributes> {
        let dentry = self.arena.get(id).ok_or(FsError::NotFound)?;
        let inode = self.inodes.get(&dentry.ino).ok_or(FsError::NotFound)?;
        let is_root = id == self.root;
        let size = if is_root {
            self.superblock.used_bytes
        } else if inode.is_dir() {
            inode.child_count() * DIR_ENTRY_SIZE
        } else {
            inode.size
        };
        Ok(Attributes {
            ino: inode.ino,
            kind: inode.kind,
            size,
            child_count: inode.child_count(),
            is_root,
        })
    }
}

impl<S: BlockStore> FilesystemOps for Volume<S> {
    fn getattr(&self, path: &str) -> Result<Attributes> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        self.attributes_of(resolution.dentry)
    }

    fn check_access(&self, path: &str) -> Result<()> {
        self.getattr(path).map(|_| ())
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.insertion_point(path)?;
        let ino = self.alloc_inode(FileKind::Directory)?;
        self.alloc_dentry(parent, name, ino, FileKind::Directory)?;
        Ok(())
    }

    fn mknod(&mut self, path: &str, kind: FileKind) -> Result<()> {
        let (parent, name) = self.insertion_point(path)?;
        let ino = self.alloc_inode(kind)?;
        self.alloc_dentry(parent, name, ino, kind)?;
        Ok(())
    }

    fn read_entry(&self, path: &str, index: usize) -> Result<Option<String>> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        let ino = self
            .arena
            .get(resolution.dentry)
            .ok_or(FsError::NotFound)?
            .ino;
        let children = self
            .inodes
            .get(&ino)
            .and_then(|inode| inode.children())
            .ok_or(FsError::NotDirectory)?;
        let name = children
            .get(index)
            .and_then(|child| self.arena.get(*child))
            .map(|dentry| dentry.name.clone());
        Ok(name)
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        if resolution.is_root {
            return Err(FsError::Invalid);
        }
        let dentry = self.arena.get(resolution.dentry).ok_or(FsError::NotFound)?;
        if dentry.kind == FileKind::Directory {
            return Err(FsError::IsDirectory);
        }
        let ino = dentry.ino;
        self.drop_inode(ino)?;
        self.drop_dentry(resolution.dentry)
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        if resolution.is_root {
            return Err(FsError::Invalid);
        }
        let dentry = self.arena.get(resolution.dentry).ok_or(FsError::NotFound)?;
        if dentry.kind != FileKind::Directory {
            return Err(FsError::NotDirectory);
        }
        let ino = dentry.ino;
        let occupied = self
            .inodes
            .get(&ino)
            .map_or(0, |inode| inode.child_count());
        if occupied != 0 {
            return Err(FsError::NotEmpty);
        }
        self.drop_inode(ino)?;
        self.drop_dentry(resolution.dentry)
    }

    /// Move by repointing: create the target entry, discard its fresh
    /// inode, aim the entry at the source inode, then detach the source
    /// entry without touching that inode.
    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from);
        if !source.found {
            return Err(FsError::NotFound);
        }
        if from == to {
            return Ok(());
        }
        let (source_ino, kind) = {
            let dentry = self.arena.get(source.dentry).ok_or(FsError::NotFound)?;
            (dentry.ino, dentry.kind)
        };

        self.mknod(to, kind)?;

        let destination = self.resolve(to);
        let fresh_ino = self
            .arena
            .get(destination.dentry)
            .ok_or(FsError::NotFound)?
            .ino;
        self.drop_inode(fresh_ino)?;
        self.arena
            .get_mut(destination.dentry)
            .ok_or(FsError::NotFound)?
            .ino = source_ino;

        // children of a moved directory keep looking up their parent by
        // id; repoint those back-references at the surviving entry
        if kind == FileKind::Directory {
            let children: Vec<DentryId> = self
                .inodes
                .get(&source_ino)
                .and_then(|inode| inode.children())
                .map(|c| c.iter().copied().collect())
                .unwrap_or_default();
            for child in children {
                if let Some(dentry) = self.arena.get_mut(child) {
                    dentry.parent = Some(destination.dentry);
                }
            }
        }

        self.drop_dentry(source.dentry)
    }

    fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        let ino = self
            .arena
            .get(resolution.dentry)
            .ok_or(FsError::NotFound)?
            .ino;
        self.truncate_to(ino, new_size)
    }

    fn write(&mut self, target: Target<'_>, data: &[u8], offset: u64) -> Result<usize> {
        let id = self.target_dentry(target)?;
        let ino = self.arena.get(id).ok_or(FsError::NotFound)?.ino;
        self.write_at(ino, data, offset)
    }

    fn read(&self, target: Target<'_>, size: usize, offset: u64) -> Result<Vec<u8>> {
        let id = self.target_dentry(target)?;
        let ino = self.arena.get(id).ok_or(FsError::NotFound)?.ino;
        self.read_at(ino, size, offset)
    }

    fn open(&mut self, path: &str) -> Result<u64> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        Ok(self.handles.insert(resolution.dentry))
    }

    fn open_directory(&mut self, path: &str) -> Result<u64> {
        let resolution = self.resolve(path);
        if !resolution.found {
            return Err(FsError::NotFound);
        }
        let dentry = self.arena.get(resolution.dentry).ok_or(FsError::NotFound)?;
        if dentry.kind != FileKind::Directory {
            return Err(FsError::NotDirectory);
        }
        Ok(self.handles.insert(resolution.dentry))
    }

    fn release(&mut self, handle: u64) {
        self.handles.remove(handle);
    }

    fn sync(&mut self) -> Result<()> {
        self.sync_to_store()
    }
}
