//! translation of kernel FUSE requests onto the path-based core

use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen};
use log::{error, info};

use crate::device::BlockStore;

use super::{Attributes, FileKind, FilesystemOps, FsError, Target, Volume};

const TTL: Duration = Duration::new(0, 0);
const DEFAULT_PERM: u16 = 0o777;

/// Owns the mounted [Volume] and speaks `fuser`'s inode-based protocol by
/// reconstructing paths: inode numbers map one-to-one onto dentries (no
/// hard links), so every request can be rewritten as a path call.
pub struct FuseBridge<S: BlockStore> {
    volume: Volume<S>,
}

impl<S: BlockStore> FuseBridge<S> {
    pub fn new(volume: Volume<S>) -> Self {
        Self { volume }
    }

    fn path_of_ino(&self, ino: u64) -> Option<String> {
        let id = self.volume.dentry_by_ino(ino)?;
        Some(self.volume.path_of(id))
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Option<String> {
        let name = name.to_str()?;
        let base = self.path_of_ino(parent)?;
        if base == "/" {
            Some(format!("/{name}"))
        } else {
            Some(format!("{base}/{name}"))
        }
    }

    fn file_attr(&self, attrs: &Attributes) -> fuser::FileAttr {
        let superblock = self.volume.superblock();
        let block_size = superblock.block_size;
        let now = SystemTime::now();
        fuser::FileAttr {
            ino: attrs.ino,
            size: attrs.size,
            blocks: if attrs.is_root {
                superblock.block_count
            } else {
                attrs.size.div_ceil(block_size as u64)
            },
            atime: now,
            mtime: now,
            ctime: now,
            crtime: UNIX_EPOCH,
            kind: attrs.kind.into(),
            perm: DEFAULT_PERM,
            nlink: if attrs.is_root { 2 } else { 1 },
            uid: superblock.uid,
            gid: superblock.gid,
            rdev: 0,
            blksize: block_size,
            flags: 0,
        }
    }

    /// Resolve a request's file to a dentry: the stashed open handle when
    /// it is live, the inode lookup otherwise.
    fn request_dentry(&self, fh: u64, ino: u64) -> Option<super::DentryId> {
        self.volume
            .handle_dentry(fh)
            .or_else(|| self.volume.dentry_by_ino(ino))
    }
}

impl<S: BlockStore> Filesystem for FuseBridge<S> {
    fn init(
        &mut self,
        _req: &fuser::Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        info!("volume attached: {:?}", self.volume.superblock());
        Ok(())
    }

    // unmount: persist everything and drop the in-memory namespace
    fn destroy(&mut self) {
        self.volume.release_all_handles();
        if let Err(e) = self.volume.sync() {
            error!("failed to persist volume on unmount: {e}");
        }
    }

    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        let superblock = self.volume.superblock();
        reply.statfs(
            superblock.block_count,
            superblock.free_blocks,
            superblock.free_blocks,
            superblock.inode_count - superblock.free_inodes,
            superblock.free_inodes,
            superblock.block_size,
            255, // max filename length, as Linux reports it
            superblock.block_size,
        )
    }

    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: ReplyEntry,
    ) {
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.getattr(&path) {
            Ok(attrs) => reply.entry(&TTL, &self.file_attr(&attrs), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &fuser::Request<'_>, ino: u64, reply: ReplyAttr) {
        info!("getattr() called with inode number: {ino}");
        let Some(id) = self.volume.dentry_by_ino(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.attributes_of(id) {
            Ok(attrs) => reply.attr(&TTL, &self.file_attr(&attrs)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        info!("setattr() called with inode number: {ino}, size: {size:?}");
        let Some(path) = self.path_of_ino(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        // only the size is modeled; modes, owners and times pass through
        if let Some(size) = size {
            if let Err(e) = self.volume.truncate(&path, size) {
                reply.error(e.errno());
                return;
            }
        }
        match self.volume.getattr(&path) {
            Ok(attrs) => reply.attr(&TTL, &self.file_attr(&attrs)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        info!("mkdir() called with parent inode number: {parent} and name: {name:?}");
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Err(e) = self.volume.mkdir(&path) {
            reply.error(e.errno());
            return;
        }
        match self.volume.getattr(&path) {
            Ok(attrs) => reply.entry(&TTL, &self.file_attr(&attrs), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mknod(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        info!("mknod() called with parent inode number: {parent} and name: {name:?}");
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Err(e) = self.volume.mknod(&path, kind_from_mode(mode)) {
            reply.error(e.errno());
            return;
        }
        match self.volume.getattr(&path) {
            Ok(attrs) => reply.entry(&TTL, &self.file_attr(&attrs), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        info!("create() called with parent inode number: {parent} and name: {name:?}");
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Err(e) = self.volume.mknod(&path, kind_from_mode(mode)) {
            reply.error(e.errno());
            return;
        }
        let fh = match self.volume.open(&path) {
            Ok(fh) => fh,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };
        match self.volume.getattr(&path) {
            Ok(attrs) => reply.created(&TTL, &self.file_attr(&attrs), 0, fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of_ino(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.open(&path) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn opendir(&mut self, _req: &fuser::Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of_ino(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.open_directory(&path) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.volume.release(fh);
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        self.volume.release(fh);
        reply.ok();
    }

    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        info!("read() called with inode number: {ino}, fh: {fh}, offset: {offset}, size: {size}");
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let offset = offset as u64;
        let Some(id) = self.request_dentry(fh, ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Ok(attrs) = self.volume.attributes_of(id) else {
            reply.error(libc::EIO);
            return;
        };
        // bound the request by the logical size; the engine itself copies
        // whole block windows
        let should_read = (size as u64).min(attrs.size.saturating_sub(offset)) as usize;

        let path;
        let target = if self.volume.handle_dentry(fh).is_some() {
            Target::Handle(fh)
        } else {
            path = self.volume.path_of(id);
            Target::Path(&path)
        };
        match self.volume.read(target, should_read, offset) {
            Ok(buf) => reply.data(&buf),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        info!(
            "write() called with inode number: {ino}, fh: {fh}, offset: {offset}, len: {}",
            data.len()
        );
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let Some(id) = self.request_dentry(fh, ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let path;
        let target = if self.volume.handle_dentry(fh).is_some() {
            Target::Handle(fh)
        } else {
            path = self.volume.path_of(id);
            Target::Path(&path)
        };
        match self.volume.write(target, data, offset as u64) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        info!("readdir() called with inode number: {ino}, offset: {offset}");
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let Some(id) = self.request_dentry(fh, ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = self.volume.path_of(id);

        let mut index = offset as usize;
        loop {
            match self.volume.read_entry(&path, index) {
                Ok(Some(name)) => {
                    let child = if path == "/" {
                        format!("/{name}")
                    } else {
                        format!("{path}/{name}")
                    };
                    let Ok(attrs) = self.volume.getattr(&child) else {
                        reply.error(libc::EIO);
                        return;
                    };
                    let full =
                        reply.add(attrs.ino, index as i64 + 1, attrs.kind.into(), &name);
                    if full {
                        break;
                    }
                    index += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    reply.error(e.errno());
                    return;
                }
            }
        }
        reply.ok();
    }

    fn unlink(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: ReplyEmpty,
    ) {
        info!("unlink() called with parent inode number: {parent} and name: {name:?}");
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.unlink(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: ReplyEmpty,
    ) {
        info!("rmdir() called with parent inode number: {parent} and name: {name:?}");
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        newparent: u64,
        newname: &std::ffi::OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        info!("rename() called with {parent}/{name:?} -> {newparent}/{newname:?}");
        if flags & libc::RENAME_EXCHANGE != 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let (Some(from), Some(to)) = (
            self.child_path(parent, name),
            self.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.volume.rename(&from, &to) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn access(&mut self, _req: &fuser::Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        let result = self
            .path_of_ino(ino)
            .ok_or(FsError::NotFound)
            .and_then(|path| self.volume.check_access(&path));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn flush(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        // state is persisted once, at unmount
        reply.ok();
    }
}

fn kind_from_mode(mode: u32) -> FileKind {
    if (mode & libc::S_IFMT) == libc::S_IFDIR {
        FileKind::Directory
    } else {
        FileKind::RegularFile
    }
}
