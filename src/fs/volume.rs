//! the mounted volume: namespace state, handle table and persistence

use std::collections::{HashMap, VecDeque};

use bitvec::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::device::BlockStore;
use crate::utils::traits::SerializeAndDigest;

use super::{
    Dentry, DentryArena, DentryId, FileKind, FsError, Inode, Result, SuperBlock, BLOCKS_PER_FILE,
    ROOT_INO,
};

/// Opaque handles returned by `open`/`open_directory`, resolved back to
/// dentries on later calls.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    map: HashMap<u64, DentryId>,
    next: u64,
}

impl HandleTable {
    pub(crate) fn insert(&mut self, dentry: DentryId) -> u64 {
        self.next += 1;
        self.map.insert(self.next, dentry);
        self.next
    }

    pub(crate) fn get(&self, handle: u64) -> Option<DentryId> {
        self.map.get(&handle).copied()
    }

    pub(crate) fn remove(&mut self, handle: u64) {
        self.map.remove(&handle);
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// One serialized namespace entry: a dentry and its inode, flattened.
///
/// `blocks` holds the physical index each allocated table slot was packed
/// to during the last sync. Parents are serialized before children, so a
/// record's parent ino always resolves while loading.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct NodeRecord {
    ino: u64,
    /// parent's ino; 0 for the root
    parent: u64,
    name: String,
    kind: FileKind,
    size: u64,
    blocks: [Option<u64>; BLOCKS_PER_FILE],
}

/// A mounted flatfs instance.
///
/// Created by [format](Volume::format) or [mount](Volume::mount), torn
/// down by dropping after [sync](Volume::sync). All operations take the
/// volume explicitly; independent instances can coexist in one process.
#[derive(Debug)]
pub struct Volume<S: BlockStore> {
    store: S,
    pub(crate) superblock: SuperBlock,
    pub(crate) arena: DentryArena,
    pub(crate) inodes: HashMap<u64, Inode>,
    pub(crate) ino_bitmap: BitVec<u8, Lsb0>,
    pub(crate) root: DentryId,
    pub(crate) handles: HandleTable,
}

impl<S: BlockStore> Volume<S> {
    /// Initialize an empty volume on `store` and persist it.
    pub fn format(store: S, inode_count: u64, uid: u32, gid: u32) -> Result<Self> {
        let superblock = SuperBlock::new(
            inode_count,
            store.block_size() as u32,
            store.block_count() as u64,
            uid,
            gid,
        );
        if superblock.data_region_start() >= superblock.block_count {
            return Err(FsError::NoSpace);
        }

        let mut arena = DentryArena::new();
        let root = arena.insert(Dentry {
            name: "/".to_string(),
            ino: ROOT_INO,
            kind: FileKind::Directory,
            parent: None,
        });
        let mut inodes = HashMap::new();
        inodes.insert(ROOT_INO, Inode::new(ROOT_INO, FileKind::Directory));

        let mut ino_bitmap = BitVec::repeat(false, inode_count as usize);
        ino_bitmap.set((ROOT_INO - 1) as usize, true);

        let mut volume = Volume {
            store,
            superblock,
            arena,
            inodes,
            ino_bitmap,
            root,
            handles: HandleTable::default(),
        };
        volume.superblock.free_inodes -= 1;
        volume.sync_to_store()?;
        Ok(volume)
    }

    /// Load a previously formatted volume from `store`.
    pub fn mount(store: S) -> Result<Self> {
        let mut block = vec![0u8; store.block_size()];
        store.read_block(0, &mut block)?;
        let superblock = SuperBlock::probe(&block)?;
        if superblock.block_size as usize != store.block_size()
            || superblock.block_count > store.block_count() as u64
        {
            return Err(FsError::InvalidSuperblock);
        }

        let region = read_region(&store, 1, superblock.inode_region_blocks)?;
        let config = bincode::config::legacy();
        let (records, _): (Vec<NodeRecord>, usize) =
            bincode::serde::decode_from_slice(&region, config)
                .map_err(|_| FsError::InvalidSuperblock)?;

        let mut volume = Volume {
            store,
            arena: DentryArena::new(),
            inodes: HashMap::new(),
            ino_bitmap: BitVec::repeat(false, superblock.inode_count as usize),
            // overwritten by `rebuild` once the root record is inserted
            root: DentryId::default(),
            handles: HandleTable::default(),
            superblock,
        };
        volume.rebuild(records)?;
        debug!(
            "mounted volume: {} entries, {} bytes in use",
            volume.arena.len(),
            volume.superblock.used_bytes
        );
        Ok(volume)
    }

    fn rebuild(&mut self, records: Vec<NodeRecord>) -> Result<()> {
        let mut by_ino: HashMap<u64, DentryId> = HashMap::new();
        for record in records {
            if record.ino == 0 || record.ino > self.superblock.inode_count {
                return Err(FsError::InvalidSuperblock);
            }

            let mut inode = Inode::new(record.ino, record.kind);
            inode.size = record.size;
            if let Some(table) = inode.table_mut() {
                for (slot, phys) in record.blocks.iter().enumerate() {
                    if let Some(phys) = phys {
                        let mut buf = vec![0u8; self.store.block_size()];
                        self.store.read_block(*phys as usize, &mut buf)?;
                        table.install(slot, buf.into_boxed_slice());
                    }
                }
            }

            let parent = if record.parent == 0 {
                if record.ino != ROOT_INO {
                    return Err(FsError::InvalidSuperblock);
                }
                None
            } else {
                Some(
                    *by_ino
                        .get(&record.parent)
                        .ok_or(FsError::InvalidSuperblock)?,
                )
            };

            let id = self.arena.insert(Dentry {
                name: record.name,
                ino: record.ino,
                kind: record.kind,
                parent,
            });
            match parent {
                None => self.root = id,
                Some(parent_id) => {
                    let parent_ino = self
                        .arena
                        .get(parent_id)
                        .ok_or(FsError::InvalidSuperblock)?
                        .ino;
                    self.inodes
                        .get_mut(&parent_ino)
                        .and_then(|i| i.children_mut())
                        .ok_or(FsError::InvalidSuperblock)?
                        .push(id);
                }
            }

            self.inodes.insert(record.ino, inode);
            self.ino_bitmap.set((record.ino - 1) as usize, true);
            by_ino.insert(record.ino, id);
        }

        if by_ino.get(&ROOT_INO).is_none() {
            return Err(FsError::InvalidSuperblock);
        }
        Ok(())
    }

    /// Persist the superblock, namespace records and data blocks.
    ///
    /// Data blocks are packed densely from the start of the data region;
    /// physical indices are rewritten on every sync, table positions are
    /// the stable identity.
    pub(crate) fn sync_to_store(&mut self) -> Result<()> {
        let block_size = self.store.block_size();
        let data_end = self.superblock.block_count;
        let mut next_phys = self.superblock.data_region_start();
        let mut records = Vec::with_capacity(self.arena.len());

        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            let dentry = self.arena.get(id).ok_or(FsError::Io)?;
            let inode = self.inodes.get(&dentry.ino).ok_or(FsError::Io)?;

            let mut blocks = [None; BLOCKS_PER_FILE];
            if let Some(table) = inode.table() {
                for (slot, buf) in table.allocated() {
                    if next_phys >= data_end {
                        return Err(FsError::NoSpace);
                    }
                    self.store.write_block(next_phys as usize, buf)?;
                    blocks[slot] = Some(next_phys);
                    next_phys += 1;
                }
            }
            records.push(NodeRecord {
                ino: dentry.ino,
                parent: dentry
                    .parent
                    .and_then(|p| self.arena.get(p))
                    .map_or(0, |p| p.ino),
                name: dentry.name.clone(),
                kind: dentry.kind,
                size: inode.size,
                blocks,
            });
            if let Some(children) = inode.children() {
                queue.extend(children.iter().copied());
            }
        }

        let config = bincode::config::legacy();
        let blob = bincode::serde::encode_to_vec(&records, config).map_err(|_| FsError::Io)?;
        let region_capacity = self.superblock.inode_region_blocks as usize * block_size;
        if blob.len() > region_capacity {
            return Err(FsError::NoSpace);
        }
        write_region(&mut self.store, 1, self.superblock.inode_region_blocks, &blob)?;

        let mut superblock_bytes =
            SerializeAndDigest::serialize(&mut self.superblock).map_err(|_| FsError::Io)?;
        if superblock_bytes.len() > block_size {
            return Err(FsError::NoSpace);
        }
        superblock_bytes.resize(block_size, 0);
        self.store.write_block(0, &superblock_bytes)?;
        self.store.flush()
    }

    /// Drop every open handle; part of unmount teardown.
    pub(crate) fn release_all_handles(&mut self) {
        self.handles.clear();
    }

    /// The dentry behind a live handle, if any.
    pub(crate) fn handle_dentry(&self, handle: u64) -> Option<DentryId> {
        self.handles.get(handle)
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn root_id(&self) -> DentryId {
        self.root
    }

    pub(crate) fn block_size(&self) -> usize {
        self.store.block_size()
    }
}

fn read_region<S: BlockStore>(store: &S, start: u64, blocks: u64) -> Result<Vec<u8>> {
    let block_size = store.block_size();
    let mut region = vec![0u8; blocks as usize * block_size];
    for i in 0..blocks as usize {
        store.read_block(start as usize + i, &mut region[i * block_size..(i + 1) * block_size])?;
    }
    Ok(region)
}

fn write_region<S: BlockStore>(store: &mut S, start: u64, blocks: u64, blob: &[u8]) -> Result<()> {
    let block_size = store.block_size();
    let mut scratch = vec![0u8; block_size];
    for i in 0..blocks as usize {
        let lo = (i * block_size).min(blob.len());
        let hi = ((i + 1) * block_size).min(blob.len());
        scratch.fill(0);
        scratch[..hi - lo].copy_from_slice(&blob[lo..hi]);
        store.write_block(start as usize + i, &scratch)?;
    }
    Ok(())
}
